mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use keyshare_db::Database;

use config::{Config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "keyshare")]
#[command(author, version, about = "Keep encrypted key copies in sync across devices and teammates", long_about = None)]
struct Args {
    /// Directory endpoint (default: $KEYSHARE_HOSTNAME or https://api.keyshare.dev)
    #[arg(long, global = true)]
    hostname: Option<String>,

    /// Local database file (default: $KEYSHARE_DB_PATH or keyshare.db)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// HTTP timeout in seconds (default: $KEYSHARE_HTTP_TIMEOUT_SECS or 30)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Push key grants to your devices and teammates
    Sync,
    /// Manage this device's keypair
    Device {
        #[command(subcommand)]
        command: DeviceCommand,
    },
    /// Store a session token issued by the directory
    Login {
        #[arg(long)]
        token: String,
    },
    /// Forget the stored session token
    Logout,
    /// Manage the user keypair on this device
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Show local session and key state
    Status,
}

#[derive(Subcommand, Debug)]
enum DeviceCommand {
    /// Generate this device's keypair if it has none
    Init,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Read the user private key (hex) from stdin and store it sealed to this device
    Import,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyshare=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(&Overrides {
        hostname: args.hostname,
        db_path: args.db_path,
        timeout_secs: args.timeout_secs,
    })?;
    debug!(?config, "Loaded config");

    let db = Database::open(&config.db_path)?;

    match args.command {
        Command::Sync => commands::sync(&config, db).await,
        Command::Device { command: DeviceCommand::Init } => commands::device_init(&db),
        Command::Login { token } => commands::login(&config, &db, &token),
        Command::Logout => commands::logout(&db),
        Command::User { command: UserCommand::Import } => commands::user_import(&db),
        Command::Status => commands::status(&config, &db),
    }
}
