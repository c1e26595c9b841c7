use std::fmt::Write as _;
use std::io::Read;

use anyhow::{Context, Result, bail};
use tracing::info;

use keyshare_db::Database;
use keyshare_sync::{HttpConfig, Orchestrator};
use keyshare_types::SyncSummary;

use crate::config::Config;

pub async fn sync(config: &Config, db: Database) -> Result<()> {
    // a session is bound to the directory it was issued by
    if let Some(session) = db.get_session()? {
        if session.hostname != config.hostname {
            bail!(
                "session was issued by [{}], not [{}]. run [keyshare login] again",
                session.hostname,
                config.hostname
            );
        }
    }

    let http = HttpConfig::new(config.hostname.as_str()).with_timeout(config.http_timeout);
    let orchestrator = Orchestrator::connect_with(http, db)?;
    let summary = orchestrator.run().await?;

    orchestrator.identity().set_username(&summary.username)?;
    print!("{}", render_summary(&summary)?);
    Ok(())
}

pub fn device_init(db: &Database) -> Result<()> {
    let public_key = db.init_device()?;
    println!("Device public key: {}", public_key);
    Ok(())
}

pub fn login(config: &Config, db: &Database, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("token must not be empty");
    }

    db.save_session(&config.hostname, token)?;
    info!(hostname = %config.hostname, "Session stored");
    println!("Logged in to {}", config.hostname);
    Ok(())
}

pub fn logout(db: &Database) -> Result<()> {
    if db.clear_session()? {
        println!("Logged out");
    } else {
        println!("No active session");
    }
    Ok(())
}

pub fn user_import(db: &Database) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read the private key from stdin")?;

    let public_key = db.import_user_key(&input)?;
    println!("User public key: {}", public_key);
    Ok(())
}

pub fn status(config: &Config, db: &Database) -> Result<()> {
    print!("{}", render_status(config, db)?);
    Ok(())
}

fn render_status(config: &Config, db: &Database) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Database:     {}", config.db_path.display())?;

    match db.get_session()? {
        Some(session) => {
            writeln!(out, "Directory:    {}", session.hostname)?;
            writeln!(out, "Username:     {}", session.username.as_deref().unwrap_or("(not synced yet)"))?;
            writeln!(
                out,
                "Organization: {}",
                session.organization_id.as_deref().unwrap_or("(none selected)")
            )?;
        }
        None => writeln!(out, "Session:      not logged in")?,
    }

    let device = db.get_device()?;
    writeln!(out, "Device key:   {}", if device.is_some() { "present" } else { "missing" })?;
    let user_key = db.get_user_key()?;
    writeln!(out, "User key:     {}", if user_key.is_some() { "present" } else { "missing" })?;
    Ok(out)
}

fn render_summary(summary: &SyncSummary) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Synced as {}", summary.username)?;

    match summary.emergency_kit_generated_at {
        Some(at) => writeln!(out, "Emergency kit generated {}", at.format("%Y-%m-%d %H:%M UTC"))?,
        None => writeln!(out, "Emergency kit not generated yet. Generate one to recover your account")?,
    }

    let slugs: Vec<String> = summary.organization_slugs.iter().map(|s| format!("@{}", s)).collect();
    writeln!(out, "Organizations: {}", slugs.join(", "))?;
    writeln!(out, "Selected: {}", summary.selected_organization)?;

    if !summary.pending_members.is_empty() {
        writeln!(out, "Waiting on teammates without a public key:")?;
        for member in &summary.pending_members {
            writeln!(
                out,
                "  @{} {} (needs to run [keyshare sync])",
                member.organization_slug, member.username
            )?;
        }
    }
    Ok(out)
}
