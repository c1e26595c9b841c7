use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

pub const DEFAULT_HOSTNAME: &str = "https://api.keyshare.dev";
pub const DEFAULT_DB_PATH: &str = "keyshare.db";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Values given on the command line. Each one beats its environment variable.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub hostname: Option<String>,
    pub db_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hostname: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::resolve(overrides, |name| std::env::var(name).ok())
    }

    fn resolve(overrides: &Overrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let hostname = overrides
            .hostname
            .clone()
            .or_else(|| env("KEYSHARE_HOSTNAME"))
            .unwrap_or_else(|| DEFAULT_HOSTNAME.into());
        if !hostname.starts_with("http://") && !hostname.starts_with("https://") {
            bail!("hostname must start with http:// or https://, got [{}]", hostname);
        }

        let db_path = overrides
            .db_path
            .clone()
            .or_else(|| env("KEYSHARE_DB_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => env("KEYSHARE_HTTP_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("KEYSHARE_HTTP_TIMEOUT_SECS must be a whole number of seconds")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            bail!("HTTP timeout must be at least one second");
        }

        Ok(Self {
            hostname,
            db_path,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
