//! Tracker configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use playtime_domain::{PlayMinutes, DEFAULT_SESSION_CAP_MINUTES};

const DEFAULT_DB_FILE: &str = "playtime.db";

/// Tracker configuration loaded from environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// SQLite file holding user records
    pub db_path: PathBuf,
    /// Provisional disconnect offset stamped on every new session
    pub session_cap: PlayMinutes,
    /// How long unload waits for in-flight record writes
    pub shutdown_grace: Duration,
    /// Capacity of the lifecycle event channel
    pub event_buffer: usize,
}

impl TrackerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let db_path = match env::var("PLAYTIME_DB_PATH") {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => default_db_path()?,
        };

        Ok(Self {
            db_path,
            session_cap: PlayMinutes::new(
                env::var("PLAYTIME_SESSION_CAP_MINUTES")
                    .unwrap_or_else(|_| DEFAULT_SESSION_CAP_MINUTES.to_string())
                    .parse()
                    .context("PLAYTIME_SESSION_CAP_MINUTES must be a whole number of minutes")?,
            ),
            shutdown_grace: Duration::from_secs(
                env::var("PLAYTIME_SHUTDOWN_GRACE_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("PLAYTIME_SHUTDOWN_GRACE_SECS must be a whole number of seconds")?,
            ),
            event_buffer: env::var("PLAYTIME_EVENT_BUFFER")
                .unwrap_or_else(|_| "256".to_string())
                .parse::<usize>()
                .context("PLAYTIME_EVENT_BUFFER must be a positive integer")?
                .max(1),
        })
    }
}

/// `playtime.db` next to the running executable.
fn default_db_path() -> Result<PathBuf> {
    let exe = env::current_exe().context("cannot locate the running executable")?;
    let dir = exe
        .parent()
        .context("executable path has no parent directory")?;
    Ok(dir.join(DEFAULT_DB_FILE))
}
