use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api_client::DEFAULT_BASE_URL;
use crate::autosave::DEFAULT_QUIET_PERIOD;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub autosave_quiet: Duration,
    pub http_timeout: Duration,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from(".resumify"),
            autosave_quiet: DEFAULT_QUIET_PERIOD,
            http_timeout: Duration::from_secs(120),
            rust_log: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            api_url: get("RESUMIFY_API_URL").unwrap_or(defaults.api_url),
            data_dir: get("RESUMIFY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            autosave_quiet: match get("AUTOSAVE_QUIET_MS") {
                Some(raw) => Duration::from_millis(
                    raw.parse::<u64>()
                        .context("AUTOSAVE_QUIET_MS must be a whole number of milliseconds")?,
                ),
                None => defaults.autosave_quiet,
            },
            http_timeout: match get("HTTP_TIMEOUT_SECS") {
                Some(raw) => Duration::from_secs(
                    raw.parse::<u64>()
                        .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                None => defaults.http_timeout,
            },
            rust_log: get("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }
}
