//! Runtime settings read from the environment
use super::notification::DEFAULT_FEED_CAPACITY;
use anyhow::Context;
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::{info, warn};

pub const DEFAULT_DB_PATH: &str = "zerocrumbs.db";
pub const DEFAULT_MASTER_OTP: &str = "000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Code accepted for any claimed listing. `None` disables it.
    pub master_override: Option<String>,
    pub feed_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            master_override: Some(DEFAULT_MASTER_OTP.to_string()),
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let master = var("ZEROCRUMBS_MASTER_OTP").unwrap_or_else(|| {
            info!("ZEROCRUMBS_MASTER_OTP not set, using default override");
            DEFAULT_MASTER_OTP.to_string()
        });

        Ok(Self {
            db_path: try_load("ZEROCRUMBS_DB_PATH", DEFAULT_DB_PATH)?,
            master_override: Some(master.trim().to_string()).filter(|code| !code.is_empty()),
            feed_capacity: try_load("ZEROCRUMBS_FEED_CAPACITY", "15")?,
        })
    }

    pub fn without_master_override(mut self) -> Self {
        self.master_override = None;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("{e}")
        })
        .with_context(|| format!("Environment misconfigured: {key}={raw}"))
}
