//! Core configuration loaded from environment variables.
//!
//! Every setting has a default so the core starts with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use airlock_shared::constants::{DEFAULT_FIAT, MAX_LOGIN_DEPTH, RATE_POLL_INTERVAL_SECS};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Application whose login the host works with. Empty for the root.
    /// Env: `AIRLOCK_APP_ID`
    pub app_id: String,

    /// Delay after each exchange-rate fetch attempt, successful or not.
    /// Env: `AIRLOCK_RATE_INTERVAL_SECS`
    /// Default: 30 seconds
    pub rate_interval: Duration,

    /// Deepest login tree the stash loader accepts.
    /// Env: `AIRLOCK_MAX_LOGIN_DEPTH`
    /// Default: 32
    pub max_login_depth: usize,

    /// Fiat every watched currency is priced against.
    /// Env: `AIRLOCK_DEFAULT_FIAT`
    /// Default: `iso:USD`
    pub default_fiat: String,

    /// Where the SQLite disk lives. `None` uses the platform data directory.
    /// Env: `AIRLOCK_DATA_DIR`
    pub data_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            rate_interval: Duration::from_secs(RATE_POLL_INTERVAL_SECS),
            max_login_depth: MAX_LOGIN_DEPTH,
            default_fiat: DEFAULT_FIAT.to_string(),
            data_dir: None,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(app_id) = lookup("AIRLOCK_APP_ID") {
            config.app_id = app_id;
        }

        if let Some(val) = lookup("AIRLOCK_RATE_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.rate_interval = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid AIRLOCK_RATE_INTERVAL_SECS, using default"
                ),
            }
        }

        if let Some(val) = lookup("AIRLOCK_MAX_LOGIN_DEPTH") {
            match val.parse::<usize>() {
                Ok(depth) if depth > 0 => config.max_login_depth = depth,
                _ => tracing::warn!(
                    value = %val,
                    "Invalid AIRLOCK_MAX_LOGIN_DEPTH, using default"
                ),
            }
        }

        if let Some(fiat) = lookup("AIRLOCK_DEFAULT_FIAT") {
            if fiat.is_empty() {
                tracing::warn!("Empty AIRLOCK_DEFAULT_FIAT, using default");
            } else {
                config.default_fiat = fiat;
            }
        }

        if let Some(dir) = lookup("AIRLOCK_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        config
    }
}
