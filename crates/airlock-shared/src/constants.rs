/// Application name
pub const APP_NAME: &str = "Airlock";

/// Login identifier size in bytes
pub const LOGIN_ID_SIZE: usize = 32;

/// Fixed delay between exchange-rate fetch attempts, in seconds
pub const RATE_POLL_INTERVAL_SECS: u64 = 30;

/// Default maximum nesting depth accepted by the stash loader
pub const MAX_LOGIN_DEPTH: usize = 32;

/// Fiat currency paired with every watched currency when gathering rate hints
pub const DEFAULT_FIAT: &str = "iso:USD";

/// Disk layout
pub const LOGINS_DIR: &str = "logins";
pub const RATE_HINT_CACHE_FILE: &str = "rateHintCache.json";
