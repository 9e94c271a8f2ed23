//! Application configuration.
//!
//! Values are read from environment variables once, on first access.
//! `.env` is loaded by `main` before any of these statics are touched.

use once_cell::sync::Lazy;
use std::env;

/// Path to the SQLite database file
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "kopilka.db".to_string()));

/// Path to the log file
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Telegram bot token.
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// API key for exchangerate-api.com. Rates are reported as not
/// configured when empty.
pub static EXCHANGE_RATE_API_KEY: Lazy<String> =
    Lazy::new(|| env::var("EXCHANGE_RATE_API_KEY").unwrap_or_else(|_| String::new()));

/// Web mini-app HTTP server settings
pub mod webapp {
    use once_cell::sync::Lazy;
    use std::env;

    /// Default TCP port for the REST API
    pub const DEFAULT_PORT: u16 = 8080;

    /// Port for the REST API, WEBAPP_PORT environment variable
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("WEBAPP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    });
}

/// Network timeouts
pub mod network {
    use std::time::Duration;

    /// Timeout for outgoing exchange-rate API requests
    pub fn request_timeout() -> Duration {
        Duration::from_secs(10)
    }

    /// Timeout for Telegram API calls
    pub fn telegram_timeout() -> Duration {
        Duration::from_secs(30)
    }
}

/// Dispatcher restart policy
pub mod retry {
    use std::time::Duration;

    /// How many times the dispatcher is restarted after a fatal error
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Base of the exponential backoff between restarts
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// Delay before restart attempt `retry_count`
    pub fn dispatcher_delay(retry_count: u32) -> Duration {
        Duration::from_secs(EXPONENTIAL_BACKOFF_BASE.pow(retry_count))
    }
}
