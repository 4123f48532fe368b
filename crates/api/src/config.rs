use chrono::FixedOffset;
use feedback_core::error_log::DEFAULT_CAPACITY;
use feedback_core::settings::{parsed_from_env, string_from_env};
use feedback_core::timestamps::display_offset;
use feedback_notify::config::DEFAULT_DISPLAY_UTC_OFFSET_HOURS;

use crate::auth::jwt::JwtConfig;

/// Seconds within which an identical submission is treated as a retry.
pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 600;

/// Request body cap; screenshots arrive inline as data URLs.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3300`).
    pub port: u16,
    /// Origins allowed on the admin surface, parsed from comma-separated
    /// `CORS_ORIGINS`. Ingestion routes accept any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
    /// Bearer-token verification for elevated routes.
    pub jwt: JwtConfig,
    /// Gate `GET /api/feedback/list` behind the power-user role.
    pub list_requires_power_user: bool,
    /// Duplicate-submission window; `0` disables suppression.
    pub dedup_window_secs: i64,
    /// Entries kept by the in-memory error log.
    pub error_log_capacity: usize,
    /// Run the outbox worker inside the API process.
    pub embedded_worker: bool,
    /// Offset used for the "today" statistics window.
    pub display_offset: FixedOffset,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3300`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:3300` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `BODY_LIMIT_BYTES`         | `26214400`              |
    /// | `LIST_REQUIRES_POWER_USER` | `false`                 |
    /// | `DEDUP_WINDOW_SECS`        | `600`                   |
    /// | `ERROR_LOG_CAPACITY`       | `1000`                  |
    /// | `EMBEDDED_WORKER`          | `true`                  |
    /// | `DISPLAY_UTC_OFFSET_HOURS` | `9`                     |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = string_from_env("CORS_ORIGINS", "http://localhost:3300")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: string_from_env("HOST", "0.0.0.0"),
            port: parsed_from_env("PORT", 3300),
            cors_origins,
            request_timeout_secs: parsed_from_env("REQUEST_TIMEOUT_SECS", 30),
            body_limit_bytes: parsed_from_env("BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES),
            jwt: JwtConfig::from_env(),
            list_requires_power_user: parsed_from_env("LIST_REQUIRES_POWER_USER", false),
            dedup_window_secs: parsed_from_env("DEDUP_WINDOW_SECS", DEFAULT_DEDUP_WINDOW_SECS),
            error_log_capacity: parsed_from_env("ERROR_LOG_CAPACITY", DEFAULT_CAPACITY),
            embedded_worker: parsed_from_env("EMBEDDED_WORKER", true),
            display_offset: display_offset(parsed_from_env(
                "DISPLAY_UTC_OFFSET_HOURS",
                DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
            )),
        }
    }
}
