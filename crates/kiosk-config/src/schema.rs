//! Configuration sections.

use std::fmt;

use kiosk_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Minimum length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// HTTP server settings.
///
/// # Example
///
/// ```
/// use kiosk_config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.http_addr, "0.0.0.0:3000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:3000").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest request body accepted, in bytes. Larger bodies get 413.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Reuse a client-supplied `x-request-id` instead of generating one.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            trust_request_id: false,
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Token signing settings.
///
/// The secret has no default and must be supplied by file or environment.
/// `Debug` output redacts it.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// HS256 signing secret.
    #[serde(default)]
    pub token_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.token_secret.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("AuthConfig")
            .field("token_secret", &secret)
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives (e.g. "info" or "info,kiosk_auth=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts to the telemetry crate's configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            file_line_info: self.format != LogFormat::Json,
            ..LogConfig::default()
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Contract and documentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContractConfig {
    /// JSON contract to load instead of the built-in one.
    #[serde(default)]
    pub path: Option<String>,

    /// Path prefix serving documentation, exempt from validation.
    #[serde(default = "default_docs_prefix")]
    pub docs_prefix: String,

    /// Check handler responses against the contract.
    #[serde(default = "default_true")]
    pub validate_responses: bool,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            path: None,
            docs_prefix: default_docs_prefix(),
            validate_responses: true,
        }
    }
}

fn default_docs_prefix() -> String {
    "/docs".to_string()
}

fn default_true() -> bool {
    true
}
