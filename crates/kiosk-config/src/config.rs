//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, ContractConfig, LoggingConfig, ServerConfig, MIN_SECRET_LEN};

/// Complete Kiosk service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use kiosk_config::KioskConfig;
///
/// let config = KioskConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:3000");
/// assert!(config.validate().is_err()); // no token secret yet
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KioskConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Token signing configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Contract and documentation configuration.
    #[serde(default)]
    pub contract: ContractConfig,
}

impl KioskConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found:
    /// - `server.http_addr` is not a socket address
    /// - a timeout is zero
    /// - `auth.token_secret` is unset or shorter than [`MIN_SECRET_LEN`] bytes
    /// - `contract.docs_prefix` does not start with `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.shutdown_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.shutdown_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::missing_field("auth.token_secret"));
        }

        if self.auth.token_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid_value(
                "auth.token_secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }

        if !self.contract.docs_prefix.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "contract.docs_prefix",
                "must start with '/'",
            ));
        }

        Ok(())
    }
}
