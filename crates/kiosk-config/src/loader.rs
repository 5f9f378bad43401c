//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use kiosk_telemetry::LogFormat;

use crate::{ConfigError, KioskConfig};

/// Builds a [`KioskConfig`] from defaults, an optional file and the
/// environment.
///
/// # Example
///
/// ```
/// use kiosk_config::ConfigLoader;
///
/// let toml = r#"
///     [server]
///     http_addr = "127.0.0.1:8000"
///
///     [auth]
///     token_secret = "0123456789abcdef0123456789abcdef"
/// "#;
///
/// let config = ConfigLoader::new()
///     .with_string(toml, "toml")
///     .unwrap()
///     .load()
///     .unwrap();
///
/// assert_eq!(config.server.http_addr, "127.0.0.1:8000");
/// assert_eq!(config.contract.docs_prefix, "/docs");
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: KioskConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader seeded with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`. The file
    /// replaces earlier layers; fields it omits take their defaults.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, unparseable, or contains
    /// unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        self.config = Self::parse(&content, format)?;
        Ok(self)
    }

    /// Loads configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` ("toml" or "json").
    ///
    /// # Errors
    ///
    /// Fails on an unknown format or invalid content.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Self::parse(content, format)?;
        Ok(self)
    }

    /// Sets the environment variable prefix for overrides.
    ///
    /// Variables use the form `PREFIX__SECTION__KEY`, for example
    /// `KIOSK__SERVER__HTTP_ADDR=127.0.0.1:9000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file into the process environment.
    ///
    /// A missing `.env` file is not an error.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Fails if an override cannot be parsed or validation fails.
    pub fn load(mut self) -> Result<KioskConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    fn parse(content: &str, format: &str) -> Result<KioskConfig, ConfigError> {
        match format.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let mut vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => {
                self.config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                self.config.server.shutdown_timeout_secs = parse_int(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                self.config.server.request_timeout_ms = parse_int(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                self.config.server.max_body_bytes = parse_int(key, value)?;
            }
            ["SERVER", "TRUST_REQUEST_ID"] => {
                self.config.server.trust_request_id = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["AUTH", "TOKEN_SECRET"] => {
                self.config.auth.token_secret = value.to_string();
            }

            ["LOGGING", "ENABLED"] => {
                self.config.logging.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    "compact" => LogFormat::Compact,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json', 'pretty', or 'compact'",
                        ))
                    }
                };
            }

            ["CONTRACT", "PATH"] => {
                self.config.contract.path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["CONTRACT", "DOCS_PREFIX"] => {
                self.config.contract.docs_prefix = value.to_string();
            }
            ["CONTRACT", "VALIDATE_RESPONSES"] => {
                self.config.contract.validate_responses = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            // Unrelated variables sharing the prefix
            _ => {}
        }

        Ok(())
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn with_secret() -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        loader.config.auth.token_secret = SECRET.to_string();
        loader
    }

    #[test]
    fn test_defaults_need_a_secret() {
        assert!(matches!(
            ConfigLoader::new().load(),
            Err(ConfigError::MissingField { .. })
        ));
        assert_eq!(with_secret().load().unwrap().server.http_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_with_string_json() {
        let json = format!(r#"{{"auth": {{"token_secret": "{SECRET}"}}, "contract": {{"validate_responses": false}}}}"#);

        let config = ConfigLoader::new()
            .with_string(&json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(!config.contract.validate_responses);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_with_string_unknown_format() {
        let result = ConfigLoader::new().with_string("", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [server]
            http_port = 3000
        "#;
        assert!(matches!(
            ConfigLoader::new().with_string(toml, "toml"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_with_file_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [server]
            http_addr = "127.0.0.1:4000"

            [auth]
            token_secret = "{SECRET}"

            [logging]
            format = "pretty"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.http_addr, "127.0.0.1:4000");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_with_file_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            ConfigLoader::new().with_file(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_with_file_not_found() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/kiosk.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_with_optional_file_not_found() {
        let config = with_secret()
            .with_optional_file("/nonexistent/kiosk.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.request_timeout_ms, 30000);
    }

    #[test]
    fn test_apply_env_var_overrides() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVER__HTTP_ADDR", "127.0.0.1:9000", "TEST").unwrap();
        loader.apply_env_var("TEST__AUTH__TOKEN_SECRET", SECRET, "TEST").unwrap();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "compact", "TEST").unwrap();
        loader.apply_env_var("TEST__CONTRACT__VALIDATE_RESPONSES", "off", "TEST").unwrap();
        loader.apply_env_var("TEST__CONTRACT__PATH", "api.json", "TEST").unwrap();
        loader.apply_env_var("TEST__SERVER__MAX_BODY_BYTES", "4096", "TEST").unwrap();
        loader.apply_env_var("TEST__SERVER__TRUST_REQUEST_ID", "true", "TEST").unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.contract.validate_responses);
        assert_eq!(config.contract.path.as_deref(), Some("api.json"));
        assert_eq!(config.server.max_body_bytes, 4096);
        assert!(config.server.trust_request_id);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__SERVER__REQUEST_TIMEOUT_MS", "soon", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__LOGGING__ENABLED", "maybe", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__SERVER__MAX_BODY_BYTES", "-1", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST")
            .is_err());
    }

    #[test]
    fn test_apply_env_var_ignores_unknown_keys() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("TEST__SERVER__COLOUR", "blue", "TEST").is_ok());
        assert!(loader.apply_env_var("TESTING", "1", "TEST").is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
