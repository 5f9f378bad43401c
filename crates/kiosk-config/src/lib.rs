//! Typed configuration for Kiosk services.
//!
//! Configuration is layered, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. An optional TOML or JSON file (unknown fields are rejected)
//! 3. `KIOSK__SECTION__KEY` environment variables, optionally seeded from `.env`
//!
//! # Example
//!
//! ```no_run
//! use kiosk_config::ConfigLoader;
//!
//! # fn main() -> Result<(), kiosk_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()
//!     .with_optional_file("kiosk.toml")?
//!     .with_env_prefix("KIOSK")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [auth]
//! token_secret = "at-least-thirty-two-bytes-of-secret-material"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [contract]
//! path = "contract.json"
//! docs_prefix = "/docs"
//! validate_responses = true
//! ```

#![doc(html_root_url = "https://docs.rs/kiosk-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::KioskConfig;
pub use error::ConfigError;
pub use kiosk_telemetry::LogFormat;
pub use loader::ConfigLoader;
pub use schema::{AuthConfig, ContractConfig, LoggingConfig, ServerConfig, MIN_SECRET_LEN};
