//! Structured logging for Kiosk services.
//!
//! Every Kiosk crate logs through `tracing` macros. This crate installs the
//! subscriber that turns those events into output: JSON lines for production,
//! or a human-readable format for local development.
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(operation_id = "getUser", "serving request");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
