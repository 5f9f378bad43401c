//! The standard pipeline stages, outermost first.
//!
//! 1. [`error_responder`] - render failures as `{ message, errors }`
//! 2. [`request_id`] - generate/propagate `x-request-id`
//! 3. [`access_log`] - one structured log event per request
//! 4. [`validation`] - request phase of contract validation
//! 5. [`auth_gate`] - bearer token verification on protected operations
//! 6. [`validation`] - response phase of contract validation

pub mod access_log;
pub mod auth_gate;
pub mod error_responder;
pub mod request_id;
pub mod validation;

pub use access_log::AccessLogMiddleware;
pub use auth_gate::AuthGateMiddleware;
pub use error_responder::ErrorResponderMiddleware;
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use validation::{RequestValidationMiddleware, ResponseValidationMiddleware};
