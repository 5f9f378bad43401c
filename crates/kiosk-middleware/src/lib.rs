//! # Kiosk Middleware
//!
//! The ordered interceptor pipeline every Kiosk request passes through.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → ErrorResponder → RequestId → AccessLog → RequestValidation → AuthGate → ResponseValidation → Handler
//!                 ↑                                                                                        │
//! Response ←──────┴──────────────────────────────── (Ok response or Err(KioskError)) ←─────────────────────┘
//! ```
//!
//! | Stage | Middleware          | Purpose                                          |
//! |-------|---------------------|--------------------------------------------------|
//! | 1     | Error Responder     | Render any failure as `{ message, errors }`      |
//! | 2     | Request ID          | Generate/propagate `x-request-id` (UUID v7)      |
//! | 3     | Access Log          | One structured log event per request             |
//! | 4     | Request Validation  | Resolve route, validate parameters and body      |
//! | 5     | Auth Gate           | Verify bearer token on protected operations      |
//! | 6     | Response Validation | Check the handler's body against the contract    |
//!
//! Each stage either continues by awaiting [`Next::run`] or short-circuits by
//! returning `Err(KioskError)`. Errors travel outwards untouched until the
//! error responder turns them into a response.
//!
//! ## Example
//!
//! ```
//! use kiosk_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 6);
//! assert_eq!(stages[0].name(), "error_responder");
//! assert_eq!(stages[5].name(), "response_validation");
//! ```

#![doc(html_root_url = "https://docs.rs/kiosk-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::{MiddlewareContext, RouteMatch};
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use types::{Request, Response, ResponseExt};
