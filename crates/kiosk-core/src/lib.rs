//! # Kiosk Core
//!
//! Core types shared by every Kiosk crate:
//!
//! - [`Contract`] / [`Operation`] - the immutable API description requests and
//!   responses are checked against
//! - [`Schema`] - structural constraints with full violation reporting
//! - [`KioskError`] - the error taxonomy rendered by the error responder
//! - [`RequestContext`] / [`RequestId`] - per-request state handed to handlers
//! - [`Identity`] - the authenticated user decoded from a bearer token
//! - [`Reply`] - what a resource handler returns

#![doc(html_root_url = "https://docs.rs/kiosk-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
mod context;
mod error;
mod identity;
mod reply;
pub mod schema;

pub use context::{RequestContext, RequestId};
pub use contract::{
    Contract, ContractLoadError, Operation, Parameter, ParameterLocation, RouteResolution,
};
pub use error::{AuthError, ErrorBody, KioskError, KioskResult};
pub use identity::Identity;
pub use reply::Reply;
pub use schema::{Schema, SchemaViolation, StringFormat};
