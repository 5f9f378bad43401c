//! Handler output.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::KioskResult;

/// A status code and JSON body produced by a resource handler.
///
/// Handlers may answer with any status the contract declares for their
/// operation, including ad hoc `404 { "error": ... }` replies.
///
/// ```
/// use kiosk_core::Reply;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let reply = Reply::new(StatusCode::NOT_FOUND, json!({"error": "User not found"}));
/// assert_eq!(reply.status, StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: Value,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `201 Created` with `body`.
    #[must_use]
    pub fn created(body: Value) -> Self {
        Self::new(StatusCode::CREATED, body)
    }

    /// Serializes `body` into a reply.
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> KioskResult<Self> {
        Ok(Self::new(status, serde_json::to_value(body)?))
    }
}
