//! Error taxonomy for Kiosk.
//!
//! Every failure a pipeline stage or handler can signal is a [`KioskError`].
//! Each variant knows its HTTP status, and [`KioskError::to_body`] produces the
//! uniform `{ message, errors }` body the error responder sends. That is the
//! only place error response shape is decided.
//!
//! | Variant | Status |
//! |---|---|
//! | `Contract` | 400 request violation, 404 no route, 405 wrong method, 415 non-JSON body, 500 response violation |
//! | `Auth(Unauthenticated)` | 401 |
//! | `Auth(Forbidden)` | 403 |
//! | `Auth(InvalidCredentials)` | 401 |
//! | `NotFound` | 404 |
//! | `Validation` | 400 |
//! | `Internal` | 500 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::SchemaViolation;

/// Result type alias using [`KioskError`].
pub type KioskResult<T> = Result<T, KioskError>;

/// Authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header.
    #[error("authentication required")]
    Unauthenticated,

    /// A bearer token was presented but failed verification.
    #[error("invalid or expired token")]
    Forbidden,

    /// Login credentials did not match any user.
    #[error("invalid email or password")]
    InvalidCredentials,
}

impl AuthError {
    /// Returns the HTTP status for this failure.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

/// Standard error type for Kiosk.
///
/// # Example
///
/// ```
/// use kiosk_core::KioskError;
/// use http::StatusCode;
///
/// let err = KioskError::not_found("Widget not found");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
///
/// let body = serde_json::to_value(err.to_body()).unwrap();
/// assert_eq!(body, serde_json::json!({"message": "Widget not found"}));
/// ```
#[derive(Debug, Error)]
pub enum KioskError {
    /// A request or response did not satisfy the contract.
    #[error("contract error ({status}): {message}")]
    Contract {
        /// Status to respond with.
        status: StatusCode,
        /// Summary message.
        message: String,
        /// Individual violations.
        errors: Vec<SchemaViolation>,
    },

    /// Authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A looked-up entity does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable message.
        message: String,
    },

    /// Handler-local input checks failed.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable message.
        message: String,
        /// Individual violations, if any.
        errors: Vec<SchemaViolation>,
    },

    /// Something went wrong on the server.
    #[error("internal error: {message}")]
    Internal {
        /// Message for logs. Never sent to clients.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl KioskError {
    /// No route template matches the request path.
    #[must_use]
    pub fn no_route() -> Self {
        Self::Contract {
            status: StatusCode::NOT_FOUND,
            message: "no matching route".to_string(),
            errors: Vec::new(),
        }
    }

    /// A route template matches, but not for the request method.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::Contract {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "method not allowed".to_string(),
            errors: Vec::new(),
        }
    }

    /// The request body is not JSON.
    #[must_use]
    pub fn unsupported_media_type(content_type: &str) -> Self {
        Self::Contract {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: format!("unsupported media type '{content_type}'"),
            errors: Vec::new(),
        }
    }

    /// The request failed contract validation.
    #[must_use]
    pub fn invalid_request(errors: Vec<SchemaViolation>) -> Self {
        let message = match errors.as_slice() {
            [] => "request validation failed".to_string(),
            [only] => only.to_string(),
            [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
        };
        Self::Contract {
            status: StatusCode::BAD_REQUEST,
            message,
            errors,
        }
    }

    /// The request body is not valid JSON.
    #[must_use]
    pub fn malformed_body(detail: impl std::fmt::Display) -> Self {
        Self::Contract {
            status: StatusCode::BAD_REQUEST,
            message: format!("request body is not valid JSON: {detail}"),
            errors: Vec::new(),
        }
    }

    /// The handler produced a response that does not satisfy the contract.
    ///
    /// The violations are kept for logging; [`to_body`](Self::to_body) never
    /// exposes them.
    #[must_use]
    pub fn response_violation(errors: Vec<SchemaViolation>) -> Self {
        Self::Contract {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "response contract violation".to_string(),
            errors,
        }
    }

    /// A looked-up entity does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Handler-local validation failed.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Handler-local validation failed with field details.
    pub fn validation_with(message: impl Into<String>, errors: Vec<SchemaViolation>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Internal server error with an underlying cause.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Contract { status, .. } => *status,
            Self::Auth(auth) => auth.status_code(),
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the structured violations carried by this error.
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            Self::Contract { errors, .. } | Self::Validation { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Returns whether this error is the server's fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Renders the uniform client-facing body.
    ///
    /// Server errors are reduced to their public message with no details.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::Internal { .. } => ErrorBody::new("internal server error"),
            Self::Contract {
                status, message, ..
            } if status.is_server_error() => ErrorBody::new(message.clone()),
            Self::Contract {
                message, errors, ..
            }
            | Self::Validation { message, errors } => {
                ErrorBody::new(message.clone()).with_errors(errors.clone())
            }
            Self::Auth(auth) => ErrorBody::new(auth.to_string()),
            Self::NotFound { message } => ErrorBody::new(message.clone()),
        }
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_with_source("JSON serialization failed", err)
    }
}

/// The uniform error response body: `{ "message": ..., "errors": [...] }`.
///
/// `errors` is omitted when there are no structured details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub message: String,
    /// Structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<SchemaViolation>>,
}

impl ErrorBody {
    /// Creates a body with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: None,
        }
    }

    /// Attaches structured details. An empty list leaves `errors` unset.
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<SchemaViolation>) -> Self {
        self.errors = if errors.is_empty() { None } else { Some(errors) };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn violation(path: &str) -> SchemaViolation {
        SchemaViolation::new(path, "is wrong")
    }

    #[test]
    fn test_contract_statuses() {
        assert_eq!(KioskError::no_route().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            KioskError::method_not_allowed().status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            KioskError::unsupported_media_type("text/plain").status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            KioskError::invalid_request(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            KioskError::response_violation(vec![]).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_statuses() {
        let unauthenticated: KioskError = AuthError::Unauthenticated.into();
        let forbidden: KioskError = AuthError::Forbidden.into();
        let invalid: KioskError = AuthError::InvalidCredentials.into();

        assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(invalid.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_request_message_summarizes() {
        let one = KioskError::invalid_request(vec![violation("body.price")]);
        assert_eq!(one.to_body().message, "body.price is wrong");

        let many = KioskError::invalid_request(vec![violation("body.a"), violation("body.b")]);
        assert_eq!(many.to_body().message, "body.a is wrong (and 1 more)");
    }

    #[test]
    fn test_request_violation_body_carries_errors() {
        let err = KioskError::invalid_request(vec![violation("query.name")]);
        let body = serde_json::to_value(err.to_body()).unwrap();

        assert_eq!(
            body["errors"],
            json!([{"path": "query.name", "message": "is wrong"}])
        );
    }

    #[test]
    fn test_response_violation_hides_details() {
        let err = KioskError::response_violation(vec![violation("response.secret")]);

        assert_eq!(err.violations().len(), 1);
        let body = serde_json::to_value(err.to_body()).unwrap();
        assert_eq!(body, json!({"message": "response contract violation"}));
    }

    #[test]
    fn test_internal_hides_message() {
        let err = KioskError::internal_with_source(
            "database password is hunter2",
            std::io::Error::other("boom"),
        );

        assert!(err.is_server_error());
        assert_eq!(err.to_body(), ErrorBody::new("internal server error"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_without_errors_omits_field() {
        let body = serde_json::to_value(KioskError::validation("name is blank").to_body()).unwrap();
        assert_eq!(body, json!({"message": "name is blank"}));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            KioskError::not_found("User not found").to_string(),
            "not found: User not found"
        );
        assert_eq!(
            KioskError::from(AuthError::Forbidden).to_string(),
            "invalid or expired token"
        );
    }
}
