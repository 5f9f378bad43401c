//! Per-request state handed to resource handlers.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, KioskError, KioskResult};
use crate::identity::Identity;
use crate::schema::SchemaViolation;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for consecutive requests
/// sorted by id.
///
/// # Example
///
/// ```
/// use kiosk_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed: RequestId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// What a resource handler knows about the request it is serving.
///
/// Built by the server after the pipeline has resolved the route and passed
/// the authentication gate, so `operation_id` and path parameters always
/// correspond to a contract operation and `identity` is set whenever the
/// operation requires authentication.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: RequestId,
    identity: Option<Identity>,
    operation_id: Option<String>,
    path_params: HashMap<String, String>,
    query: HashMap<String, String>,
}

impl RequestContext {
    /// Creates an empty context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty context with the given request id.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            ..Self::default()
        }
    }

    /// Sets the authenticated identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the operation id.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Sets the path parameters.
    #[must_use]
    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    /// Adds one path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Returns the request id.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the authenticated identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the authenticated identity or fails with 401.
    pub fn require_identity(&self) -> KioskResult<&Identity> {
        self.identity
            .as_ref()
            .ok_or(KioskError::Auth(AuthError::Unauthenticated))
    }

    /// Returns the operation id.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Returns a raw path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Parses a path parameter.
    ///
    /// A missing or unparseable parameter is reported as a validation error
    /// on `path.<name>`.
    ///
    /// ```
    /// use kiosk_core::RequestContext;
    ///
    /// let ctx = RequestContext::new().with_path_param("id", "42");
    /// assert_eq!(ctx.path_param_as::<u64>("id").unwrap(), 42);
    /// assert!(ctx.path_param_as::<u64>("missing").is_err());
    /// ```
    pub fn path_param_as<T: FromStr>(&self, name: &str) -> KioskResult<T> {
        let field = format!("path.{name}");
        let raw = self.path_param(name).ok_or_else(|| {
            KioskError::validation_with(
                format!("missing path parameter '{name}'"),
                vec![SchemaViolation::new(&field, "is required")],
            )
        })?;
        raw.parse().map_err(|_| {
            KioskError::validation_with(
                format!("invalid path parameter '{name}'"),
                vec![SchemaViolation::new(
                    &field,
                    format!("cannot parse '{raw}'"),
                )],
            )
        })
    }

    /// Returns a query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}
