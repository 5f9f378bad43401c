//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries state through the pipeline. Stages enrich
//! it as the request moves inwards (request id, resolved route, identity) and
//! the terminal handler turns it into an immutable [`RequestContext`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use kiosk_core::{Contract, Identity, Operation, RequestContext, RequestId};
use serde_json::Value;

/// The contract operation a request resolved to, with its validated inputs.
///
/// Stored as a context extension by the request validation stage. Its
/// absence means the request was exempt from validation (the docs path).
#[derive(Debug, Clone)]
pub struct RouteMatch {
    contract: Arc<Contract>,
    index: usize,
    /// Path parameters keyed by template name.
    pub path_params: HashMap<String, String>,
    /// Query parameters.
    pub query: HashMap<String, String>,
    /// The parsed request body, when the operation declares one.
    pub body: Option<Value>,
}

impl RouteMatch {
    /// Creates a route match for the operation at `index` in `contract`.
    ///
    /// `index` must come from [`Contract::resolve`] on the same contract.
    #[must_use]
    pub fn new(contract: Arc<Contract>, index: usize) -> Self {
        Self {
            contract,
            index,
            path_params: HashMap::new(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Returns the matched operation.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.contract.operations()[self.index]
    }
}

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use kiosk_middleware::context::MiddlewareContext;
/// use kiosk_core::Identity;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_identity(Identity::new(1, "Joaquin Tripp", "joaquintripp@example.com"));
///
/// assert_eq!(ctx.identity().map(|i| i.id), Some(1));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    identity: Option<Identity>,
    operation_id: Option<String>,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request id.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            identity: None,
            operation_id: None,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the request id.
    ///
    /// Only the request id stage should call this.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the authenticated identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Sets the authenticated identity.
    ///
    /// Only the auth gate should call this.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Returns the resolved operation id.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Sets the operation id after route resolution.
    pub fn set_operation_id(&mut self, operation_id: impl Into<String>) {
        self.operation_id = Some(operation_id.into());
    }

    /// Returns the elapsed time since the request entered the pipeline.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value, replacing any previous one.
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Returns the resolved route, if the request was validated.
    #[must_use]
    pub fn route(&self) -> Option<&RouteMatch> {
        self.get_extension::<RouteMatch>()
    }

    /// Builds the handler-facing [`RequestContext`].
    #[must_use]
    pub fn to_request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::with_request_id(self.request_id);

        if let Some(identity) = &self.identity {
            ctx = ctx.with_identity(identity.clone());
        }
        if let Some(op_id) = &self.operation_id {
            ctx = ctx.with_operation_id(op_id.clone());
        }
        if let Some(route) = self.route() {
            ctx = ctx
                .with_path_params(route.path_params.clone())
                .with_query(route.query.clone());
        }

        ctx
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
