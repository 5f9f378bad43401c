//! Handler registration and dispatch.
//!
//! Handlers are bound to contract operations by `operationId`. By the time a
//! handler runs, the pipeline has already validated its parameters and body
//! and, for protected operations, attached the caller's identity to the
//! [`RequestContext`].
//!
//! A handler returns a [`Reply`] so it can choose its status code, which is
//! how resource handlers answer `201 Created` or an ad hoc `404`.
//!
//! # Example
//!
//! ```
//! use kiosk_core::{KioskResult, Reply, RequestContext};
//! use kiosk_server::HandlerRegistry;
//! use serde_json::json;
//!
//! async fn hello(_ctx: RequestContext) -> KioskResult<Reply> {
//!     Ok(Reply::ok(json!({"message": "Hello, world!"})))
//! }
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_no_body("hello", hello);
//! assert!(registry.contains("hello"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use kiosk_core::{KioskError, KioskResult, Reply, RequestContext};
use kiosk_middleware::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A type-erased handler function.
pub type ErasedHandler =
    Arc<dyn Fn(RequestContext, Option<Value>) -> BoxFuture<'static, KioskResult<Reply>> + Send + Sync>;

/// Maps operation ids to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, ErasedHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler that receives the raw JSON body, if any.
    pub fn register<F, Fut>(&mut self, operation_id: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KioskResult<Reply>> + Send + 'static,
    {
        let erased: ErasedHandler = Arc::new(
            move |ctx, body| -> BoxFuture<'static, KioskResult<Reply>> {
                Box::pin(handler(ctx, body))
            },
        );
        self.handlers.insert(operation_id.into(), erased);
    }

    /// Registers a handler that takes a typed request body.
    ///
    /// The body has already passed contract validation; a body that still
    /// fails to deserialize into `Req` is reported as a validation error.
    pub fn register_json<Req, F, Fut>(&mut self, operation_id: impl Into<String>, handler: F)
    where
        Req: DeserializeOwned + Send + 'static,
        F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KioskResult<Reply>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.register(operation_id, move |ctx, body: Option<Value>| {
            let handler = Arc::clone(&handler);
            async move {
                let body = body.ok_or_else(|| KioskError::validation("request body is required"))?;
                let request: Req = serde_json::from_value(body)
                    .map_err(|e| KioskError::validation(format!("invalid request body: {e}")))?;
                handler(ctx, request).await
            }
        });
    }

    /// Registers a handler that ignores the request body.
    pub fn register_no_body<F, Fut>(&mut self, operation_id: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = KioskResult<Reply>> + Send + 'static,
    {
        self.register(operation_id, move |ctx, _body| handler(ctx));
    }

    /// Invokes the handler for `operation_id`.
    ///
    /// A missing handler is a server defect and surfaces as an internal error.
    pub async fn invoke(
        &self,
        operation_id: &str,
        ctx: RequestContext,
        body: Option<Value>,
    ) -> KioskResult<Reply> {
        let handler = self.handlers.get(operation_id).ok_or_else(|| {
            KioskError::internal(format!("no handler registered for operation '{operation_id}'"))
        })?;
        handler(ctx, body).await
    }

    /// Returns whether a handler is registered for `operation_id`.
    #[must_use]
    pub fn contains(&self, operation_id: &str) -> bool {
        self.handlers.contains_key(operation_id)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the registered operation ids, sorted.
    #[must_use]
    pub fn operation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("operations", &self.operation_ids())
            .finish()
    }
}
