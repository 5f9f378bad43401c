//! Access log middleware.
//!
//! Emits one `info` event per request once the inner stages have finished,
//! whether they produced a response or a failure:
//!
//! ```text
//! INFO request completed request_id=... method=POST path=/api/v1/products operation_id=createProduct status=201 duration_ms=0.41
//! ```

use kiosk_core::{Identity, KioskResult};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// Logs method, path, operation, status and duration of every request.
#[derive(Debug, Clone, Default)]
pub struct AccessLogMiddleware;

impl AccessLogMiddleware {
    /// Creates the access log stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();

            let result = next.run(ctx, request).await;

            let status = match &result {
                Ok(response) => response.status(),
                Err(err) => err.status_code(),
            };
            let user = ctx.identity().map(Identity::log_id);
            tracing::info!(
                request_id = %ctx.request_id(),
                method = %method,
                path = %path,
                operation_id = ctx.operation_id().unwrap_or("-"),
                user = user.as_deref(),
                status = status.as_u16(),
                duration_ms = ctx.elapsed().as_secs_f64() * 1000.0,
                "request completed"
            );

            result
        })
    }
}
