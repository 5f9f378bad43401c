//! Request ID middleware.
//!
//! Every request gets a UUID v7 id stored in the [`MiddlewareContext`] and
//! echoed back in the `x-request-id` response header, so clients can quote
//! it when reporting a problem and it lines up with the server's logs.
//!
//! Incoming `x-request-id` headers are ignored unless the middleware is built
//! with [`RequestIdMiddleware::trust_incoming`], for deployments behind a
//! proxy that assigns ids itself.

use http::header::HeaderValue;
use kiosk_core::{KioskResult, RequestId};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

/// The header name for request id propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates or propagates request ids.
#[derive(Debug, Clone, Default)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl RequestIdMiddleware {
    /// Creates a middleware that always generates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a middleware that reuses a valid incoming `x-request-id`.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| s.parse().ok())
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(&request)
                .unwrap_or_else(RequestId::new);
            ctx.set_request_id(request_id);

            let mut response = next.run(ctx, request).await?;

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}
