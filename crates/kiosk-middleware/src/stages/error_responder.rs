//! Error responder middleware.
//!
//! The outermost stage. Any `Err(KioskError)` raised further in becomes a
//! JSON response with the error's status and the uniform body:
//!
//! ```json
//! { "message": "body.price must be a multiple of 0.01", "errors": [ ... ] }
//! ```
//!
//! `errors` is omitted when there are no details. Server errors never carry
//! details; their full context is logged here instead.

use http::header::HeaderValue;
use kiosk_core::{KioskError, KioskResult, RequestId};

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::request_id::REQUEST_ID_HEADER,
    types::{Request, Response, ResponseExt},
};

/// Renders failures as the uniform error body.
#[derive(Debug, Clone, Default)]
pub struct ErrorResponderMiddleware;

impl ErrorResponderMiddleware {
    /// Creates the error responder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Renders `err` as a response tagged with `request_id`.
///
/// Also used by the server for failures that happen outside the pipeline,
/// such as timeouts.
#[must_use]
pub fn render(err: &KioskError, request_id: RequestId) -> Response {
    let status = err.status_code();

    if err.is_server_error() {
        tracing::error!(
            request_id = %request_id,
            status = status.as_u16(),
            error = %err,
            source = ?std::error::Error::source(err),
            violations = ?err.violations(),
            "request failed"
        );
    } else {
        tracing::debug!(
            request_id = %request_id,
            status = status.as_u16(),
            error = %err,
            "request rejected"
        );
    }

    let body = serde_json::to_value(err.to_body()).unwrap_or_default();
    let mut response = Response::json(status, &body);
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

impl Middleware for ErrorResponderMiddleware {
    fn name(&self) -> &'static str {
        "error_responder"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            let result = next.run(ctx, request).await;
            Ok(result.unwrap_or_else(|err| render(&err, ctx.request_id())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use kiosk_core::{AuthError, SchemaViolation};
    use serde_json::{json, Value};

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Bytes::new())
            .unwrap()
    }

    async fn respond_with(err: KioskError) -> Response {
        let middleware = ErrorResponderMiddleware::new();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(move |_ctx, _req| Box::pin(async move { Err(err) }));
        middleware.process(&mut ctx, request(), next).await.unwrap()
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_passes_success_through() {
        let middleware = ErrorResponderMiddleware::new();
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::json(StatusCode::OK, &json!({"message": "hi"}))) })
        });

        let response = middleware.process(&mut ctx, request(), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response), json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn test_renders_contract_error_with_details() {
        let response = respond_with(KioskError::invalid_request(vec![SchemaViolation::new(
            "body.category",
            "must be one of: books",
        )]))
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&response),
            json!({
                "message": "body.category must be one of: books",
                "errors": [{"path": "body.category", "message": "must be one of: books"}]
            })
        );
    }

    #[tokio::test]
    async fn test_renders_auth_errors() {
        let response = respond_with(AuthError::Unauthenticated.into()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body(&response).get("errors").is_none());

        let response = respond_with(AuthError::Forbidden.into()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_hides_internal_details() {
        let response = respond_with(KioskError::internal("secret detail")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response), json!({"message": "internal server error"}));
    }

    #[tokio::test]
    async fn test_tags_response_with_request_id() {
        let response = respond_with(KioskError::no_route()).await;
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_render_sets_json_content_type() {
        let response = render(&KioskError::not_found("User not found"), RequestId::new());
        assert_eq!(
            response.headers()[http::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
