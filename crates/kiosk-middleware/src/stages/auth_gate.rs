//! Bearer token gate.
//!
//! Runs after request validation, so it knows which operation the request
//! resolved to. Operations that do not require authentication pass through
//! untouched; for the rest, the `Authorization: Bearer <token>` header must
//! carry a token the [`TokenService`] accepts.
//!
//! | Condition | Outcome |
//! |---|---|
//! | header missing, not `Bearer`, or empty token | 401 |
//! | token malformed, badly signed, or expired | 403 |
//! | token valid | identity attached, request continues |

use std::sync::Arc;

use http::header::AUTHORIZATION;
use kiosk_auth::TokenService;
use kiosk_core::{AuthError, KioskResult};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};

const BEARER_PREFIX: &str = "Bearer ";

/// Verifies bearer tokens on protected operations.
#[derive(Debug, Clone)]
pub struct AuthGateMiddleware {
    tokens: Arc<TokenService>,
}

impl AuthGateMiddleware {
    /// Creates a gate that verifies tokens with `tokens`.
    #[must_use]
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    let header = request.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

impl Middleware for AuthGateMiddleware {
    fn name(&self) -> &'static str {
        "auth_gate"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, KioskResult<Response>> {
        Box::pin(async move {
            let protected = ctx
                .route()
                .is_some_and(|route| route.operation().requires_auth());
            if !protected {
                return next.run(ctx, request).await;
            }

            let Some(token) = bearer_token(&request) else {
                tracing::warn!(
                    request_id = %ctx.request_id(),
                    path = %request.uri().path(),
                    "missing bearer token"
                );
                return Err(AuthError::Unauthenticated.into());
            };

            match self.tokens.verify(token) {
                Ok(identity) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        user = %identity.log_id(),
                        "bearer token accepted"
                    );
                    ctx.set_identity(identity);
                    next.run(ctx, request).await
                }
                Err(reason) => {
                    tracing::warn!(
                        request_id = %ctx.request_id(),
                        path = %request.uri().path(),
                        %reason,
                        "bearer token rejected"
                    );
                    Err(AuthError::Forbidden.into())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RouteMatch;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use http::{Method, StatusCode};
    use kiosk_core::contract::{Contract, Operation};
    use kiosk_core::Identity;
    use serde_json::json;

    const SECRET: &str = "gate-test-secret";

    fn contract() -> Arc<Contract> {
        Arc::new(
            Contract::builder("test")
                .operation(
                    Operation::builder("open")
                        .method(Method::GET)
                        .path("/open")
                        .build(),
                )
                .operation(
                    Operation::builder("secret")
                        .method(Method::GET)
                        .path("/secret")
                        .authenticated()
                        .build(),
                )
                .build(),
        )
    }

    fn routed(index: usize) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::new();
        ctx.set_extension(RouteMatch::new(contract(), index));
        ctx
    }

    fn gate() -> AuthGateMiddleware {
        AuthGateMiddleware::new(Arc::new(TokenService::new(SECRET)))
    }

    fn identity() -> Identity {
        Identity::new(1, "Joaquin Tripp", "joaquintripp@example.com")
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/secret");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn echo_identity() -> Next<'static> {
        Next::handler(|ctx, _req| {
            let id = ctx.identity().map(|i| i.id);
            Box::pin(async move { Ok(Response::json(StatusCode::OK, &json!({"id": id}))) })
        })
    }

    async fn run(ctx: &mut MiddlewareContext, authorization: Option<&str>) -> KioskResult<Response> {
        gate().process(ctx, request(authorization), echo_identity()).await
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&request(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("Bearer  abc "))), Some("abc"));
        assert_eq!(bearer_token(&request(Some("Bearer "))), None);
        assert_eq!(bearer_token(&request(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&request(None)), None);
    }

    #[tokio::test]
    async fn test_open_operation_passes_without_token() {
        let mut ctx = routed(0);
        let response = run(&mut ctx, None).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(ctx.identity().is_none());
    }

    #[tokio::test]
    async fn test_unrouted_request_passes() {
        let mut ctx = MiddlewareContext::new();
        assert!(run(&mut ctx, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_token_is_401() {
        let mut ctx = routed(1);
        let err = run(&mut ctx, None).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = run(&mut ctx, Some("Token abc")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_token_is_403() {
        let mut ctx = routed(1);
        let err = run(&mut ctx, Some("Bearer not-a-token")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_403() {
        let token = TokenService::new("another-secret").issue(&identity()).unwrap();
        let mut ctx = routed(1);

        let err = run(&mut ctx, Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_token_is_403() {
        let issued = Utc::now() - Duration::hours(2);
        let token = TokenService::new(SECRET)
            .issue_at(&identity(), issued)
            .unwrap();
        let mut ctx = routed(1);

        let err = run(&mut ctx, Some(&format!("Bearer {token}")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let token = TokenService::new(SECRET).issue(&identity()).unwrap();
        let mut ctx = routed(1);

        let response = run(&mut ctx, Some(&format!("Bearer {token}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.identity(), Some(&identity()));
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["id"], 1);
    }
}
