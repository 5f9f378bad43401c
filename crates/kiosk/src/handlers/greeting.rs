//! Greeting endpoints.

use kiosk_core::{KioskResult, Reply, RequestContext};
use serde_json::json;

/// Name used by `greet` when none is given.
pub const DEFAULT_NAME: &str = "stranger";

/// `GET /hello`
pub async fn hello() -> KioskResult<Reply> {
    Ok(Reply::ok(json!({"message": "Hello, world!"})))
}

/// `GET /goodbye` and `GET /api/v1/goodbye`
pub async fn goodbye() -> KioskResult<Reply> {
    Ok(Reply::ok(json!({
        "message": "Goodbye, world!",
        "description": "This endpoint returns a farewell message."
    })))
}

/// `GET /greet` and `GET /api/v1/greet`
pub async fn greet(ctx: RequestContext) -> KioskResult<Reply> {
    let name = ctx
        .query_param("name")
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_NAME);

    Ok(Reply::ok(json!({
        "message": format!("Hello, {name}!"),
        "description": "This endpoint returns a personalized greeting message."
    })))
}

/// `GET /api/v1/hello`, greeting the caller named in the bearer token.
pub async fn hello_user(ctx: RequestContext) -> KioskResult<Reply> {
    let identity = ctx.require_identity()?;
    tracing::debug!(user = %identity.log_id(), "greeting authenticated user");

    Ok(Reply::ok(json!({"message": format!("Hello, {}!", identity.name)})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use kiosk_core::Identity;

    #[tokio::test]
    async fn test_greet_defaults_to_stranger() {
        let reply = greet(RequestContext::new()).await.unwrap();
        assert_eq!(reply.body["message"], "Hello, stranger!");

        let ctx = RequestContext::new().with_query([("name".to_string(), String::new())].into());
        let reply = greet(ctx).await.unwrap();
        assert_eq!(reply.body["message"], "Hello, stranger!");
    }

    #[tokio::test]
    async fn test_greet_uses_name() {
        let ctx = RequestContext::new().with_query([("name".to_string(), "Ada".to_string())].into());
        let reply = greet(ctx).await.unwrap();
        assert_eq!(reply.body["message"], "Hello, Ada!");
        assert_eq!(
            reply.body["description"],
            "This endpoint returns a personalized greeting message."
        );
    }

    #[tokio::test]
    async fn test_hello_user_needs_identity() {
        let err = hello_user(RequestContext::new()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let ctx = RequestContext::new().with_identity(Identity::new(
            1,
            "Joaquin Tripp",
            "joaquintripp@example.com",
        ));
        let reply = hello_user(ctx).await.unwrap();
        assert_eq!(reply.body["message"], "Hello, Joaquin Tripp!");
    }
}
