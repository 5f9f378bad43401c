//! User endpoints.

use std::sync::Arc;

use http::StatusCode;
use kiosk_auth::PasswordHasher;
use kiosk_core::{KioskError, KioskResult, Reply, RequestContext};
use serde_json::json;

use crate::models::{CreateUser, UpdateUser, UserDraft};
use crate::repository::{RepositoryError, UserRepository};

fn not_found() -> Reply {
    Reply::new(StatusCode::NOT_FOUND, json!({"error": "User not found"}))
}

fn conflict(err: RepositoryError) -> KioskError {
    KioskError::validation(err.to_string())
}

fn check_name(name: &str) -> KioskResult<()> {
    if name.trim().is_empty() {
        return Err(KioskError::validation("name must not be blank"));
    }
    Ok(())
}

/// `POST /api/v1/users`
pub async fn create(users: Arc<dyn UserRepository>, body: CreateUser) -> KioskResult<Reply> {
    check_name(&body.name)?;

    let user = users
        .create(UserDraft {
            name: body.name,
            email: body.email,
            password_hash: PasswordHasher::hash(&body.password),
        })
        .await
        .map_err(conflict)?;

    tracing::info!(user_id = user.id, "user created");
    Reply::json(StatusCode::CREATED, &user)
}

/// `GET /api/v1/users/{id}`
pub async fn get(users: Arc<dyn UserRepository>, ctx: RequestContext) -> KioskResult<Reply> {
    let id: u64 = ctx.path_param_as("id")?;
    match users.get(id).await {
        Some(user) => Reply::json(StatusCode::OK, &user),
        None => Ok(not_found()),
    }
}

/// `PUT /api/v1/users/{id}`
pub async fn update(
    users: Arc<dyn UserRepository>,
    ctx: RequestContext,
    body: UpdateUser,
) -> KioskResult<Reply> {
    let id: u64 = ctx.path_param_as("id")?;
    let Some(mut user) = users.get(id).await else {
        return Ok(not_found());
    };

    if let Some(name) = body.name {
        check_name(&name)?;
        user.name = name;
    }
    if let Some(email) = body.email {
        user.email = email;
    }
    if let Some(password) = body.password {
        user.password_hash = PasswordHasher::hash(&password);
    }

    match users.update(user).await.map_err(conflict)? {
        Some(user) => Reply::json(StatusCode::OK, &user),
        None => Ok(not_found()),
    }
}
