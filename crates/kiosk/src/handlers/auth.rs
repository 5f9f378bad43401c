//! Login.

use std::sync::Arc;

use kiosk_auth::{PasswordHasher, TokenService};
use kiosk_core::{AuthError, Identity, KioskError, KioskResult, Reply};
use serde_json::json;

use crate::models::Credentials;
use crate::repository::UserRepository;

/// `POST /auth/login`
///
/// Looks the user up by e-mail and checks the password against the stored
/// hash. Unknown e-mail and wrong password fail the same way.
pub async fn login(
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepository>,
    credentials: Credentials,
) -> KioskResult<Reply> {
    let user = users
        .find_by_email(&credentials.email)
        .await
        .filter(|user| PasswordHasher::verify(&credentials.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::info!("login rejected");
            AuthError::InvalidCredentials
        })?;

    let identity = Identity::new(user.id, user.name, user.email);
    let token = tokens
        .issue(&identity)
        .map_err(|e| KioskError::internal_with_source("failed to issue token", e))?;

    tracing::info!(user = %identity.log_id(), "login succeeded");
    Ok(Reply::ok(json!({ "token": token })))
}
