//! Signed, time-limited bearer tokens.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use kiosk_core::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifetime of an issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Payload embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a decimal string.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds), always `iat + TOKEN_TTL_SECS`.
    pub exp: i64,
}

impl Claims {
    fn for_identity(identity: &Identity, issued_at: DateTime<Utc>) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: identity.id.to_string(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        }
    }

    fn into_identity(self) -> Result<Identity, VerificationError> {
        let id = self
            .sub
            .parse()
            .map_err(|_| VerificationError::Malformed)?;
        Ok(Identity::new(id, self.name, self.email))
    }
}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Not a parseable token, or the signature does not match.
    #[error("token is malformed or its signature is invalid")]
    Malformed,

    /// The token is past its expiry.
    #[error("token has expired")]
    Expired,
}

/// Token issuing failures.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The claims could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies HS256 bearer tokens with a shared secret.
///
/// # Example
///
/// ```
/// use kiosk_auth::TokenService;
/// use kiosk_core::Identity;
///
/// let tokens = TokenService::new("an-example-secret-of-at-least-32-bytes");
/// let identity = Identity::new(1, "Joaquin Tripp", "joaquintripp@example.com");
///
/// let token = tokens.issue(&identity).unwrap();
/// assert_eq!(tokens.verify(&token).unwrap(), identity);
/// ```
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Creates a token service signing with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issues a token for `identity`, valid for one hour from now.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a token for `identity` as if issued at `issued_at`.
    pub fn issue_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::for_identity(identity, issued_at);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        tracing::debug!(user = %identity.log_id(), exp = claims.exp, "issued token");
        Ok(token)
    }

    /// Verifies signature and expiry and returns the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Identity, VerificationError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => VerificationError::Expired,
                _ => VerificationError::Malformed,
            };
            tracing::debug!(error = %e, ?reason, "token verification failed");
            reason
        })?;
        data.claims.into_identity()
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &"HS256")
            .field("ttl_secs", &TOKEN_TTL_SECS)
            .finish_non_exhaustive()
    }
}
