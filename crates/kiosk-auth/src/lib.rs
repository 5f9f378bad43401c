//! # Kiosk Auth
//!
//! Stateless bearer tokens and credential hashing.
//!
//! - [`TokenService`] issues HS256-signed tokens carrying an [`Identity`] and
//!   verifies them, distinguishing malformed from expired tokens.
//! - [`PasswordHasher`] stores passwords as salted SHA-256 digests.
//!
//! [`Identity`]: kiosk_core::Identity

#![doc(html_root_url = "https://docs.rs/kiosk-auth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod password;
mod token;

pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenService, VerificationError, TOKEN_TTL_SECS};
