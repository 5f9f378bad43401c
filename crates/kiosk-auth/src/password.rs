//! Salted password digests.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

const SEPARATOR: char = '$';

/// Hashes and verifies passwords.
///
/// A stored hash has the form `salt$digest`, where `salt` is 32 hex
/// characters from a random UUID and `digest` is the hex SHA-256 of
/// `salt || password`.
///
/// ```
/// use kiosk_auth::PasswordHasher;
///
/// let stored = PasswordHasher::hash("123456");
/// assert!(PasswordHasher::verify("123456", &stored));
/// assert!(!PasswordHasher::verify("654321", &stored));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hashes `password` with a fresh random salt.
    #[must_use]
    pub fn hash(password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        Self::hash_with_salt(password, &salt)
    }

    /// Hashes `password` with the given salt.
    #[must_use]
    pub fn hash_with_salt(password: &str, salt: &str) -> String {
        format!("{salt}{SEPARATOR}{}", digest(salt, password))
    }

    /// Checks `password` against a stored hash.
    ///
    /// Returns `false` for stored values that are not in `salt$digest` form.
    #[must_use]
    pub fn verify(password: &str, stored: &str) -> bool {
        let Some((salt, expected)) = stored.split_once(SEPARATOR) else {
            return false;
        };
        digest(salt, password)
            .as_bytes()
            .ct_eq(expected.as_bytes())
            .into()
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted() {
        let first = PasswordHasher::hash("123456");
        let second = PasswordHasher::hash("123456");

        assert_ne!(first, second);
        assert!(PasswordHasher::verify("123456", &first));
        assert!(PasswordHasher::verify("123456", &second));
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let stored = PasswordHasher::hash("correct horse battery staple");
        assert!(!stored.contains("correct horse"));
    }

    #[test]
    fn test_hash_with_salt_is_deterministic() {
        let stored = PasswordHasher::hash_with_salt("abc", "salt");

        assert_eq!(stored.len(), "salt$".len() + 64);
        assert_eq!(stored, PasswordHasher::hash_with_salt("abc", "salt"));
    }

    #[test]
    fn test_wrong_password_fails() {
        let stored = PasswordHasher::hash("123456");

        assert!(!PasswordHasher::verify("1234567", &stored));
        assert!(!PasswordHasher::verify("", &stored));
    }

    #[test]
    fn test_malformed_stored_value_fails() {
        assert!(!PasswordHasher::verify("123456", "123456"));
        assert!(!PasswordHasher::verify("123456", "salt$short"));
    }

    #[test]
    fn test_digest_differing_in_last_char_fails() {
        let stored = PasswordHasher::hash_with_salt("123456", "salt");
        let mut tampered = stored.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert!(PasswordHasher::verify("123456", &stored));
        assert!(!PasswordHasher::verify("123456", &tampered));
        assert!(!PasswordHasher::verify("123456", &format!("{stored}0")));
    }
}
