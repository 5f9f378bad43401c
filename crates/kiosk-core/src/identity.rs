//! The authenticated caller.

use serde::{Deserialize, Serialize};

/// A user identity decoded from a verified bearer token.
///
/// Lives for one request only. It is attached to the [`RequestContext`] by the
/// authentication gate and never persisted.
///
/// [`RequestContext`]: crate::RequestContext
///
/// # Example
///
/// ```
/// use kiosk_core::Identity;
///
/// let identity = Identity::new(1, "Joaquin Tripp", "joaquintripp@example.com");
/// assert_eq!(identity.log_id(), "user:1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// E-mail address.
    pub email: String,
}

impl Identity {
    /// Creates a new identity.
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Contains the user id only, never the name or e-mail.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_id_omits_personal_data() {
        let identity = Identity::new(7, "Ada", "ada@example.com");
        let log_id = identity.log_id();

        assert_eq!(log_id, "user:7");
        assert!(!log_id.contains("ada"));
    }

    #[test]
    fn test_serde() {
        let identity = Identity::new(7, "Ada", "ada@example.com");
        let json = serde_json::to_value(&identity).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(serde_json::from_value::<Identity>(json).unwrap(), identity);
    }
}
