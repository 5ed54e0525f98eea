use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::{self, TokenStatus};

/// Profile of the signed-in user as returned by `login`/`signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A credential together with the user it belongs to.
///
/// There is no way to build a session with only one half populated, and no
/// setters: a session is replaced as a whole through the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    credential: String,
    user: UserProfile,
}

impl Session {
    pub fn new(credential: impl Into<String>, user: UserProfile) -> Self {
        Self {
            credential: credential.into(),
            user,
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn status(&self) -> TokenStatus {
        token::validate(&self.credential)
    }

    pub fn is_expired(&self) -> bool {
        self.status().is_expired()
    }

    /// Expiry time claimed by the credential, if it can be read
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        token::expires_at(&self.credential)
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.expires_at()
            .map(|at| (at - Utc::now()).num_minutes().max(0))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::{token_expiring_at, token_with_payload};
    use chrono::Duration;

    fn ada() -> UserProfile {
        UserProfile {
            id: "65f1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[test]
    fn test_minutes_until_expiry() {
        let session = Session::new(token_expiring_at(Utc::now() + Duration::minutes(90)), ada());
        let minutes = session.minutes_until_expiry();
        assert!((88..=90).contains(&minutes), "got {minutes}");
        assert!(!session.is_expired());
    }

    #[test]
    fn test_expired_session_has_no_minutes_left() {
        let at = Utc::now() - Duration::minutes(5);
        let session = Session::new(token_expiring_at(at), ada());
        assert_eq!(session.minutes_until_expiry(), 0);
        assert_eq!(session.expires_at().map(|t| t.timestamp()), Some(at.timestamp()));
        assert!(session.is_expired());
    }

    #[test]
    fn test_unreadable_credential_has_no_expiry() {
        let session = Session::new(token_with_payload("not json"), ada());
        assert_eq!(session.expires_at(), None);
        assert_eq!(session.minutes_until_expiry(), 0);
        assert!(session.is_expired());
    }
}
