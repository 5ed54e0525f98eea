use serde::{Deserialize, Serialize};

use crate::auth::{Session, UserProfile};

/// `login`/`signup` mutation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPayload {
    pub user: UserProfile,
    #[serde(rename = "authToken")]
    pub auth_token: String,
}

impl AuthPayload {
    pub fn into_session(self) -> Session {
        Session::new(self.auth_token, self.user)
    }
}
