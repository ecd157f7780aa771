//! Client-held session.

use serde::{Deserialize, Serialize};

use super::User;

/// Bearer token paired with the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub user: User,
}

/// Current authentication state. Either anonymous or holding both a token
/// and a user; never one without the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credentials: Option<Credentials>,
}

impl Session {
    /// An anonymous session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated session.
    pub fn authenticated(token: String, user: User) -> Self {
        Self {
            credentials: Some(Credentials { token, user }),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.credentials.as_ref().map(|c| &c.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}
