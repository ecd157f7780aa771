//! Auth endpoint bodies.

use serde::{Deserialize, Serialize};

use super::User;

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login/registration response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub user: User,
}

/// Error body. `detail` is a string for auth failures but may be a
/// validation array, so it is kept as raw JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// The `detail` text, if it is a non-empty string.
    pub fn message(&self) -> Option<&str> {
        self.detail.as_str().filter(|s| !s.trim().is_empty())
    }
}
