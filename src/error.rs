//! Client error taxonomy.

use thiserror::Error;

/// Generic text shown when the server gives no usable reason.
pub const GENERIC_AUTH_FAILURE: &str = "Authentication failed";

/// Errors surfaced by the API gateways.
///
/// Every variant is recoverable: the UI shows a short message and offers
/// a manual retry, or redirects to the login view.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Login or registration failed. Carries the server's `detail` text
    /// when it sent one.
    #[error("{0}")]
    Authentication(String),

    /// An explanation, history list or save request failed.
    #[error("{0}")]
    Fetch(String),

    /// An authenticated action was attempted without a session.
    #[error("sign in required")]
    AuthenticationRequired,

    /// The server rejected the bearer token (HTTP 401).
    #[error("session expired")]
    SessionInvalid,
}

impl ClientError {
    /// One-line message for the UI error slot.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Authentication(msg) => msg.clone(),
            ClientError::Fetch(_) => "Something went wrong. Please try again later.".to_string(),
            ClientError::AuthenticationRequired => "Please sign in to continue.".to_string(),
            ClientError::SessionInvalid => {
                "Your session has expired. Please sign in again.".to_string()
            }
        }
    }

    /// Whether the caller should drop the session and send the user to login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ClientError::SessionInvalid | ClientError::AuthenticationRequired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_passes_through() {
        let err = ClientError::Authentication("Email already registered".to_string());
        assert_eq!(err.user_message(), "Email already registered");
    }

    #[test]
    fn test_requires_login() {
        assert!(ClientError::SessionInvalid.requires_login());
        assert!(ClientError::AuthenticationRequired.requires_login());
        assert!(!ClientError::Fetch("HTTP 500".to_string()).requires_login());
        assert!(!ClientError::Authentication("nope".to_string()).requires_login());
    }
}
