//! Login and registration calls.

use reqwest::Response;
use serde::Serialize;
use tracing::{debug, warn};

use super::api::{ApiClient, Endpoint};
use crate::error::{ClientError, GENERIC_AUTH_FAILURE};
use crate::models::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest};

/// Performs single-shot auth calls. Does not touch the session store;
/// callers hand the returned token and user to
/// [`SessionStore::login`](super::SessionStore::login).
#[derive(Debug, Clone)]
pub struct AuthGateway {
    api: ApiClient,
}

impl AuthGateway {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        require_filled(&[email, password])?;
        self.submit(Endpoint::Login, &LoginRequest { email, password }).await
    }

    /// Create an account.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        require_filled(&[username, email, password])?;
        self.submit(
            Endpoint::Register,
            &RegisterRequest {
                username,
                email,
                password,
            },
        )
        .await
    }

    async fn submit<B: Serialize>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<AuthResponse, ClientError> {
        debug!("POST {}", endpoint.path());
        let response = self
            .api
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Auth request failed: {}", e);
                generic_failure()
            })?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let auth: AuthResponse = response.json().await.map_err(|e| {
            warn!("Malformed auth response: {}", e);
            generic_failure()
        })?;
        debug!("Received {} token", auth.token_type);
        Ok(auth)
    }
}

fn require_filled(fields: &[&str]) -> Result<(), ClientError> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ClientError::Authentication(
            "Please fill in all fields".to_string(),
        ));
    }
    Ok(())
}

fn generic_failure() -> ClientError {
    ClientError::Authentication(GENERIC_AUTH_FAILURE.to_string())
}

/// Turn a non-2xx auth response into an error carrying the server's reason.
async fn rejection(response: Response) -> ClientError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message().map(str::to_string));
    warn!("Auth rejected with HTTP {}", status.as_u16());
    match message {
        Some(msg) => ClientError::Authentication(msg),
        None => generic_failure(),
    }
}
