//! Explanation fetcher - picks an explain endpoint and falls back once on
//! server errors.
//!
//! Two modes:
//!
//! - [`FetchMode::Primary`]: `/api/explain/authenticated` when a token is
//!   held, otherwise `/api/explain`.
//! - [`FetchMode::Fallback`]: `/api/fallback-explain`, no auth.
//!
//! `Primary -> Fallback` happens when a primary request answers with a 5xx;
//! that response is dropped and the fallback endpoint is asked instead.
//! The fallback mode is sticky until [`ExplanationFetcher::retry_main`].

use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::api::{ApiClient, Endpoint};
use super::SessionStore;
use crate::error::ClientError;
use crate::models::ConceptExplanation;

/// Which family of endpoints the fetcher is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Primary,
    Fallback,
}

/// Outcome of a single HTTP attempt, before it is mapped to [`ClientError`].
#[derive(Debug)]
enum AttemptError {
    ServerError(StatusCode),
    Unauthorized { sent_token: bool },
    Status(StatusCode),
    Transport(String),
    Decode(String),
}

impl From<AttemptError> for ClientError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Unauthorized { sent_token: true } => ClientError::SessionInvalid,
            AttemptError::Unauthorized { sent_token: false } => {
                ClientError::Fetch("HTTP 401".to_string())
            }
            AttemptError::ServerError(status) | AttemptError::Status(status) => {
                ClientError::Fetch(format!("HTTP {}", status.as_u16()))
            }
            AttemptError::Transport(msg) => ClientError::Fetch(msg),
            AttemptError::Decode(msg) => ClientError::Fetch(format!("invalid response: {}", msg)),
        }
    }
}

/// Fetches concept explanations. Clones share the fallback flag.
#[derive(Debug, Clone)]
pub struct ExplanationFetcher {
    api: ApiClient,
    store: SessionStore,
    fallback_active: Arc<AtomicBool>,
}

impl ExplanationFetcher {
    pub fn new(api: ApiClient, store: SessionStore) -> Self {
        Self {
            api,
            store,
            fallback_active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mode(&self) -> FetchMode {
        if self.fallback_active.load(Ordering::SeqCst) {
            FetchMode::Fallback
        } else {
            FetchMode::Primary
        }
    }

    /// Endpoint (and token to send) for the current mode and session.
    fn select(&self) -> (Endpoint, Option<String>) {
        match self.mode() {
            FetchMode::Fallback => (Endpoint::FallbackExplain, None),
            FetchMode::Primary => match self.store.token() {
                Some(token) => (Endpoint::ExplainAuthenticated, Some(token)),
                None => (Endpoint::Explain, None),
            },
        }
    }

    /// Fetch an explanation from the endpoint the current state selects.
    pub async fn fetch(&self) -> Result<ConceptExplanation, ClientError> {
        let (endpoint, token) = self.select();

        match self.attempt(endpoint, token.as_deref()).await {
            Err(AttemptError::ServerError(status)) if endpoint != Endpoint::FallbackExplain => {
                if !self.fallback_active.swap(true, Ordering::SeqCst) {
                    info!(
                        "{} returned HTTP {}, switching to fallback explanations",
                        endpoint.path(),
                        status.as_u16()
                    );
                }
                self.attempt(Endpoint::FallbackExplain, None)
                    .await
                    .map_err(ClientError::from)
            }
            result => result.map_err(ClientError::from),
        }
    }

    /// Leave fallback mode and fetch from the primary endpoint again.
    pub async fn retry_main(&self) -> Result<ConceptExplanation, ClientError> {
        self.reset();
        self.fetch().await
    }

    /// Return to primary mode without fetching.
    pub fn reset(&self) {
        if self.fallback_active.swap(false, Ordering::SeqCst) {
            info!("Leaving fallback mode");
        }
    }

    async fn attempt(
        &self,
        endpoint: Endpoint,
        token: Option<&str>,
    ) -> Result<ConceptExplanation, AttemptError> {
        debug!("GET {}", endpoint.path());
        let mut request = self.api.get(endpoint);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", endpoint.path(), e);
            AttemptError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_server_error() {
            warn!("{} returned HTTP {}", endpoint.path(), status.as_u16());
            return Err(AttemptError::ServerError(status));
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("{} rejected credentials", endpoint.path());
            return Err(AttemptError::Unauthorized {
                sent_token: token.is_some(),
            });
        }
        if !status.is_success() {
            warn!("{} returned HTTP {}", endpoint.path(), status.as_u16());
            return Err(AttemptError::Status(status));
        }

        response
            .json::<ConceptExplanation>()
            .await
            .map_err(|e| AttemptError::Decode(e.to_string()))
    }
}
