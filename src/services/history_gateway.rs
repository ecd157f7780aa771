//! Authenticated history calls.

use reqwest::StatusCode;
use tracing::{debug, warn};

use super::api::{ApiClient, Endpoint};
use super::SessionStore;
use crate::error::ClientError;
use crate::models::{HistoryResponse, NewHistoryEntry};

/// Result of [`HistoryGateway::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The server accepted the entry.
    Saved,
    /// Nothing to save or nobody signed in; no request was made.
    Skipped,
}

/// Lists and appends history entries for the signed-in user.
#[derive(Debug, Clone)]
pub struct HistoryGateway {
    api: ApiClient,
    store: SessionStore,
}

impl HistoryGateway {
    pub fn new(api: ApiClient, store: SessionStore) -> Self {
        Self { api, store }
    }

    /// Fetch the user's history in server order.
    pub async fn list(&self) -> Result<HistoryResponse, ClientError> {
        let token = self
            .store
            .token()
            .ok_or(ClientError::AuthenticationRequired)?;

        debug!("GET {}", Endpoint::History.path());
        let response = self
            .api
            .get(Endpoint::History)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!("History request failed: {}", e);
                ClientError::Fetch(e.to_string())
            })?;

        check_status(response.status(), "Failed to fetch history")?;

        let history: HistoryResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Fetch(format!("invalid response: {}", e)))?;
        debug!("Loaded {} of {} history entries", history.entries.len(), history.total);
        Ok(history)
    }

    /// Save an explanation. Skips without a request when either field is
    /// empty or nobody is signed in.
    pub async fn append(&self, concept: &str, explanation: &str) -> Result<SaveOutcome, ClientError> {
        if concept.is_empty() || explanation.is_empty() {
            return Ok(SaveOutcome::Skipped);
        }
        let Some(token) = self.store.token() else {
            return Ok(SaveOutcome::Skipped);
        };

        debug!("POST {}", Endpoint::History.path());
        let response = self
            .api
            .post(Endpoint::History)
            .bearer_auth(token)
            .json(&NewHistoryEntry {
                concept,
                explanation,
            })
            .send()
            .await
            .map_err(|e| {
                warn!("Save request failed: {}", e);
                ClientError::Fetch(e.to_string())
            })?;

        check_status(response.status(), "Failed to save to history")?;
        Ok(SaveOutcome::Saved)
    }
}

fn check_status(status: StatusCode, context: &str) -> Result<(), ClientError> {
    if status == StatusCode::UNAUTHORIZED {
        warn!("{}: token rejected", context);
        return Err(ClientError::SessionInvalid);
    }
    if !status.is_success() {
        warn!("{}: HTTP {}", context, status.as_u16());
        return Err(ClientError::Fetch(format!("{}: {}", context, status.as_u16())));
    }
    Ok(())
}
