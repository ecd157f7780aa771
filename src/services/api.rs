//! Shared HTTP client and endpoint table.

use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use std::time::Duration;

use crate::config::ApiConfig;

/// Endpoints consumed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /api/explain`
    Explain,
    /// `GET /api/explain/authenticated` (bearer)
    ExplainAuthenticated,
    /// `GET /api/fallback-explain`
    FallbackExplain,
    /// `POST /api/auth/login`
    Login,
    /// `POST /api/auth/register`
    Register,
    /// `GET` / `POST /api/history` (bearer)
    History,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Explain => "/api/explain",
            Endpoint::ExplainAuthenticated => "/api/explain/authenticated",
            Endpoint::FallbackExplain => "/api/fallback-explain",
            Endpoint::Login => "/api/auth/login",
            Endpoint::Register => "/api/auth/register",
            Endpoint::History => "/api/history",
        }
    }
}

/// Thin wrapper over a pooled reqwest client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(format!("learn-in-five/{}", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for an endpoint.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    pub fn get(&self, endpoint: Endpoint) -> RequestBuilder {
        self.http.get(self.url(endpoint))
    }

    pub fn post(&self, endpoint: Endpoint) -> RequestBuilder {
        self.http.post(self.url(endpoint))
    }
}
