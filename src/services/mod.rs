//! Backend services.

pub mod api;
pub mod auth_gateway;
pub mod explanation_fetcher;
pub mod history_gateway;
pub mod markdown;
pub mod session_store;
pub mod theme;

pub use api::ApiClient;
pub use auth_gateway::AuthGateway;
pub use explanation_fetcher::{ExplanationFetcher, FetchMode};
pub use history_gateway::{HistoryGateway, SaveOutcome};
pub use session_store::SessionStore;
pub use theme::Theme;
