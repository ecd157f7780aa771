//! Wire and domain types for the LearnInFive API.

pub mod auth;
pub mod explanation;
pub mod history;
pub mod session;
pub mod user;

pub use auth::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest};
pub use explanation::ConceptExplanation;
pub use history::{HistoryEntry, HistoryResponse, NewHistoryEntry};
pub use session::Session;
pub use user::{OpaqueId, User};
