//! Concept explanation payload.

use serde::{Deserialize, Serialize};

/// A concept and its markdown explanation, as returned by every explain
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub concept: String,
    pub explanation: String,
}
