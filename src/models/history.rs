//! Saved explanation history.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OpaqueId;

/// One saved explanation. Owned by the server; read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub id: OpaqueId,
    pub concept: String,
    pub explanation: String,
    /// Server timestamp, kept verbatim
    pub created_at: String,
    pub user_id: OpaqueId,
}

impl HistoryEntry {
    /// Parse `created_at`. Accepts RFC 3339 and naive ISO-8601 (assumed UTC).
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Format `created_at` in local time, or return it verbatim if unparsable.
    pub fn created_at_display(&self, format: &str) -> String {
        match self.created_at_utc() {
            Some(dt) => dt.with_timezone(&Local).format(format).to_string(),
            None => self.created_at.clone(),
        }
    }
}

/// Response body of `GET /api/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
    pub total: u64,
}

/// Request body of `POST /api/history`.
#[derive(Debug, Clone, Serialize)]
pub struct NewHistoryEntry<'a> {
    pub concept: &'a str,
    pub explanation: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(created_at: &str) -> HistoryEntry {
        HistoryEntry {
            id: OpaqueId::new("1"),
            concept: "Recursion".to_string(),
            explanation: "A function calling itself.".to_string(),
            created_at: created_at.to_string(),
            user_id: OpaqueId::new("u1"),
        }
    }

    #[test]
    fn test_parse_rfc3339() {
        let parsed = entry("2025-03-01T10:15:00Z").created_at_utc().unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T10:15:00+00:00");
    }

    #[test]
    fn test_parse_naive_with_fraction() {
        let parsed = entry("2025-03-01T10:15:00.123456").created_at_utc().unwrap();
        assert_eq!(parsed.format("%Y-%m-%d %H:%M").to_string(), "2025-03-01 10:15");
    }

    #[test]
    fn test_unparsable_shown_verbatim() {
        assert_eq!(entry("yesterday").created_at_display("%Y"), "yesterday");
    }

    #[test]
    fn test_response_keeps_server_order() {
        let body = serde_json::json!({
            "entries": [
                {"id": "b", "concept": "Queues", "explanation": "x", "created_at": "2025-01-02T00:00:00Z", "user_id": "u"},
                {"id": "a", "concept": "Stacks", "explanation": "y", "created_at": "2025-01-01T00:00:00Z", "user_id": "u"}
            ],
            "total": 2
        });
        let response: HistoryResponse = serde_json::from_value(body).unwrap();
        let concepts: Vec<_> = response.entries.iter().map(|e| e.concept.as_str()).collect();
        assert_eq!(concepts, vec!["Queues", "Stacks"]);
        assert_eq!(response.total, 2);
    }
}
