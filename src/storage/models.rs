// Storage models: rows that flow through the rest of the crate without
// depending on rusqlite.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One suppression decision. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub text: String,
    pub url: String,
    /// RFC 3339 UTC, millisecond precision.
    pub timestamp: String,
}

impl AuditEntry {
    /// Stamp an entry with the current time.
    pub fn now(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_is_rfc3339_utc() {
        let entry = AuditEntry::now("text", "https://example.com/");
        assert!(entry.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }
}
