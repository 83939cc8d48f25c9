use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::token::BACKEND_TIME_FORMAT;

/// A failed-login record from `list_attempts`.
///
/// The backend emits one entry per user without a timestamp, followed by one
/// entry per recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AttemptEntry {
    #[serde(rename = "username", default)]
    pub user: Option<String>,
    #[serde(rename = "timestamp", default)]
    pub time: Option<String>,
}

impl AttemptEntry {
    /// Whether this is the per-user row rather than an individual failure.
    pub fn is_header(&self) -> bool {
        self.time.is_none()
    }

    pub fn time_parsed(&self) -> Option<NaiveDateTime> {
        self.time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, BACKEND_TIME_FORMAT).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attempt_list() {
        let entries: Vec<AttemptEntry> = serde_json::from_str(
            r#"[{"username":"alice","timestamp":null},
                {"username":"alice","timestamp":"2025-01-02 03:04:05"}]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_header());
        assert!(!entries[1].is_header());
        assert!(entries[1].time_parsed().is_some());
        assert_eq!(entries[1].user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_all_fields_optional() {
        let entry: AttemptEntry = serde_json::from_str("{}").unwrap();
        assert_eq!(entry.user, None);
        assert!(entry.is_header());
    }
}
