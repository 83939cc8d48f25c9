use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used by the backend for login times and attempts.
pub const BACKEND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Another user's live session, as reported by `list_sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Token {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Log-safe excerpt of the token value.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub login_time: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Token {
    pub fn login_time_parsed(&self) -> Option<NaiveDateTime> {
        self.login_time
            .as_deref()
            .and_then(|t| NaiveDateTime::parse_from_str(t, BACKEND_TIME_FORMAT).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_backend_token() {
        let token: Token = serde_json::from_str(
            r#"{"session_id":"s-1","value":"ab12...","username":"carol",
                "login_time":"2025-03-04 05:06:07","user_id":"u-9"}"#,
        )
        .unwrap();
        assert_eq!(token.session_id.as_deref(), Some("s-1"));
        assert_eq!(token.user_id.as_deref(), Some("u-9"));

        let time = token.login_time_parsed().unwrap();
        assert_eq!(time.year(), 2025);
        assert_eq!(time.hour(), 5);
    }

    #[test]
    fn test_nullable_fields() {
        let token: Token = serde_json::from_str(r#"{"session_id":null,"username":"<user removed>"}"#).unwrap();
        assert_eq!(token.session_id, None);
        assert_eq!(token.login_time_parsed(), None);
    }

    #[test]
    fn test_bad_login_time_is_none() {
        let token = Token {
            session_id: None,
            value: None,
            username: None,
            login_time: Some("yesterday".to_string()),
            user_id: None,
        };
        assert_eq!(token.login_time_parsed(), None);
    }
}
