use serde::{Deserialize, Serialize};

/// A backend account as reported by `list_users`.
///
/// Read-only snapshot. `is_admin` and `two_fa_enabled` are derived from the
/// stored flags and cannot be set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "preferred_contact_method", default)]
    pub preferred_contact: Option<String>,
    #[serde(rename = "admin", default)]
    pub app_admin: bool,
    #[serde(rename = "dev_admin", default)]
    pub dev_admin: bool,
    #[serde(rename = "frozen", default)]
    pub disabled: bool,
    #[serde(rename = "vault_len", default)]
    pub vault_size: u64,
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(rename = "root_auth", default)]
    root_auth_raw: bool,
    #[serde(rename = "2fa_enabled", default)]
    two_fa_enabled_raw: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.app_admin || self.dev_admin
    }

    /// Root access always implies a second factor.
    pub fn two_fa_enabled(&self) -> bool {
        self.two_fa_enabled_raw || self.root_auth_raw
    }

    pub fn root_auth(&self) -> bool {
        self.root_auth_raw
    }

    pub fn full_name(&self) -> String {
        let first = self.first_name.as_deref().unwrap_or("");
        let last = self.last_name.as_deref().unwrap_or("");
        format!("{} {}", first, last).trim().to_string()
    }

    /// Display name, falling back to the username when no name is stored.
    pub fn display_name(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> User {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_backend_field_names() {
        let user = parse(
            r#"{"id":"u1","username":"alice","first_name":"Alice","last_name":"Smith",
                "email":"a@example.com","phone":null,"preferred_contact_method":"email",
                "admin":true,"dev_admin":false,"2fa_enabled":false,"root_auth":false,
                "vault_len":2048,"frozen":true,"failed_attempts":3}"#,
        );
        assert_eq!(user.id, "u1");
        assert_eq!(user.preferred_contact.as_deref(), Some("email"));
        assert_eq!(user.phone, None);
        assert!(user.app_admin);
        assert!(user.disabled);
        assert_eq!(user.vault_size, 2048);
        assert_eq!(user.failed_attempts, 3);
    }

    #[test]
    fn test_is_admin_from_either_flag() {
        assert!(parse(r#"{"admin":true}"#).is_admin());
        assert!(parse(r#"{"dev_admin":true}"#).is_admin());
        assert!(!parse(r#"{"admin":false,"dev_admin":false}"#).is_admin());
    }

    #[test]
    fn test_root_auth_implies_two_fa() {
        assert!(parse(r#"{"root_auth":true,"2fa_enabled":false}"#).two_fa_enabled());
        assert!(parse(r#"{"2fa_enabled":true}"#).two_fa_enabled());
        assert!(!parse(r#"{}"#).two_fa_enabled());
    }

    #[test]
    fn test_missing_fields_default() {
        let user = parse(r#"{"id":"u2","username":"bob"}"#);
        assert!(!user.is_admin());
        assert!(!user.disabled);
        assert_eq!(user.failed_attempts, 0);
        assert_eq!(user.display_name(), "bob");
    }

    #[test]
    fn test_full_name_handles_missing_parts() {
        assert_eq!(parse(r#"{"first_name":"Alice"}"#).full_name(), "Alice");
        assert_eq!(parse(r#"{"first_name":"Alice","last_name":"Smith"}"#).full_name(), "Alice Smith");
        assert_eq!(parse(r#"{"last_name":"Smith"}"#).full_name(), "Smith");
    }
}
