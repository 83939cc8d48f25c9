use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::error::PortalError;

/// Privilege level granted by a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Developer admin with root command access.
    Root,
    Standard,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::Root => write!(f, "root"),
            Privilege::Standard => write!(f, "standard"),
        }
    }
}

/// The operator's own bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User: {}, Token Value: {}", self.name, self.id)
    }
}

/// Session state for one console run.
///
/// The session is replaced by every login invocation, whatever its outcome;
/// the privilege is only present after a successful one.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<Session>,
    privilege: Option<Privilege>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the session and drop any previously granted privilege.
    pub fn replace_session(&mut self, session: Session) {
        self.session = Some(session);
        self.privilege = None;
    }

    pub fn grant(&mut self, privilege: Privilege) {
        self.privilege = Some(privilege);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn privilege(&self) -> Option<Privilege> {
        self.privilege
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some() && self.privilege.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.privilege == Some(Privilege::Root)
    }

    /// The session, if a login has succeeded.
    pub fn require_session(&self) -> Result<&Session, PortalError> {
        match (&self.session, self.privilege) {
            (Some(session), Some(_)) => Ok(session),
            _ => Err(PortalError::NotAuthenticated),
        }
    }

    /// The session, if a login has succeeded with root privilege.
    pub fn require_root(&self) -> Result<&Session, PortalError> {
        let session = self.require_session()?;
        if self.is_root() {
            Ok(session)
        } else {
            Err(PortalError::RootRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_display() {
        let session = Session::new("abc123", "alice");
        assert_eq!(session.to_string(), "User: alice, Token Value: abc123");
    }

    #[test]
    fn test_session_age_is_small() {
        let session = Session::new("id", "alice");
        assert!(session.age().num_seconds() <= 1);
    }

    #[test]
    fn test_replace_session_clears_privilege() {
        let mut ctx = SessionContext::new();
        ctx.replace_session(Session::new("one", "alice"));
        ctx.grant(Privilege::Root);
        assert!(ctx.is_root());

        ctx.replace_session(Session::new("two", "alice"));
        assert_eq!(ctx.privilege(), None);
        assert_eq!(ctx.session().map(|s| s.id.as_str()), Some("two"));
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_require_session_needs_privilege() {
        let mut ctx = SessionContext::new();
        assert!(matches!(ctx.require_session(), Err(PortalError::NotAuthenticated)));

        ctx.replace_session(Session::new("pending", "alice"));
        assert!(matches!(ctx.require_session(), Err(PortalError::NotAuthenticated)));

        ctx.grant(Privilege::Standard);
        assert_eq!(ctx.require_session().unwrap().id, "pending");
    }

    #[test]
    fn test_require_root() {
        let mut ctx = SessionContext::new();
        ctx.replace_session(Session::new("sid", "bob"));
        ctx.grant(Privilege::Standard);
        assert!(matches!(ctx.require_root(), Err(PortalError::RootRequired)));

        ctx.grant(Privilege::Root);
        assert_eq!(ctx.require_root().unwrap().name, "bob");
    }

    #[test]
    fn test_privilege_display() {
        assert_eq!(Privilege::Root.to_string(), "root");
        assert_eq!(Privilege::Standard.to_string(), "standard");
    }
}
