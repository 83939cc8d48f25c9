use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::auth::Session;
use crate::command::{interpret, CommandId, Outcome, PrivilegedCommandClient};
use crate::error::PortalError;

/// Per-user actions understood by `user_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminAction {
    Freeze,
    Unfreeze,
    PromoteAppAdmin,
    DemoteAppAdmin,
    PromoteDevAdmin,
    DemoteDevAdmin,
    GrantRootAuth,
    RevokeRootAuth,
    ClearAttempts,
}

impl AdminAction {
    pub const ALL: [AdminAction; 9] = [
        AdminAction::Freeze,
        AdminAction::Unfreeze,
        AdminAction::PromoteAppAdmin,
        AdminAction::DemoteAppAdmin,
        AdminAction::PromoteDevAdmin,
        AdminAction::DemoteDevAdmin,
        AdminAction::GrantRootAuth,
        AdminAction::RevokeRootAuth,
        AdminAction::ClearAttempts,
    ];

    /// Wire name passed to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Freeze => "freeze",
            AdminAction::Unfreeze => "unfreeze",
            AdminAction::PromoteAppAdmin => "promote_app_admin",
            AdminAction::DemoteAppAdmin => "demote_app_admin",
            AdminAction::PromoteDevAdmin => "promote_dev_admin",
            AdminAction::DemoteDevAdmin => "demote_dev_admin",
            AdminAction::GrantRootAuth => "grant_root_auth",
            AdminAction::RevokeRootAuth => "revoke_root_auth",
            AdminAction::ClearAttempts => "clear_attempts",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AdminAction::Freeze => "Freeze account",
            AdminAction::Unfreeze => "Unfreeze account",
            AdminAction::PromoteAppAdmin => "Grant app admin",
            AdminAction::DemoteAppAdmin => "Revoke app admin",
            AdminAction::PromoteDevAdmin => "Grant developer admin",
            AdminAction::DemoteDevAdmin => "Revoke developer admin",
            AdminAction::GrantRootAuth => "Grant root access",
            AdminAction::RevokeRootAuth => "Revoke root access",
            AdminAction::ClearAttempts => "Clear failed attempts",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_lowercase();
        AdminAction::ALL
            .into_iter()
            .find(|action| action.as_str() == wanted)
            .ok_or_else(|| format!("Unknown action: {}", s.trim()))
    }
}

/// Account to create through `createuser`.
///
/// Unset optional fields keep the backend's template defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dev_admin: bool,
    pub root_auth: bool,
    pub app_admin: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Key/value override pairs appended after the credentials.
    fn overrides(&self) -> Vec<String> {
        let mut args = Vec::new();
        let text_fields = [("first_name", &self.first_name), ("last_name", &self.last_name)];
        for (key, value) in text_fields {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                args.push(key.to_string());
                args.push(value.to_string());
            }
        }
        let flags = [("dev_admin", self.dev_admin), ("root_auth", self.root_auth), ("admin", self.app_admin)];
        for (key, set) in flags {
            if set {
                args.push(key.to_string());
                args.push("true".to_string());
            }
        }
        args
    }
}

/// Issues admin commands on behalf of the operator's session.
pub struct AdminDispatcher<C> {
    client: C,
}

impl<C: PrivilegedCommandClient> AdminDispatcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Apply `action` to the user with id `target_user_id`.
    pub fn execute(&self, session: &Session, action: AdminAction, target_user_id: &str) -> Result<(), PortalError> {
        let args = [session.id.clone(), action.as_str().to_string(), target_user_id.to_string()];
        self.run(CommandId::UserAction, &args, "Command failed")?;
        info!(%action, "User action applied");
        Ok(())
    }

    /// Revoke every session of the user `target` (a user id).
    pub fn logout_session(&self, session: &Session, target: &str) -> Result<(), PortalError> {
        let args = [session.id.clone(), target.to_string()];
        self.run(CommandId::Logout, &args, "Error logging out sessions")
    }

    /// Revoke all sessions, including the operator's own.
    pub fn logout_all(&self, session: &Session) -> Result<(), PortalError> {
        self.run(CommandId::LogoutAll, &[session.id.clone()], "Error logging out sessions")
    }

    /// Revoke the operator's own sessions.
    pub fn logout_self(&self, session: &Session) -> Result<(), PortalError> {
        self.run(CommandId::LogoutAdmin, &[session.id.clone()], "Error logging out")
    }

    pub fn clear_all_attempts(&self, session: &Session) -> Result<(), PortalError> {
        self.run(
            CommandId::ClearAllAttempts,
            &[session.id.clone()],
            "Error while clearing attempts",
        )
    }

    pub fn create_user(&self, session: &Session, user: &NewUser) -> Result<(), PortalError> {
        if user.username.trim().is_empty() || user.password.trim().is_empty() {
            return Err(PortalError::MissingCredentials);
        }
        let mut args = vec![session.id.clone(), user.username.trim().to_string(), user.password.clone()];
        args.extend(user.overrides());
        self.run(CommandId::CreateUser, &args, "Failed to create user")?;
        info!(username = %user.username.trim(), "User created");
        Ok(())
    }

    fn run(&self, command: CommandId, args: &[String], fallback: &str) -> Result<(), PortalError> {
        let output = self.client.invoke(command, args)?;
        match interpret(command, output.exit_code) {
            Outcome::Succeeded => Ok(()),
            _ => {
                warn!(%command, exit_code = output.exit_code, "Backend command failed");
                Err(PortalError::from_output(&output, fallback))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedClient;

    fn session() -> Session {
        Session::new("sid-1", "root")
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_action_wire_names_round_trip() {
        for action in AdminAction::ALL {
            assert_eq!(action.as_str().parse::<AdminAction>(), Ok(action));
        }
        assert_eq!("Promote-App-Admin".parse::<AdminAction>(), Ok(AdminAction::PromoteAppAdmin));
        assert!("delete".parse::<AdminAction>().is_err());
    }

    #[test]
    fn test_execute_args_layout() {
        let client = ScriptedClient::new();
        client.respond(0, "", "");
        let dispatcher = AdminDispatcher::new(&client);

        dispatcher.execute(&session(), AdminAction::GrantRootAuth, "u42").unwrap();
        assert_eq!(
            client.last_call(),
            Some((CommandId::UserAction, strings(&["sid-1", "grant_root_auth", "u42"])))
        );
    }

    #[test]
    fn test_execute_success_iff_exit_zero_for_every_action() {
        for action in AdminAction::ALL {
            let client = ScriptedClient::new();
            client
                .respond(0, "AVAILABLE USERS:\nalice u1\n", "")
                .respond(1, "", "Invalid user ID\n");
            let dispatcher = AdminDispatcher::new(&client);

            assert!(dispatcher.execute(&session(), action, "u1").is_ok(), "{action}");
            let err = dispatcher.execute(&session(), action, "missing").unwrap_err();
            assert_eq!(err.to_string(), "Invalid user ID\n", "{action}");
        }
    }

    #[test]
    fn test_stdout_does_not_affect_result() {
        let client = ScriptedClient::new();
        client.respond(2, "everything went fine", "");
        let dispatcher = AdminDispatcher::new(&client);
        let err = dispatcher.execute(&session(), AdminAction::Freeze, "u1").unwrap_err();
        assert!(matches!(err, PortalError::BackendFailure(ref msg) if msg == "Command failed"));
    }

    #[test]
    fn test_singleton_commands() {
        let client = ScriptedClient::new();
        for _ in 0..4 {
            client.respond(0, "", "");
        }
        let dispatcher = AdminDispatcher::new(&client);
        let s = session();

        dispatcher.logout_session(&s, "u9").unwrap();
        dispatcher.logout_all(&s).unwrap();
        dispatcher.logout_self(&s).unwrap();
        dispatcher.clear_all_attempts(&s).unwrap();

        let calls = client.calls();
        assert_eq!(calls[0], (CommandId::Logout, strings(&["sid-1", "u9"])));
        assert_eq!(calls[1], (CommandId::LogoutAll, strings(&["sid-1"])));
        assert_eq!(calls[2], (CommandId::LogoutAdmin, strings(&["sid-1"])));
        assert_eq!(calls[3], (CommandId::ClearAllAttempts, strings(&["sid-1"])));
    }

    #[test]
    fn test_singleton_failure_messages() {
        let client = ScriptedClient::new();
        client.respond(1, "", "No active sessions\n").respond(1, "", "");
        let dispatcher = AdminDispatcher::new(&client);

        let err = dispatcher.logout_all(&session()).unwrap_err();
        assert_eq!(err.to_string(), "No active sessions\n");
        let err = dispatcher.clear_all_attempts(&session()).unwrap_err();
        assert_eq!(err.to_string(), "Error while clearing attempts");
    }

    #[test]
    fn test_create_user_minimal() {
        let client = ScriptedClient::new();
        client.respond(0, "{'id': ...}", "");
        let dispatcher = AdminDispatcher::new(&client);

        dispatcher.create_user(&session(), &NewUser::new(" dave ", "pw")).unwrap();
        assert_eq!(
            client.last_call(),
            Some((CommandId::CreateUser, strings(&["sid-1", "dave", "pw"])))
        );
    }

    #[test]
    fn test_create_user_with_overrides() {
        let client = ScriptedClient::new();
        client.respond(0, "", "");
        let dispatcher = AdminDispatcher::new(&client);
        let user = NewUser {
            first_name: Some(" Dave ".to_string()),
            last_name: Some("   ".to_string()),
            dev_admin: true,
            app_admin: true,
            ..NewUser::new("dave", "pw")
        };

        dispatcher.create_user(&session(), &user).unwrap();
        assert_eq!(
            client.last_call().unwrap().1,
            strings(&["sid-1", "dave", "pw", "first_name", "Dave", "dev_admin", "true", "admin", "true"])
        );
    }

    #[test]
    fn test_create_user_requires_credentials() {
        let client = ScriptedClient::new();
        let dispatcher = AdminDispatcher::new(&client);
        let result = dispatcher.create_user(&session(), &NewUser::new("dave", " "));
        assert!(matches!(result, Err(PortalError::MissingCredentials)));
        assert!(client.calls().is_empty());
    }
}
