//! Command identifiers and the declarative exit-code contract.
//!
//! Every backend command answers with a process exit code. Instead of
//! branching on raw integers at each call site, each `CommandId` owns an
//! `ExitCodeTable` that maps codes to an `Outcome`. The tables are plain
//! data, so the whole contract can be enumerated and tested on its own.

use std::fmt;

use crate::auth::Privilege;

/// Identifier of a backend command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Authenticate,
    UserAction,
    Logout,
    LogoutAll,
    LogoutAdmin,
    ClearAllAttempts,
    CreateUser,
    ListUsers,
    ListAttempts,
    ListSessions,
}

impl CommandId {
    pub const ALL: [CommandId; 10] = [
        CommandId::Authenticate,
        CommandId::UserAction,
        CommandId::Logout,
        CommandId::LogoutAll,
        CommandId::LogoutAdmin,
        CommandId::ClearAllAttempts,
        CommandId::CreateUser,
        CommandId::ListUsers,
        CommandId::ListAttempts,
        CommandId::ListSessions,
    ];

    /// Protocol name of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::Authenticate => "authenticate",
            CommandId::UserAction => "user_action",
            CommandId::Logout => "logout",
            CommandId::LogoutAll => "logoutall",
            CommandId::LogoutAdmin => "logoutadmin",
            CommandId::ClearAllAttempts => "clearallattempts",
            CommandId::CreateUser => "createuser",
            CommandId::ListUsers => "list_users",
            CommandId::ListAttempts => "list_attempts",
            CommandId::ListSessions => "list_sessions",
        }
    }

    /// File name of the backend script implementing the command.
    pub fn script_name(&self) -> &'static str {
        match self {
            CommandId::Authenticate => "adminlogin.py",
            CommandId::UserAction => "useraction.py",
            CommandId::Logout => "logout.py",
            CommandId::LogoutAll => "logoutall.py",
            CommandId::LogoutAdmin => "logoutadmin.py",
            CommandId::ClearAllAttempts => "clearallattempts.py",
            CommandId::CreateUser => "createuser.py",
            CommandId::ListUsers => "listusers.py",
            CommandId::ListAttempts => "listattempts.py",
            CommandId::ListSessions => "listsessions.py",
        }
    }

    pub fn exit_codes(&self) -> &'static ExitCodeTable {
        match self {
            CommandId::Authenticate => &AUTHENTICATE,
            _ => &ZERO_IS_SUCCESS,
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the backend refused a login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    InvalidCredentials,
    InvalidOtp,
    /// The backend's own time-windowed lock, distinct from the client lockout.
    AccountLocked,
    AccountFrozen,
    Unrecognized,
}

impl DenialReason {
    pub fn description(&self) -> &'static str {
        match self {
            DenialReason::InvalidCredentials => "invalid credentials",
            DenialReason::InvalidOtp => "invalid one-time code",
            DenialReason::AccountLocked => "account temporarily locked",
            DenialReason::AccountFrozen => "account disabled",
            DenialReason::Unrecognized => "authentication failed",
        }
    }
}

/// Meaning of an exit code for a given command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Granted(Privilege),
    OtpRequired,
    EnrollmentRequired,
    Denied(DenialReason),
    Succeeded,
    Failed,
}

/// Exit code → outcome mapping with a fallback for unlisted codes.
#[derive(Debug)]
pub struct ExitCodeTable {
    entries: &'static [(i32, Outcome)],
    fallback: Outcome,
}

impl ExitCodeTable {
    pub fn interpret(&self, exit_code: i32) -> Outcome {
        self.entries
            .iter()
            .find(|(code, _)| *code == exit_code)
            .map(|(_, outcome)| *outcome)
            .unwrap_or(self.fallback)
    }

    pub fn entries(&self) -> &'static [(i32, Outcome)] {
        self.entries
    }

    pub fn fallback(&self) -> Outcome {
        self.fallback
    }
}

static AUTHENTICATE: ExitCodeTable = ExitCodeTable {
    entries: &[
        (0, Outcome::Granted(Privilege::Root)),
        (1, Outcome::Granted(Privilege::Standard)),
        (2, Outcome::Denied(DenialReason::InvalidCredentials)),
        (3, Outcome::OtpRequired),
        (4, Outcome::Denied(DenialReason::InvalidOtp)),
        (5, Outcome::EnrollmentRequired),
        (6, Outcome::Denied(DenialReason::AccountLocked)),
        (7, Outcome::Denied(DenialReason::AccountFrozen)),
    ],
    fallback: Outcome::Denied(DenialReason::Unrecognized),
};

static ZERO_IS_SUCCESS: ExitCodeTable = ExitCodeTable {
    entries: &[(0, Outcome::Succeeded)],
    fallback: Outcome::Failed,
};

/// Look up the outcome of `exit_code` for `command`.
pub fn interpret(command: CommandId, exit_code: i32) -> Outcome {
    command.exit_codes().interpret(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_success_codes() {
        assert_eq!(interpret(CommandId::Authenticate, 0), Outcome::Granted(Privilege::Root));
        assert_eq!(interpret(CommandId::Authenticate, 1), Outcome::Granted(Privilege::Standard));
    }

    #[test]
    fn test_authenticate_second_factor_codes() {
        assert_eq!(interpret(CommandId::Authenticate, 3), Outcome::OtpRequired);
        assert_eq!(interpret(CommandId::Authenticate, 5), Outcome::EnrollmentRequired);
    }

    #[test]
    fn test_authenticate_unknown_codes_are_denials() {
        for code in [-1, 8, 42, 255] {
            assert_eq!(
                interpret(CommandId::Authenticate, code),
                Outcome::Denied(DenialReason::Unrecognized)
            );
        }
        assert_eq!(
            interpret(CommandId::Authenticate, 7),
            Outcome::Denied(DenialReason::AccountFrozen)
        );
    }

    #[test]
    fn test_other_commands_succeed_only_on_zero() {
        for command in CommandId::ALL.iter().filter(|c| **c != CommandId::Authenticate) {
            assert_eq!(interpret(*command, 0), Outcome::Succeeded, "{command}");
            for code in [1, 2, 3, 5, -1] {
                assert_eq!(interpret(*command, code), Outcome::Failed, "{command} {code}");
            }
        }
    }

    #[test]
    fn test_tables_have_no_duplicate_codes() {
        for command in CommandId::ALL {
            let entries = command.exit_codes().entries();
            for (i, (code, _)) in entries.iter().enumerate() {
                assert!(
                    entries[i + 1..].iter().all(|(other, _)| other != code),
                    "duplicate exit code {code} for {command}"
                );
            }
        }
    }

    #[test]
    fn test_script_names_are_unique() {
        let mut names: Vec<&str> = CommandId::ALL.iter().map(|c| c.script_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CommandId::ALL.len());
        assert_eq!(CommandId::Authenticate.script_name(), "adminlogin.py");
        assert_eq!(CommandId::ListSessions.script_name(), "listsessions.py");
    }

    #[test]
    fn test_display_uses_protocol_name() {
        assert_eq!(CommandId::UserAction.to_string(), "user_action");
        assert_eq!(CommandId::ClearAllAttempts.to_string(), "clearallattempts");
    }
}
