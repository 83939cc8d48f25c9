use thiserror::Error;

use crate::command::{CommandError, CommandOutput};

#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Invocation(#[from] CommandError),

    #[error("{0}")]
    BackendFailure(String),

    #[error("Failed to fetch {0}")]
    FetchFailed(&'static str),

    #[error("Invalid {what} payload")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Maximum login attempts exceeded")]
    LockedOut,

    #[error("Username and password required")]
    MissingCredentials,

    #[error("No one-time code is pending")]
    OtpNotPending,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Root privileges required")]
    RootRequired,
}

impl PortalError {
    /// Build a `BackendFailure` from a failed command, preferring the
    /// backend's own diagnostic text over the fallback.
    pub fn from_output(output: &CommandOutput, fallback: &str) -> Self {
        if output.stderr.trim().is_empty() {
            PortalError::BackendFailure(fallback.to_string())
        } else {
            PortalError::BackendFailure(output.stderr.clone())
        }
    }

    /// Whether the console has to end the operator session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PortalError::LockedOut)
    }
}
