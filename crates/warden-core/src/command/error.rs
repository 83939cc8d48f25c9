use std::path::PathBuf;

use thiserror::Error;

use super::CommandId;

/// A command could not be run at all. Exit codes are never errors here.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Backend script for '{command}' not found: {}", path.display())]
    MissingResource { command: CommandId, path: PathBuf },

    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: CommandId,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    pub fn command(&self) -> CommandId {
        match self {
            CommandError::MissingResource { command, .. } => *command,
            CommandError::Spawn { command, .. } => *command,
        }
    }
}
