//! Blocking command invocation.
//!
//! `PrivilegedCommandClient` is the one seam between the client logic and the
//! backend. The process implementation runs a backend script with the
//! configured interpreter, waits for it to exit and captures both streams.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::debug;

use super::{CommandError, CommandId};

/// Exit code reported when the process was terminated by a signal.
const SIGNALLED_EXIT_CODE: i32 = -1;

/// Raw response of a backend command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Invoke one privileged backend operation.
///
/// Implementations block until the operation completes and must not turn a
/// non-zero exit code into an error; callers interpret the code themselves.
pub trait PrivilegedCommandClient: Send + Sync {
    fn invoke(&self, command: CommandId, args: &[String]) -> Result<CommandOutput, CommandError>;
}

impl<T: PrivilegedCommandClient + ?Sized> PrivilegedCommandClient for Arc<T> {
    fn invoke(&self, command: CommandId, args: &[String]) -> Result<CommandOutput, CommandError> {
        (**self).invoke(command, args)
    }
}

impl<T: PrivilegedCommandClient + ?Sized> PrivilegedCommandClient for &T {
    fn invoke(&self, command: CommandId, args: &[String]) -> Result<CommandOutput, CommandError> {
        (**self).invoke(command, args)
    }
}

/// Runs backend scripts as child processes.
#[derive(Debug, Clone)]
pub struct ProcessCommandClient {
    interpreter: String,
    app_root: PathBuf,
    scripts_dir: PathBuf,
}

impl ProcessCommandClient {
    /// `scripts_dir` may be relative, in which case it is resolved against `app_root`.
    pub fn new(interpreter: impl Into<String>, app_root: impl Into<PathBuf>, scripts_dir: impl AsRef<Path>) -> Self {
        let app_root = app_root.into();
        let scripts_dir = app_root.join(scripts_dir);
        Self {
            interpreter: interpreter.into(),
            app_root,
            scripts_dir,
        }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn script_path(&self, command: CommandId) -> PathBuf {
        self.scripts_dir.join(command.script_name())
    }
}

impl PrivilegedCommandClient for ProcessCommandClient {
    fn invoke(&self, command: CommandId, args: &[String]) -> Result<CommandOutput, CommandError> {
        let script = self.script_path(command);
        if !script.is_file() {
            return Err(CommandError::MissingResource { command, path: script });
        }

        // Arguments carry passwords and session ids, so only the arity is logged.
        debug!(command = %command, args = args.len(), "Invoking backend command");

        let output = Command::new(&self.interpreter)
            .arg(&script)
            .args(args)
            .current_dir(&self.app_root)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CommandError::Spawn { command, source })?;

        let exit_code = output.status.code().unwrap_or(SIGNALLED_EXIT_CODE);
        debug!(command = %command, exit_code, "Backend command finished");

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_path_resolves_relative_dir() {
        let client = ProcessCommandClient::new("python", "/opt/secure", "SecureServer/adminPortal");
        assert_eq!(
            client.script_path(CommandId::ListUsers),
            PathBuf::from("/opt/secure/SecureServer/adminPortal/listusers.py")
        );
    }

    #[test]
    fn test_script_path_keeps_absolute_dir() {
        let client = ProcessCommandClient::new("python", "/opt/secure", "/srv/portal");
        assert_eq!(
            client.script_path(CommandId::Authenticate),
            PathBuf::from("/srv/portal/adminlogin.py")
        );
    }

    #[test]
    fn test_missing_script_fails_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        // An interpreter that cannot exist proves nothing was spawned.
        let client = ProcessCommandClient::new("definitely-not-an-interpreter", dir.path(), "scripts");
        let err = client.invoke(CommandId::LogoutAll, &["sid".to_string()]).unwrap_err();
        assert!(matches!(err, CommandError::MissingResource { command: CommandId::LogoutAll, .. }));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::write(dir.path().join("scripts").join("logoutall.py"), "").unwrap();
        let client = ProcessCommandClient::new("definitely-not-an-interpreter", dir.path(), "scripts");
        let err = client.invoke(CommandId::LogoutAll, &[]).unwrap_err();
        assert!(matches!(err, CommandError::Spawn { command: CommandId::LogoutAll, .. }));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn client_with_script(command: CommandId, body: &str) -> (tempfile::TempDir, ProcessCommandClient) {
            let dir = tempfile::tempdir().unwrap();
            let scripts = dir.path().join("scripts");
            std::fs::create_dir_all(&scripts).unwrap();
            std::fs::write(scripts.join(command.script_name()), body).unwrap();
            let client = ProcessCommandClient::new("sh", dir.path(), "scripts");
            (dir, client)
        }

        #[test]
        fn test_captures_streams_and_exit_code() {
            let (_dir, client) = client_with_script(
                CommandId::Authenticate,
                "echo \"token-for-$1\"\necho \"diag\" >&2\nexit 3\n",
            );
            let output = client
                .invoke(CommandId::Authenticate, &["alice".to_string(), "pw".to_string()])
                .unwrap();
            assert_eq!(output.exit_code, 3);
            assert_eq!(output.stdout, "token-for-alice\n");
            assert_eq!(output.stderr, "diag\n");
            assert!(!output.is_success());
        }

        #[test]
        fn test_non_zero_exit_is_not_an_error() {
            let (_dir, client) = client_with_script(CommandId::UserAction, "echo 'Invalid user ID' >&2\nexit 1\n");
            let output = client.invoke(CommandId::UserAction, &[]).unwrap();
            assert_eq!(output.exit_code, 1);
            assert_eq!(output.stderr, "Invalid user ID\n");
        }

        #[test]
        fn test_runs_in_app_root() {
            let (dir, client) = client_with_script(CommandId::ListUsers, "pwd\n");
            let output = client.invoke(CommandId::ListUsers, &[]).unwrap();
            assert!(output.is_success());
            let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
            assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
        }

        #[test]
        fn test_killed_by_signal_reports_minus_one() {
            let (_dir, client) = client_with_script(CommandId::ListSessions, "echo partial\nkill -9 $$\n");
            let output = client.invoke(CommandId::ListSessions, &[]).unwrap();
            assert_eq!(output.exit_code, SIGNALLED_EXIT_CODE);
            assert_eq!(output.exit_code, -1);
            assert_eq!(output.stdout, "partial\n");
            assert!(!output.is_success());
        }

        #[test]
        fn test_arguments_are_passed_in_order() {
            let (_dir, client) = client_with_script(CommandId::Logout, "printf '%s|' \"$@\"\n");
            let args = vec!["sid".to_string(), "user one".to_string()];
            let output = client.invoke(CommandId::Logout, &args).unwrap();
            assert_eq!(output.stdout, "sid|user one|");
        }
    }
}
