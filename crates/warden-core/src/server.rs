//! Backend server process supervision.
//!
//! The server is a long-running child of the console. Stopping it is a two
//! step affair: a cooperative interrupt first, and a kill only when the
//! operator agrees to it.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

/// How long a cooperative shutdown may take.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const KILL_WAIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not find server entry point {}", .0.display())]
    EntryMissing(PathBuf),

    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Server is not running")]
    NotRunning,

    #[error("Server process error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a cooperative shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    Exited,
    StillRunning,
}

pub struct ServerSupervisor {
    interpreter: String,
    app_root: PathBuf,
    entry: PathBuf,
    grace: Duration,
    child: Option<Child>,
}

impl ServerSupervisor {
    pub fn new(interpreter: impl Into<String>, app_root: impl Into<PathBuf>, entry: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            app_root: app_root.into(),
            entry: entry.into(),
            grace: SHUTDOWN_GRACE,
            child: None,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn entry(&self) -> &Path {
        &self.entry
    }

    pub fn start(&mut self) -> Result<u32, ServerError> {
        if !self.entry.is_file() {
            return Err(ServerError::EntryMissing(self.entry.clone()));
        }
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        let child = Command::new(&self.interpreter)
            .arg(&self.entry)
            .current_dir(&self.app_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id();
        info!(pid, entry = %self.entry.display(), "Server started");
        self.child = Some(child);
        Ok(pid)
    }

    /// Whether the child is alive. Reaps it if it has exited on its own.
    pub fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(%status, "Server exited");
                self.child = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to query server status");
                true
            }
        }
    }

    pub fn pid(&mut self) -> Option<u32> {
        if self.is_running() {
            self.child.as_ref().map(Child::id)
        } else {
            None
        }
    }

    /// Ask the server to stop and wait up to the grace period.
    pub fn request_shutdown(&mut self) -> Result<ShutdownOutcome, ServerError> {
        if !self.is_running() {
            return Err(ServerError::NotRunning);
        }
        let Some(child) = self.child.as_mut() else {
            return Err(ServerError::NotRunning);
        };

        if let Err(e) = send_interrupt(child.id()) {
            warn!(error = %e, "Failed to interrupt server");
            return Ok(ShutdownOutcome::StillRunning);
        }

        if wait_for_exit(child, self.grace)? {
            info!("Server stopped");
            self.child = None;
            Ok(ShutdownOutcome::Exited)
        } else {
            warn!("Server did not respond to shutdown request");
            Ok(ShutdownOutcome::StillRunning)
        }
    }

    /// Kill the server and reap it.
    pub fn force_stop(&mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Err(ServerError::NotRunning);
        };
        if let Err(e) = child.kill() {
            // Already exited between the status check and the kill.
            if child.try_wait()?.is_none() {
                return Err(e.into());
            }
        }
        if !wait_for_exit(&mut child, KILL_WAIT)? {
            warn!(pid = child.id(), "Server still running after kill");
        }
        info!("Server terminated");
        Ok(())
    }

    /// Stop supervising the server without stopping it.
    ///
    /// The process is no longer killed when the supervisor is dropped.
    pub fn detach(&mut self) -> Option<u32> {
        let child = self.child.take()?;
        let pid = child.id();
        info!(pid, "Server left running");
        Some(pid)
    }
}

impl Drop for ServerSupervisor {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> std::io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn send_interrupt(pid: u32) -> std::io::Result<()> {
    let status = Command::new("kill")
        .arg("-INT")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("kill exited with {status}")))
    }
}

#[cfg(not(unix))]
fn send_interrupt(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "cooperative shutdown is not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = ServerSupervisor::new("sh", dir.path(), dir.path().join("main.py"));
        assert!(matches!(server.start(), Err(ServerError::EntryMissing(_))));
        assert!(!server.is_running());
        assert_eq!(server.pid(), None);
    }

    #[test]
    fn test_stop_when_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = ServerSupervisor::new("sh", dir.path(), dir.path().join("main.py"));
        assert!(matches!(server.request_shutdown(), Err(ServerError::NotRunning)));
        assert!(matches!(server.force_stop(), Err(ServerError::NotRunning)));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn supervisor(body: &str) -> (tempfile::TempDir, ServerSupervisor) {
            let dir = tempfile::tempdir().unwrap();
            let entry = dir.path().join("main.py");
            std::fs::write(&entry, body).unwrap();
            let server = ServerSupervisor::new("sh", dir.path(), entry).with_grace(Duration::from_secs(3));
            (dir, server)
        }

        #[test]
        fn test_start_and_graceful_stop() {
            let (_dir, mut server) = supervisor("trap 'exit 0' INT\nwhile true; do sleep 0.05; done\n");
            let pid = server.start().unwrap();
            assert_eq!(server.pid(), Some(pid));
            assert!(matches!(server.start(), Err(ServerError::AlreadyRunning)));

            // Let the shell install its trap.
            thread::sleep(Duration::from_millis(200));
            assert_eq!(server.request_shutdown().unwrap(), ShutdownOutcome::Exited);
            assert!(!server.is_running());
        }

        #[test]
        fn test_stubborn_server_needs_force() {
            let (_dir, mut server) = supervisor("trap '' INT\nwhile true; do sleep 0.05; done\n");
            server = server.with_grace(Duration::from_millis(300));
            server.start().unwrap();
            thread::sleep(Duration::from_millis(200));

            assert_eq!(server.request_shutdown().unwrap(), ShutdownOutcome::StillRunning);
            assert!(server.is_running());
            server.force_stop().unwrap();
            assert!(!server.is_running());
        }

        fn alive(pid: u32) -> bool {
            Command::new("kill")
                .args(["-0", &pid.to_string()])
                .stderr(Stdio::null())
                .status()
                .unwrap()
                .success()
        }

        #[test]
        fn test_detached_server_survives_drop() {
            let (_dir, mut server) = supervisor("while true; do sleep 0.05; done\n");
            let pid = server.start().unwrap();

            assert_eq!(server.detach(), Some(pid));
            assert!(!server.is_running());
            assert_eq!(server.detach(), None);
            drop(server);

            thread::sleep(Duration::from_millis(100));
            assert!(alive(pid));
            Command::new("kill").args(["-9", &pid.to_string()]).status().unwrap();
        }

        #[test]
        fn test_exited_server_is_reaped() {
            let (_dir, mut server) = supervisor("exit 0\n");
            server.start().unwrap();
            thread::sleep(Duration::from_millis(300));
            assert!(!server.is_running());
            assert_eq!(server.pid(), None);
        }
    }
}
