//! Application configuration management.
//!
//! Holds where the backend lives and how to run it, plus the last username
//! the operator signed in with. Stored at `~/.config/warden/config.json`;
//! `WARDEN_*` environment variables override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::ProcessCommandClient;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "warden";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_INTERPRETER: &str = "python";
pub const DEFAULT_SCRIPTS_DIR: &str = "SecureServer/adminPortal";
pub const DEFAULT_SERVER_ENTRY: &str = "main.py";

pub const ENV_APP_ROOT: &str = "WARDEN_APP_ROOT";
pub const ENV_INTERPRETER: &str = "WARDEN_INTERPRETER";
pub const ENV_SCRIPTS_DIR: &str = "WARDEN_SCRIPTS_DIR";
pub const ENV_SERVER_ENTRY: &str = "WARDEN_SERVER_ENTRY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub app_root: Option<PathBuf>,
    pub interpreter: Option<String>,
    pub scripts_dir: Option<PathBuf>,
    pub server_entry: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for rolling log files.
    pub fn log_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join("logs"))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overwrite fields from `lookup`; blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(ENV_APP_ROOT) {
            self.app_root = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_INTERPRETER) {
            self.interpreter = Some(value);
        }
        if let Some(value) = get(ENV_SCRIPTS_DIR) {
            self.scripts_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_SERVER_ENTRY) {
            self.server_entry = Some(PathBuf::from(value));
        }
    }

    /// Configured app root, or the directory holding the running executable.
    pub fn resolved_app_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.app_root {
            return Ok(root.clone());
        }
        let exe = std::env::current_exe().context("Could not locate the running executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory"))
    }

    pub fn interpreter(&self) -> &str {
        self.interpreter.as_deref().unwrap_or(DEFAULT_INTERPRETER)
    }

    pub fn scripts_dir(&self) -> &Path {
        self.scripts_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SCRIPTS_DIR))
    }

    /// Server entry point, resolved against the app root.
    pub fn server_entry(&self) -> Result<PathBuf> {
        let entry = self
            .server_entry
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SERVER_ENTRY));
        Ok(self.resolved_app_root()?.join(entry))
    }

    pub fn build_client(&self) -> Result<ProcessCommandClient> {
        let app_root = self.resolved_app_root()?;
        Ok(ProcessCommandClient::new(self.interpreter(), app_root, self.scripts_dir()))
    }
}
