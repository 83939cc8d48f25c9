//! Warden - an operator console for the SecureServer administration backend.
//!
//! Signs the operator in (with lockout and two-factor handling), then offers
//! a line-oriented command surface for user administration, session
//! revocation and backend server control.

mod app;
mod input;
mod prompt;
mod render;
mod utils;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warden_core::Config;

use app::{App, LoginResult};
use prompt::InputReader;

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "warden";

/// Default level for the terminal, which is shared with the console prompt.
const STDERR_LOG_LEVEL: &str = "error";

/// Default level for the rolling log file.
const FILE_LOG_LEVEL: &str = "warn";

/// `RUST_LOG` when set, `default` otherwise.
fn env_filter(default: &str) -> EnvFilter {
    layer_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), default)
}

fn layer_filter(directives: Option<String>, default: &str) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily rolling file. The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let appender = Config::log_dir().ok().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(dir)
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter(FILE_LOG_LEVEL));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_filter(env_filter(STDERR_LOG_LEVEL)),
        )
        .with(file_layer)
        .init();

    guard
}

fn load_config() -> Result<(Config, std::path::PathBuf)> {
    let path = Config::config_path()?;
    let mut config = match Config::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_env_overrides();
    Ok((config, path))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    info!("Warden starting");

    let (config, config_path) = load_config()?;
    let client = Arc::new(config.build_client().context("Failed to configure backend client")?);
    info!(app_root = %client.app_root().display(), interpreter = client.interpreter(), "Backend configured");

    let mut app = App::new(config, config_path, client)?;
    let mut input = InputReader::spawn();

    println!("\n=== Warden Admin Login ===\n");
    let code = match app.login(&mut input).await? {
        LoginResult::Authenticated => {
            app.run(&mut input).await?;
            ExitCode::SUCCESS
        }
        LoginResult::LockedOut => ExitCode::FAILURE,
        LoginResult::Cancelled => ExitCode::SUCCESS,
    };

    info!("Warden shutting down");
    Ok(code)
}
