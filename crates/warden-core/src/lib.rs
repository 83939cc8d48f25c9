//! Core library for the Warden administration client.
//!
//! Warden drives an external authentication/administration backend through a
//! fixed set of privileged commands. Each command is a process-style call:
//! ordered string arguments in, exit code plus captured output back.
//!
//! - `command`: the `PrivilegedCommandClient` transport and the exit-code table
//! - `auth`: operator session and the login/lockout/2FA state machine
//! - `admin`: user actions and singleton operations (logout, create user, ...)
//! - `fetch`: read-model list operations (users, sessions, failed attempts)
//! - `server`: supervisor for the backend server process
//! - `models`: entities returned by the backend

pub mod admin;
pub mod auth;
pub mod command;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod server;

pub use admin::{AdminAction, AdminDispatcher, NewUser};
pub use auth::{AuthController, AuthState, LoginOutcome, OtpOutcome, Privilege, Session, SessionContext, MAX_ATTEMPTS};
pub use command::{CommandError, CommandId, CommandOutput, PrivilegedCommandClient, ProcessCommandClient};
pub use config::Config;
pub use error::PortalError;
pub use fetch::ReadModelFetcher;
pub use server::{ServerError, ServerSupervisor, ShutdownOutcome};
