//! Operator authentication.
//!
//! This module provides:
//! - `Session`: the operator's bearer credential for this process run
//! - `SessionContext`: the session plus the privilege granted at login,
//!   owned by the top-level controller and passed explicitly
//! - `AuthController`: the login / lockout / second-factor state machine
//!
//! Five failed primary logins lock the controller for the rest of the process.

pub mod controller;
pub mod session;

pub use controller::{AuthController, AuthState, LoginOutcome, OtpOutcome, MAX_ATTEMPTS};
pub use session::{Privilege, Session, SessionContext};
