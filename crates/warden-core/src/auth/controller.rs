//! Login state machine.
//!
//! ```text
//! Idle -> AwaitingCredentials -> Validating -> Authenticated(privilege)
//!                 ^                   |     -> NeedOtp            --verify_otp--> Authenticated
//!                 |                   |     -> NeedOtpEnrollment  --verify_otp--> Authenticated
//!                 +------ Failure ----+     -> LockedOut (terminal)
//! ```

use tracing::{info, warn};

use crate::command::{interpret, CommandId, DenialReason, Outcome, PrivilegedCommandClient};
use crate::error::PortalError;

use super::{Privilege, Session, SessionContext};

/// Failed primary logins allowed before the controller locks for good.
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    AwaitingCredentials,
    Validating,
    Authenticated(Privilege),
    NeedOtp,
    NeedOtpEnrollment,
    LockedOut,
}

/// Result of a primary login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(Privilege),
    /// A one-time code must be supplied through `verify_otp`.
    NeedOtp,
    /// First-time second-factor setup. `payload` is the backend's raw output,
    /// to be shown to the operator (typically rendered as a scannable code).
    NeedOtpEnrollment { payload: String },
    Failure { reason: DenialReason, remaining: u32 },
    LockedOut,
}

/// Result of a one-time code verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    Success(Privilege),
    Rejected,
}

pub struct AuthController<C> {
    client: C,
    state: AuthState,
    attempts: u32,
}

impl<C: PrivilegedCommandClient> AuthController<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            state: AuthState::Idle,
            attempts: 0,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining(&self) -> u32 {
        MAX_ATTEMPTS.saturating_sub(self.attempts)
    }

    pub fn is_locked_out(&self) -> bool {
        self.state == AuthState::LockedOut
    }

    /// Show the credentials prompt.
    pub fn begin(&mut self) {
        if self.state == AuthState::Idle {
            self.state = AuthState::AwaitingCredentials;
        }
    }

    /// Authenticate with username and password.
    ///
    /// The session in `ctx` is replaced with the backend's output before the
    /// exit code is looked at, so it reflects this call even on failure.
    pub fn login(
        &mut self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, PortalError> {
        if self.is_locked_out() {
            return Err(PortalError::LockedOut);
        }

        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            self.state = AuthState::AwaitingCredentials;
            return Err(PortalError::MissingCredentials);
        }

        self.state = AuthState::Validating;
        let args = [username.to_string(), password.to_string()];
        // An unreachable backend counts as a failed attempt; the session is left alone.
        let output = match self.client.invoke(CommandId::Authenticate, &args) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Authentication backend unavailable");
                return Ok(self.register_failure(DenialReason::Unrecognized));
            }
        };

        ctx.replace_session(Session::new(output.stdout.trim(), username));

        match interpret(CommandId::Authenticate, output.exit_code) {
            Outcome::Granted(privilege) => {
                ctx.grant(privilege);
                self.state = AuthState::Authenticated(privilege);
                info!(%privilege, "Login successful");
                Ok(LoginOutcome::Success(privilege))
            }
            Outcome::OtpRequired => {
                self.state = AuthState::NeedOtp;
                info!("One-time code required");
                Ok(LoginOutcome::NeedOtp)
            }
            Outcome::EnrollmentRequired => {
                self.state = AuthState::NeedOtpEnrollment;
                info!("Second-factor enrollment required");
                Ok(LoginOutcome::NeedOtpEnrollment { payload: output.stdout })
            }
            Outcome::Denied(reason) => Ok(self.register_failure(reason)),
            Outcome::Succeeded | Outcome::Failed => Ok(self.register_failure(DenialReason::Unrecognized)),
        }
    }

    /// Complete a login that asked for a one-time code, or finish enrollment.
    ///
    /// A rejected code sends the operator back to the credentials prompt but
    /// does not count towards the lockout.
    pub fn verify_otp(
        &mut self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
        otp: &str,
    ) -> Result<OtpOutcome, PortalError> {
        match self.state {
            AuthState::NeedOtp | AuthState::NeedOtpEnrollment => {}
            AuthState::LockedOut => return Err(PortalError::LockedOut),
            _ => return Err(PortalError::OtpNotPending),
        }

        let username = username.trim();
        let args = [username.to_string(), password.to_string(), otp.trim().to_string()];
        let output = self.client.invoke(CommandId::Authenticate, &args)?;

        ctx.replace_session(Session::new(output.stdout.trim(), username));

        match interpret(CommandId::Authenticate, output.exit_code) {
            Outcome::Granted(privilege) => {
                ctx.grant(privilege);
                self.state = AuthState::Authenticated(privilege);
                info!(%privilege, "Second factor accepted");
                Ok(OtpOutcome::Success(privilege))
            }
            _ => {
                self.state = AuthState::AwaitingCredentials;
                warn!(exit_code = output.exit_code, "One-time code rejected");
                Ok(OtpOutcome::Rejected)
            }
        }
    }

    fn register_failure(&mut self, reason: DenialReason) -> LoginOutcome {
        self.attempts += 1;
        if self.attempts >= MAX_ATTEMPTS {
            self.state = AuthState::LockedOut;
            warn!(attempts = self.attempts, "Maximum login attempts exceeded");
            LoginOutcome::LockedOut
        } else {
            self.state = AuthState::AwaitingCredentials;
            warn!(attempts = self.attempts, reason = reason.description(), "Login failed");
            LoginOutcome::Failure {
                reason,
                remaining: self.remaining(),
            }
        }
    }
}
