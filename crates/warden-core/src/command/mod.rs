//! Privileged command transport.
//!
//! This module provides:
//! - `PrivilegedCommandClient`: the single `invoke` capability every other
//!   component depends on
//! - `ProcessCommandClient`: runs backend scripts as child processes
//! - `protocol`: command identifiers and the exit-code table

pub mod client;
pub mod error;
pub mod protocol;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CommandOutput, PrivilegedCommandClient, ProcessCommandClient};
pub use error::CommandError;
pub use protocol::{interpret, CommandId, DenialReason, ExitCodeTable, Outcome};
