//! Privileged admin operations.
//!
//! Per-user actions go through `user_action`; logout, create-user and
//! attempt clearing are singleton commands. Every call is a single backend
//! invocation: success iff the exit code is zero, otherwise the backend's
//! stderr becomes the error message.

pub mod dispatcher;

pub use dispatcher::{AdminAction, AdminDispatcher, NewUser};
