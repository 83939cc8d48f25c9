//! Data models for backend entities.
//!
//! - `User`: an account from `list_users`
//! - `Token`: another user's live session from `list_sessions`
//! - `AttemptEntry`: a failed-login record from `list_attempts`
//! - `Listing` / `EntryRef`: a fetched list and a selected row of it

pub mod attempt;
pub mod listing;
pub mod token;
pub mod user;

pub use attempt::AttemptEntry;
pub use listing::{EntryRef, Listing, ListingKind};
pub use token::Token;
pub use user::User;
