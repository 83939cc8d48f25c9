//! Read-model fetching over the privileged command transport.
//!
//! Each fetch runs one list command with the operator's session id and
//! parses stdout as a JSON array. Nothing is cached: every call returns a
//! fresh snapshot that replaces whatever the caller held before.

pub mod fetcher;

pub use fetcher::ReadModelFetcher;
