//! Utility functions for string formatting.

pub mod format;

pub use format::{format_bytes, format_optional, format_phone, format_timestamp, truncate_string, yes_no};
