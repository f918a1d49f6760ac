//! Utility functions and helpers.

pub mod codec;
pub mod delimited;
pub mod http;

/// Parse a caller-supplied record number.
///
/// Leading/trailing whitespace is ignored; anything else that is not a
/// non-negative integer yields `None`.
pub fn parse_number(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}
