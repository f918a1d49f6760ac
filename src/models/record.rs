//! Normalized comment record.

use serde::{Deserialize, Serialize};

/// One comment as produced by every board adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    /// 1-based position within the thread
    pub number: u64,

    /// Poster display name
    pub author: String,

    /// Email/contact field (usually empty on the wire, `None` here)
    pub contact: Option<String>,

    /// Source-formatted timestamp, kept verbatim
    pub posted_at: String,

    /// Raw text/HTML fragment as delivered
    pub body: String,

    /// Thread title, only on records that carry it
    pub thread_title: Option<String>,

    /// Poster ID; `None` means the board does not disclose one
    pub poster_id: Option<String>,
}

/// Map an empty wire field to `None`.
pub(crate) fn non_empty(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}
