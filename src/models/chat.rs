//! Live chat comment structures.

use serde::{Deserialize, Serialize};

/// An image reference (avatar, emoji, sticker, badge).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageItem {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: Option<String>,
}

/// One run of a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageRun {
    Text { text: String },
    Image(ImageItem),
}

/// Custom badge shown next to an author (e.g. membership tier).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorBadge {
    pub thumbnail: Option<ImageItem>,
    pub label: String,
}

/// Chat author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatAuthor {
    pub name: String,
    pub thumbnail: Option<ImageItem>,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<AuthorBadge>,
}

/// Paid message details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Superchat {
    pub amount: String,
    pub color: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<ImageItem>,
}

/// A single chat comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatComment {
    pub id: String,
    pub author: ChatAuthor,
    pub message: Vec<MessageRun>,
    pub membership: bool,
    pub is_owner: bool,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superchat: Option<Superchat>,
}

impl ChatComment {
    /// Flatten the message runs into plain text; images contribute their alt.
    pub fn plain_text(&self) -> String {
        self.message
            .iter()
            .map(|run| match run {
                MessageRun::Text { text } => text.as_str(),
                MessageRun::Image(image) => image.alt.as_deref().unwrap_or(""),
            })
            .collect()
    }
}
