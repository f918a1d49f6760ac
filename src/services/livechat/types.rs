//! Wire shapes of the live chat feed.
//!
//! Only the fields the parser reads are modeled; everything else is ignored.

use serde::Deserialize;

/// One entry of the feed's action list.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatAction {
    #[serde(default)]
    pub add_chat_item_action: Option<AddChatItemAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddChatItemAction {
    pub item: ChatItem,
}

/// Carries at most one renderer variant.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatItem {
    #[serde(default)]
    pub live_chat_text_message_renderer: Option<MessageRenderer>,
    #[serde(default)]
    pub live_chat_paid_message_renderer: Option<MessageRenderer>,
    #[serde(default)]
    pub live_chat_paid_sticker_renderer: Option<MessageRenderer>,
    #[serde(default)]
    pub live_chat_membership_item_renderer: Option<MessageRenderer>,
}

/// Fields shared by the four renderer variants.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageRenderer {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub message: Option<Runs>,
    #[serde(default)]
    pub header_subtext: Option<Runs>,
    #[serde(default)]
    pub author_name: Option<SimpleText>,
    #[serde(default)]
    pub author_photo: Option<Thumbnails>,
    #[serde(default)]
    pub author_external_channel_id: String,
    /// Microseconds since the Unix epoch, as a decimal string
    #[serde(default)]
    pub timestamp_usec: String,
    #[serde(default)]
    pub author_badges: Option<Vec<AuthorBadgeEntry>>,
    #[serde(default)]
    pub purchase_amount_text: Option<SimpleText>,
    #[serde(default)]
    pub body_background_color: Option<u64>,
    #[serde(default)]
    pub background_color: Option<u64>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Runs {
    #[serde(default)]
    pub runs: Vec<Run>,
}

/// A text run or an inline emoji run.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Run {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub emoji: Option<Emoji>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Emoji {
    #[serde(default)]
    pub shortcuts: Vec<String>,
    #[serde(default)]
    pub image: Thumbnails,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Thumbnails {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SimpleText {
    #[serde(default)]
    pub simple_text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBadgeEntry {
    #[serde(default)]
    pub live_chat_author_badge_renderer: Option<BadgeRenderer>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRenderer {
    #[serde(default)]
    pub custom_thumbnail: Option<Thumbnails>,
    #[serde(default)]
    pub tooltip: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Sticker {
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub accessibility: Option<Accessibility>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessibility {
    pub accessibility_data: AccessibilityData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessibilityData {
    #[serde(default)]
    pub label: String,
}
