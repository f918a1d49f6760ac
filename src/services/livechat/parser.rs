//! Live chat feed parsing.
//!
//! Locates the action list in a feed response, resolves each action to one
//! of four renderer variants and builds [`ChatComment`]s from them.

use serde::Deserialize;
use serde_json::Value;

use super::types::{ChatAction, MessageRenderer, Run, Thumbnail};
use crate::error::{AppError, Result};
use crate::models::{AuthorBadge, ChatAuthor, ChatComment, ImageItem, MessageRun, Superchat};

/// Path of the action list inside element 1 of the feed response.
const ACTIONS_POINTER: &str = "/response/contents/liveChatRenderer/actions";

/// Renderer variant carried by an add-chat-item action.
#[derive(Debug, Clone, Copy)]
pub enum RendererKind<'a> {
    TextMessage(&'a MessageRenderer),
    PaidMessage(&'a MessageRenderer),
    PaidSticker(&'a MessageRenderer),
    Membership(&'a MessageRenderer),
}

impl<'a> RendererKind<'a> {
    pub fn renderer(self) -> &'a MessageRenderer {
        match self {
            RendererKind::TextMessage(r)
            | RendererKind::PaidMessage(r)
            | RendererKind::PaidSticker(r)
            | RendererKind::Membership(r) => r,
        }
    }
}

/// Resolve the renderer of an action; `None` for actions that carry no
/// displayable chat item.
pub fn action_to_renderer(action: &ChatAction) -> Option<RendererKind<'_>> {
    let item = &action.add_chat_item_action.as_ref()?.item;
    if let Some(r) = &item.live_chat_text_message_renderer {
        Some(RendererKind::TextMessage(r))
    } else if let Some(r) = &item.live_chat_paid_message_renderer {
        Some(RendererKind::PaidMessage(r))
    } else if let Some(r) = &item.live_chat_paid_sticker_renderer {
        Some(RendererKind::PaidSticker(r))
    } else {
        item.live_chat_membership_item_renderer
            .as_ref()
            .map(RendererKind::Membership)
    }
}

/// Convert a microsecond timestamp string to milliseconds.
pub fn usec_to_ms(usec: &str) -> Option<i64> {
    usec.trim().parse::<i64>().ok().map(|us| us.div_euclid(1000))
}

/// Extract the raw action list from a decoded feed response.
pub fn extract_actions(feed: &Value) -> Result<&Vec<Value>> {
    feed.get(1)
        .and_then(|v| v.pointer(ACTIONS_POINTER))
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::parse("live chat feed", "action list not found"))
}

/// Comments newer than `cursor_ms`, in feed order.
///
/// The final action is a continuation marker and is never a candidate.
/// Actions that fail to decode are dropped individually.
pub fn parse_feed(feed: &Value, cursor_ms: i64) -> Result<Vec<ChatComment>> {
    let actions = extract_actions(feed)?;
    let candidates = &actions[..actions.len().saturating_sub(1)];

    let comments = candidates
        .iter()
        .filter_map(|value| match ChatAction::deserialize(value) {
            Ok(action) => Some(action),
            Err(e) => {
                log::warn!("Dropping malformed chat action: {e}");
                None
            }
        })
        .filter(|action| {
            action_to_renderer(action)
                .and_then(|kind| usec_to_ms(&kind.renderer().timestamp_usec))
                .is_some_and(|ts| ts > cursor_ms)
        })
        .filter_map(|action| parse_action(&action))
        .collect();
    Ok(comments)
}

/// Build a comment from an action; `None` when it has no renderer or an
/// unreadable timestamp.
pub fn parse_action(action: &ChatAction) -> Option<ChatComment> {
    let kind = action_to_renderer(action)?;
    let r = kind.renderer();
    let timestamp_ms = usec_to_ms(&r.timestamp_usec)?;

    let runs: &[Run] = if let Some(message) = &r.message {
        &message.runs
    } else if let Some(header) = &r.header_subtext {
        &header.runs
    } else {
        &[]
    };

    let name = r
        .author_name
        .as_ref()
        .map(|n| n.simple_text.clone())
        .unwrap_or_default();
    let thumbnail = r
        .author_photo
        .as_ref()
        .and_then(|photo| thumbnail_to_image(&photo.thumbnails, Some(name.clone())));

    let mut comment = ChatComment {
        id: r.id.clone(),
        author: ChatAuthor {
            name,
            thumbnail,
            channel_id: r.author_external_channel_id.clone(),
            badge: None,
        },
        message: parse_runs(runs),
        membership: r.header_subtext.is_some(),
        is_owner: false,
        timestamp_ms,
        superchat: None,
    };

    let first_badge = r
        .author_badges
        .as_ref()
        .and_then(|badges| badges.first())
        .and_then(|b| b.live_chat_author_badge_renderer.as_ref());
    if let Some(badge) = first_badge {
        match &badge.custom_thumbnail {
            Some(custom) => {
                comment.author.badge = Some(AuthorBadge {
                    thumbnail: thumbnail_to_image(&custom.thumbnails, Some(badge.tooltip.clone())),
                    label: badge.tooltip.clone(),
                });
            }
            None => comment.is_owner = true,
        }
    }

    let amount = r.purchase_amount_text.as_ref().map(|t| t.simple_text.clone());
    if let Some(sticker) = &r.sticker {
        let label = sticker
            .accessibility
            .as_ref()
            .map(|a| a.accessibility_data.label.clone());
        comment.superchat = Some(Superchat {
            amount: amount.unwrap_or_default(),
            color: r.background_color.unwrap_or_default(),
            sticker: thumbnail_to_image(&sticker.thumbnails, label),
        });
    } else if let Some(amount) = amount {
        comment.superchat = Some(Superchat {
            amount,
            color: r.body_background_color.unwrap_or_default(),
            sticker: None,
        });
    }

    Some(comment)
}

fn parse_runs(runs: &[Run]) -> Vec<MessageRun> {
    runs.iter()
        .filter_map(|run| {
            if let Some(text) = &run.text {
                return Some(MessageRun::Text { text: text.clone() });
            }
            let emoji = run.emoji.as_ref()?;
            thumbnail_to_image(&emoji.image.thumbnails, emoji.shortcuts.first().cloned())
                .map(MessageRun::Image)
        })
        .collect()
}

/// The last (largest) thumbnail as an image.
fn thumbnail_to_image(thumbnails: &[Thumbnail], alt: Option<String>) -> Option<ImageItem> {
    thumbnails.last().map(|t| ImageItem {
        url: t.url.clone(),
        width: t.width,
        height: t.height,
        alt,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    pub(crate) fn text_action(id: &str, usec: i64, text: &str) -> Value {
        json!({
            "addChatItemAction": {
                "item": {
                    "liveChatTextMessageRenderer": {
                        "id": id,
                        "message": { "runs": [{ "text": text }] },
                        "authorName": { "simpleText": format!("author-{id}") },
                        "authorPhoto": { "thumbnails": [
                            { "url": "https://yt3.ggpht.com/small", "width": 32, "height": 32 },
                            { "url": "https://yt3.ggpht.com/large", "width": 64, "height": 64 }
                        ] },
                        "authorExternalChannelId": format!("UC-{id}"),
                        "timestampUsec": usec.to_string()
                    }
                }
            }
        })
    }

    pub(crate) fn continuation() -> Value {
        json!({ "addLiveChatTickerItemAction": { "item": {} } })
    }

    /// A feed response wrapping `actions` the way the endpoint does.
    pub(crate) fn feed(actions: Vec<Value>) -> Value {
        json!([
            { "page": "live_chat" },
            { "response": { "contents": { "liveChatRenderer": { "actions": actions } } } }
        ])
    }
}
