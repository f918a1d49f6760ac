// src/models/mod.rs

//! Domain models for the synchronization layer.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod chat;
mod config;
mod record;

// Re-export all public types
pub use chat::{AuthorBadge, ChatAuthor, ChatComment, ImageItem, MessageRun, Superchat};
pub use config::{BoardConfig, ChatConfig, Config, Dialect, DialectRule, HttpConfig};
pub use record::CommentRecord;

pub(crate) use record::non_empty;
