//! Service layer for the synchronization library.
//!
//! This module contains the source-facing logic:
//! - Board adapters for both dialects (`board`)
//! - Dialect resolution per thread session (`SourceSelector`)
//! - Live chat polling (`livechat`)

pub mod board;
pub mod livechat;
mod selector;

pub use selector::SourceSelector;
