//! Text board adapters.
//!
//! Each adapter turns one board dialect into [`CommentRecord`]s:
//! - [`RangeAdapter`]: byte-range + conditional fetch, Shift_JIS
//! - [`OffsetAdapter`]: record-offset fetch, EUC-JP

pub mod offset;
pub mod range;

use async_trait::async_trait;

use crate::models::CommentRecord;
pub use crate::models::Dialect;

pub use offset::OffsetAdapter;
pub use range::{RangeAdapter, RangeMarker};

/// Incremental fetch over one board dialect.
///
/// `fetch` never fails: transport and parse problems are logged and yield an
/// empty (or partial) result so the caller can simply poll again.
#[async_trait]
pub trait BoardAdapter: Send {
    /// Dialect handled by this adapter.
    fn dialect(&self) -> Dialect;

    /// Fetch records of `thread_url` starting at `requested_from`
    /// (empty: only the latest record).
    async fn fetch(&mut self, thread_url: &str, requested_from: &str) -> Vec<CommentRecord>;
}
