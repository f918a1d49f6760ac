// src/pipeline/session.rs

//! Board thread session.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{BoardConfig, CommentRecord, Dialect};
use crate::services::SourceSelector;
use crate::utils::http::HttpFetch;

/// Polling state for one board thread.
///
/// Owns the adapter chosen for the thread (through its selector) and the
/// number to request next. Records are only ever handed out in strictly
/// ascending number order.
pub struct ThreadSession {
    selector: SourceSelector,
    thread_url: String,
    next_from: String,
    last_number: Option<u64>,
}

impl ThreadSession {
    /// Create a session for `thread_url`, requesting `start_from` first
    /// (empty: latest record only).
    pub fn new(thread_url: impl Into<String>, start_from: impl Into<String>, selector: SourceSelector) -> Self {
        Self {
            selector,
            thread_url: thread_url.into(),
            next_from: start_from.into(),
            last_number: None,
        }
    }

    /// Create a session from `[board]` configuration.
    pub fn from_config(config: &BoardConfig, fetcher: Arc<dyn HttpFetch>) -> Result<Self> {
        let thread_url = config
            .thread_url
            .clone()
            .ok_or_else(|| AppError::config("board.thread_url is not set"))?;
        Ok(Self::new(
            thread_url,
            config.start_from.clone(),
            SourceSelector::from_config(config, fetcher),
        ))
    }

    pub fn thread_url(&self) -> &str {
        &self.thread_url
    }

    /// Record number requested by the next poll.
    pub fn next_from(&self) -> &str {
        &self.next_from
    }

    pub fn last_number(&self) -> Option<u64> {
        self.last_number
    }

    /// Dialect in use, once the first poll has selected it.
    pub fn dialect(&self) -> Option<Dialect> {
        self.selector.active_dialect()
    }

    /// Fetch once and return the records not seen before.
    pub async fn poll(&mut self) -> Vec<CommentRecord> {
        let adapter = self.selector.select(&self.thread_url);
        let records = adapter.fetch(&self.thread_url, &self.next_from).await;

        let mut fresh = Vec::with_capacity(records.len());
        for record in records {
            if self.last_number.is_some_and(|last| record.number <= last) {
                log::debug!("Skipping already emitted record {}", record.number);
                continue;
            }
            self.last_number = Some(record.number);
            fresh.push(record);
        }

        if let Some(last) = self.last_number {
            self.next_from = (last + 1).to_string();
        }
        fresh
    }
}
