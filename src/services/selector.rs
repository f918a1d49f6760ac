//! Board dialect selection.
//!
//! Picks the adapter for a thread URL by substring rules and keeps it for
//! the rest of the polling session.

use std::sync::Arc;

use crate::models::{BoardConfig, Dialect, DialectRule};
use crate::services::board::{BoardAdapter, OffsetAdapter, RangeAdapter};
use crate::utils::http::HttpFetch;

/// Service for resolving and caching the board adapter of a session.
pub struct SourceSelector {
    rules: Vec<DialectRule>,
    default_dialect: Dialect,
    fetcher: Arc<dyn HttpFetch>,
    active: Option<Box<dyn BoardAdapter>>,
}

impl SourceSelector {
    /// Create a selector with the given rules, checked in order.
    pub fn new(rules: Vec<DialectRule>, default_dialect: Dialect, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            rules,
            default_dialect,
            fetcher,
            active: None,
        }
    }

    /// Create a selector from board configuration.
    pub fn from_config(config: &BoardConfig, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self::new(config.rules.clone(), config.default_dialect, fetcher)
    }

    /// Dialect for `thread_url`: first matching rule, else the default.
    pub fn resolve_dialect(&self, thread_url: &str) -> Dialect {
        self.rules
            .iter()
            .find(|rule| thread_url.contains(&rule.marker))
            .map_or(self.default_dialect, |rule| rule.dialect)
    }

    /// Adapter for the session, resolved from `thread_url` on first use.
    pub fn select(&mut self, thread_url: &str) -> &mut dyn BoardAdapter {
        let adapter = match self.active.take() {
            Some(adapter) => adapter,
            None => {
                let dialect = self.resolve_dialect(thread_url);
                log::info!("Using {dialect} dialect for {thread_url}");
                self.build(dialect)
            }
        };
        self.active.insert(adapter).as_mut()
    }

    /// Dialect of the cached adapter, if any.
    pub fn active_dialect(&self) -> Option<Dialect> {
        self.active.as_ref().map(|adapter| adapter.dialect())
    }

    /// Forget the cached adapter; the next `select` resolves again.
    pub fn clear(&mut self) {
        self.active = None;
    }

    fn build(&self, dialect: Dialect) -> Box<dyn BoardAdapter> {
        match dialect {
            Dialect::Range => Box::new(RangeAdapter::new(Arc::clone(&self.fetcher))),
            Dialect::Offset => Box::new(OffsetAdapter::new(Arc::clone(&self.fetcher))),
        }
    }
}
