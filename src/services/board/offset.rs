//! Record-offset board dialect.
//!
//! The raw feed endpoint takes the first wanted record number in its path
//! and always answers with exactly that suffix, EUC-JP encoded.
//!
//! Line layout: `number<>author<>contact<>date<>body<>title<>id`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::BoardAdapter;
use crate::error::{AppError, Result};
use crate::models::{CommentRecord, Dialect, non_empty};
use crate::utils::codec::TextEncoding;
use crate::utils::delimited::{join_fields, split_fields, split_lines};
use crate::utils::http::HttpFetch;
use crate::utils::parse_number;

/// Adapter for offset boards. Holds no per-thread state.
pub struct OffsetAdapter {
    fetcher: Arc<dyn HttpFetch>,
}

impl OffsetAdapter {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    /// Rewrite a thread URL to the raw feed, addressed from `requested_from`.
    ///
    /// A positive number requests that record onward (`<n>-`); anything else
    /// requests only the latest record (`l1`).
    pub fn raw_url(thread_url: &str, requested_from: &str) -> String {
        let base = thread_url.replacen("read.cgi", "rawmode.cgi", 1);
        match parse_number(requested_from) {
            Some(n) if n > 0 => format!("{base}{n}-"),
            _ => format!("{base}l1"),
        }
    }

    async fn try_fetch(&self, thread_url: &str, requested_from: &str) -> Result<Vec<CommentRecord>> {
        let url = Self::raw_url(thread_url, requested_from);
        let response = self.fetcher.get(&url, HeaderMap::new()).await?;
        if !response.status.is_success() {
            return Err(AppError::Status {
                url,
                status: response.status.as_u16(),
            });
        }

        let text = TextEncoding::EucJp.decode(&response.body);
        let records = split_lines(&text)
            .into_iter()
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                parse_line(line)
                    .map_err(|e| log::warn!("Dropping line from {url}: {e}"))
                    .ok()
            })
            .collect();
        Ok(records)
    }
}

#[async_trait]
impl BoardAdapter for OffsetAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Offset
    }

    async fn fetch(&mut self, thread_url: &str, requested_from: &str) -> Vec<CommentRecord> {
        match self.try_fetch(thread_url, requested_from).await {
            Ok(records) => {
                log::info!("Fetched {} records from {}", records.len(), thread_url);
                records
            }
            Err(error) => {
                log::error!("Failed to fetch {thread_url}: {error}");
                Vec::new()
            }
        }
    }
}

/// Parse one raw feed line; the record number comes from field 0.
pub fn parse_line(line: &str) -> Result<CommentRecord> {
    let fields = split_fields(line);
    if fields.len() < 5 {
        return Err(AppError::parse(
            "offset line",
            format!("expected at least 5 fields, got {}", fields.len()),
        ));
    }
    let number = parse_number(fields[0])
        .ok_or_else(|| AppError::parse("offset line", format!("bad record number {:?}", fields[0])))?;

    Ok(CommentRecord {
        number,
        author: fields[1].to_string(),
        contact: non_empty(fields[2]),
        posted_at: fields[3].to_string(),
        body: fields[4].to_string(),
        thread_title: fields.get(5).and_then(|t| non_empty(t)),
        poster_id: fields.get(6).map(|id| id.to_string()),
    })
}

/// Render a record in raw feed layout.
pub fn serialize_record(record: &CommentRecord) -> String {
    let number = record.number.to_string();
    let mut fields = vec![
        number.as_str(),
        record.author.as_str(),
        record.contact.as_deref().unwrap_or(""),
        record.posted_at.as_str(),
        record.body.as_str(),
        record.thread_title.as_deref().unwrap_or(""),
    ];
    if let Some(id) = &record.poster_id {
        fields.push(id.as_str());
    }
    join_fields(&fields)
}
