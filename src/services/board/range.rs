//! Range/conditional board dialect.
//!
//! Threads are served as a Shift_JIS `.dat` file. The adapter remembers the
//! `Last-Modified` header and how many bytes it has consumed, and asks only
//! for the tail with `Range` + `If-Modified-Since` on the next poll.
//!
//! Line layout: `author<>contact<>date[ ID:id]<>body<>title`

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, HeaderMap, HeaderValue, IF_MODIFIED_SINCE,
    LAST_MODIFIED, RANGE,
};

use super::BoardAdapter;
use crate::error::{AppError, Result};
use crate::models::{CommentRecord, Dialect, non_empty};
use crate::utils::codec::TextEncoding;
use crate::utils::delimited::{join_fields, split_fields, split_lines_trimmed};
use crate::utils::http::HttpFetch;
use crate::utils::parse_number;

static READ_CGI_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/test/read\.cgi(/.+)(/.+)/").expect("static regex"));

const ID_SEPARATOR: &str = " ID:";

/// Fetch position for one thread session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMarker {
    /// Thread the marker belongs to
    pub thread_url: String,
    /// `Last-Modified` of the previous successful fetch
    pub last_modified: Option<String>,
    /// Byte offset requested with the next `Range` header
    pub last_byte: u64,
    /// One past the last record number of the latest snapshot
    pub last_number: u64,
}

impl RangeMarker {
    /// Whether the caller appears to be starting the thread over.
    fn needs_reset(&self, thread_url: &str, requested_from: &str) -> bool {
        if thread_url != self.thread_url || requested_from.is_empty() {
            return true;
        }
        parse_number(requested_from).is_some_and(|n| n < self.last_number)
    }

    fn reset(&mut self, thread_url: &str) {
        self.thread_url = thread_url.to_string();
        self.last_modified = None;
        self.last_byte = 0;
    }
}

/// Adapter for range/conditional boards.
pub struct RangeAdapter {
    fetcher: Arc<dyn HttpFetch>,
    marker: RangeMarker,
}

impl RangeAdapter {
    /// Create an adapter with a fresh marker.
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self::with_marker(fetcher, RangeMarker::default())
    }

    /// Create an adapter resuming from an existing marker.
    pub fn with_marker(fetcher: Arc<dyn HttpFetch>, marker: RangeMarker) -> Self {
        Self { fetcher, marker }
    }

    /// Current fetch position.
    pub fn marker(&self) -> &RangeMarker {
        &self.marker
    }

    /// Rewrite a thread URL to its raw `.dat` resource.
    ///
    /// `https://host/test/read.cgi/board/123/` -> `https://host/board/dat/123.dat`
    pub fn dat_url(thread_url: &str) -> String {
        READ_CGI_PATH
            .replace(thread_url, "$1/dat$2.dat")
            .into_owned()
    }

    async fn try_fetch(&mut self, thread_url: &str, requested_from: &str) -> Result<Vec<CommentRecord>> {
        if self.marker.needs_reset(thread_url, requested_from) {
            log::debug!("Resetting range marker for {thread_url} (from={requested_from:?})");
            self.marker.reset(thread_url);
        }

        let url = Self::dat_url(thread_url);
        let from_byte = self.marker.last_byte;

        let mut headers = HeaderMap::new();
        let if_modified = self.marker.last_modified.as_deref().unwrap_or("");
        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_str(if_modified).map_err(|e| AppError::parse("If-Modified-Since", e))?,
        );
        headers.insert(
            RANGE,
            HeaderValue::from_str(&format!("bytes={from_byte}-"))
                .map_err(|e| AppError::parse("Range", e))?,
        );
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let response = self.fetcher.get(&url, headers).await?;
        if response.status == StatusCode::NOT_MODIFIED {
            return Err(AppError::NotModified);
        }
        if response.status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Err(AppError::RangeNotSatisfiable);
        }
        if !response.status.is_success() {
            return Err(AppError::Status {
                url,
                status: response.status.as_u16(),
            });
        }

        if let Some(last_modified) = response.header(LAST_MODIFIED.as_str()) {
            self.marker.last_modified = Some(last_modified.to_string());
        }

        let text = TextEncoding::ShiftJis.decode(&response.body);
        let records = if response.header(CONTENT_RANGE.as_str()).is_none() || from_byte == 0 {
            self.parse_snapshot(&text, requested_from)
        } else {
            self.parse_delta(&text, requested_from)
        };

        // The final byte already seen is requested again on the next poll.
        let content_length = response
            .header(CONTENT_LENGTH.as_str())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(length) = content_length {
            if !records.is_empty() {
                self.marker.last_byte += length.saturating_sub(1);
            }
        }

        Ok(records)
    }

    /// Whole thread: pick records from the requested number (or the last
    /// line only) to the end.
    fn parse_snapshot(&mut self, text: &str, requested_from: &str) -> Vec<CommentRecord> {
        let lines = split_lines_trimmed(text);
        if lines.is_empty() {
            return Vec::new();
        }

        let start = match parse_number(requested_from) {
            Some(n) => n.saturating_sub(1) as usize,
            None => lines.len() - 1,
        };
        log::debug!("Snapshot of {} lines, starting at index {}", lines.len(), start);

        let records = lines
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, line)| !line.is_empty())
            .filter_map(|(index, line)| parse_or_warn(line, index as u64 + 1))
            .collect();

        self.marker.last_number = start.max(lines.len()) as u64 + 1;
        records
    }

    /// Appended tail: every non-empty line is new.
    fn parse_delta(&self, text: &str, requested_from: &str) -> Vec<CommentRecord> {
        let mut number = parse_number(requested_from).unwrap_or(self.marker.last_number);
        let mut records = Vec::new();

        for line in split_lines_trimmed(text).into_iter().filter(|l| !l.is_empty()) {
            if let Some(record) = parse_or_warn(line, number) {
                records.push(record);
            }
            number += 1;
        }
        records
    }
}

#[async_trait]
impl BoardAdapter for RangeAdapter {
    fn dialect(&self) -> Dialect {
        Dialect::Range
    }

    async fn fetch(&mut self, thread_url: &str, requested_from: &str) -> Vec<CommentRecord> {
        match self.try_fetch(thread_url, requested_from).await {
            Ok(records) => {
                log::info!("Fetched {} records from {}", records.len(), thread_url);
                records
            }
            Err(error) if error.is_no_op() => {
                log::debug!("{thread_url}: {error}");
                Vec::new()
            }
            Err(error) => {
                log::error!("Failed to fetch {thread_url}: {error}");
                Vec::new()
            }
        }
    }
}

fn parse_or_warn(line: &str, number: u64) -> Option<CommentRecord> {
    parse_line(line, number)
        .map_err(|e| log::warn!("Dropping record {number}: {e}"))
        .ok()
}

/// Parse one dat line into a record numbered `number`.
pub fn parse_line(line: &str, number: u64) -> Result<CommentRecord> {
    let fields = split_fields(line);
    if fields.len() < 4 {
        return Err(AppError::parse(
            "range line",
            format!("expected at least 4 fields, got {}", fields.len()),
        ));
    }

    let date_id: Vec<&str> = fields[2].split(ID_SEPARATOR).collect();
    let poster_id = if date_id.len() == 2 {
        Some(date_id[1].to_string())
    } else {
        None
    };

    Ok(CommentRecord {
        number,
        author: fields[0].to_string(),
        contact: non_empty(fields[1]),
        posted_at: date_id[0].to_string(),
        body: fields[3].to_string(),
        thread_title: fields.get(4).and_then(|t| non_empty(t)),
        poster_id,
    })
}

/// Render a record in dat line layout (the number is positional, not stored).
pub fn serialize_record(record: &CommentRecord) -> String {
    let date_id = match &record.poster_id {
        Some(id) => format!("{}{}{}", record.posted_at, ID_SEPARATOR, id),
        None => record.posted_at.clone(),
    };
    join_fields(&[
        record.author.as_str(),
        record.contact.as_deref().unwrap_or(""),
        date_id.as_str(),
        record.body.as_str(),
        record.thread_title.as_deref().unwrap_or(""),
    ])
}
