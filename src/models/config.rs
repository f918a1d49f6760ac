//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings shared by every source
    #[serde(default)]
    pub http: HttpConfig,

    /// Text board polling settings
    #[serde(default)]
    pub board: BoardConfig,

    /// Live chat polling settings
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.board.poll_interval_ms == 0 {
            return Err(AppError::validation("board.poll_interval_ms must be > 0"));
        }
        if self.chat.interval_ms == 0 {
            return Err(AppError::validation("chat.interval_ms must be > 0"));
        }
        if let Some(thread_url) = &self.board.thread_url {
            url::Url::parse(thread_url)?;
        }
        if self.board.rules.iter().any(|r| r.marker.trim().is_empty()) {
            return Err(AppError::validation("board.rules contains an empty marker"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for every request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Board dialect: how a board addresses, encodes and lays out its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Byte-range + conditional fetch of a Shift_JIS dat file
    Range,
    /// Record-offset fetch of an EUC-JP raw feed
    Offset,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Range => f.write_str("range"),
            Dialect::Offset => f.write_str("offset"),
        }
    }
}

/// Maps a URL substring to the dialect that serves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialectRule {
    /// Substring looked up in the thread URL
    pub marker: String,

    /// Dialect used when the marker matches
    pub dialect: Dialect,
}

/// Text board polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Thread to follow; no board polling when unset
    #[serde(default)]
    pub thread_url: Option<String>,

    /// Record number to start from (empty: only the latest record)
    #[serde(default)]
    pub start_from: String,

    /// Delay between polls in milliseconds
    #[serde(default = "defaults::board_interval")]
    pub poll_interval_ms: u64,

    /// Dialect used when no rule matches
    #[serde(default = "defaults::default_dialect")]
    pub default_dialect: Dialect,

    /// Rules checked in order; the first match wins
    #[serde(default = "defaults::rules")]
    pub rules: Vec<DialectRule>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            thread_url: None,
            start_from: String::new(),
            poll_interval_ms: defaults::board_interval(),
            default_dialect: defaults::default_dialect(),
            rules: defaults::rules(),
        }
    }
}

/// Live chat polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Channel whose current live stream should be followed
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Stream to follow directly (takes precedence over `channel_id`)
    #[serde(default)]
    pub live_id: Option<String>,

    /// Delay between feed polls in milliseconds
    #[serde(default = "defaults::chat_interval")]
    pub interval_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            live_id: None,
            interval_ms: defaults::chat_interval(),
        }
    }
}

mod defaults {
    use super::{Dialect, DialectRule};

    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/75.0.3770.142 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    pub fn board_interval() -> u64 {
        5000
    }
    pub fn default_dialect() -> Dialect {
        Dialect::Range
    }
    pub fn rules() -> Vec<DialectRule> {
        vec![
            DialectRule {
                marker: "5ch.net".to_string(),
                dialect: Dialect::Range,
            },
            DialectRule {
                marker: "bbspink.com".to_string(),
                dialect: Dialect::Range,
            },
            DialectRule {
                marker: "jbbs.shitaraba.net".to_string(),
                dialect: Dialect::Offset,
            },
        ]
    }

    pub fn chat_interval() -> u64 {
        1000
    }
}
