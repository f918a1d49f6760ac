// src/config.rs

//! Configuration loading utilities.
//!
//! Convenience functions for loading configuration from files and applying
//! command-line overrides.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file is missing; a file that exists but
/// does not parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::warn!("Config file {path:?} not found. Using default configuration.");
        return Ok(Config::default());
    }
    Config::load(path)
}

/// Overrides supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub thread_url: Option<String>,
    pub start_from: Option<String>,
    pub channel_id: Option<String>,
    pub live_id: Option<String>,
}

/// Load the configuration, apply overrides and validate the result.
pub fn load_with_overrides(path: &Path, overrides: Overrides) -> Result<Config> {
    let mut config = load_config(path)?;

    if let Some(thread_url) = overrides.thread_url {
        config.board.thread_url = Some(thread_url);
    }
    if let Some(start_from) = overrides.start_from {
        config.board.start_from = start_from;
    }
    // A chat target given on the command line replaces the file's target.
    if let Some(channel_id) = overrides.channel_id {
        config.chat.channel_id = Some(channel_id);
        config.chat.live_id = None;
    }
    if let Some(live_id) = overrides.live_id {
        config.chat.live_id = Some(live_id);
        config.chat.channel_id = None;
    }

    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;

    Ok(config)
}
