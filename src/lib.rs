// src/lib.rs

//! Comment Sync Library
//!
//! Polls text boards and live chat feeds and turns them into one stream of
//! normalized comment records.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;
