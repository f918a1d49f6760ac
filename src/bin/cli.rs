//! Comment Sync CLI
//!
//! Watches a board thread and/or a live chat and prints everything new as
//! JSON lines on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comment_sync::{
    config::{self, Overrides},
    error::{AppError, Result},
    models::Config,
    pipeline::{SyncDriver, SyncEvent, ThreadSession},
    services::livechat::ChatEvent,
    utils::http::ReqwestFetcher,
};
use tokio::sync::{mpsc, watch};

/// Comment Sync - incremental board and live chat comment feed
#[derive(Parser, Debug)]
#[command(
    name = "comment-sync",
    version,
    about = "Incremental comment synchronization for text boards and live chat"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every configured source until Ctrl-C
    Watch {
        /// Board thread URL (overrides board.thread_url)
        #[arg(long)]
        thread: Option<String>,

        /// First record number to request (empty: latest only)
        #[arg(long)]
        from: Option<String>,

        /// Channel whose live stream chat should be followed
        #[arg(long, conflicts_with = "live")]
        channel: Option<String>,

        /// Live stream id whose chat should be followed
        #[arg(long)]
        live: Option<String>,
    },

    /// Fetch a board thread once and print the records
    Fetch {
        /// Board thread URL
        #[arg(long)]
        thread: String,

        /// First record number to request (empty: latest only)
        #[arg(long, default_value = "")]
        from: String,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Watch {
            thread,
            from,
            channel,
            live,
        } => {
            let overrides = Overrides {
                thread_url: thread,
                start_from: from,
                channel_id: channel,
                live_id: live,
            };
            let config = config::load_with_overrides(&cli.config, overrides)?;
            run_watch(config).await?;
        }

        Command::Fetch { thread, from } => {
            let overrides = Overrides {
                thread_url: Some(thread),
                start_from: Some(from),
                ..Overrides::default()
            };
            let config = config::load_with_overrides(&cli.config, overrides)?;
            let fetcher = Arc::new(ReqwestFetcher::new(&config.http)?);

            let mut session = ThreadSession::from_config(&config.board, fetcher)?;
            let records = session.poll().await;
            log::info!(
                "Fetched {} records ({} dialect)",
                records.len(),
                session
                    .dialect()
                    .map_or_else(|| "unknown".to_string(), |d| d.to_string())
            );
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = Config::load_or_default(&cli.config);
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK ({} dialect rules)", config.board.rules.len());
        }
    }

    Ok(())
}

/// Run the driver until Ctrl-C, printing each event as one JSON line.
async fn run_watch(config: Config) -> Result<()> {
    let fetcher = Arc::new(ReqwestFetcher::new(&config.http)?);
    let driver = SyncDriver::new(config, fetcher);

    let (sink, mut events) = mpsc::channel::<SyncEvent>(256);
    let (stop, shutdown) = watch::channel(false);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let SyncEvent::Chat(ChatEvent::Comment(comment)) = &event {
                log::debug!("[chat] {}: {}", comment.author.name, comment.plain_text());
            }
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => log::warn!("Failed to serialize event: {e}"),
            }
        }
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        log::info!("Shutting down...");
        let _ = stop.send(true);
    });

    let result = driver.run(sink, shutdown).await;
    printer
        .await
        .map_err(|e| AppError::config(format!("Output task failed: {e}")))?;
    result
}
