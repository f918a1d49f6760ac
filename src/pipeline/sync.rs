// src/pipeline/sync.rs

//! Synchronization driver.
//!
//! Runs the board session and the live chat poller side by side and funnels
//! both into one sink. Each source keeps its own order; the two are
//! interleaved as they arrive.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::ThreadSession;
use crate::error::{AppError, Result};
use crate::models::{CommentRecord, Config, Dialect};
use crate::services::livechat::{ChatEvent, LiveChat};
use crate::utils::http::HttpFetch;

/// Something new from one of the sources.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Newly appended board records, ascending by number
    Board {
        dialect: Dialect,
        records: Vec<CommentRecord>,
    },
    Chat(ChatEvent),
}

/// Drives every configured source until shutdown.
pub struct SyncDriver {
    config: Config,
    fetcher: Arc<dyn HttpFetch>,
}

impl SyncDriver {
    pub fn new(config: Config, fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { config, fetcher }
    }

    /// Poll until `shutdown` turns true (or its sender goes away).
    ///
    /// A live chat that cannot be resolved is reported through the sink and
    /// the board keeps running; it is only returned as an error when there
    /// is no board to fall back on. Callers running a board therefore learn
    /// of a chat start failure only from the `SyncEvent::Chat(ChatEvent::Error)`
    /// on the sink that is not preceded by a `ChatEvent::Start`.
    pub async fn run(&self, sink: mpsc::Sender<SyncEvent>, shutdown: watch::Receiver<bool>) -> Result<()> {
        let session = match self.config.board.thread_url {
            Some(_) => Some(ThreadSession::from_config(&self.config.board, Arc::clone(&self.fetcher))?),
            None => None,
        };
        let chat = if self.config.chat.live_id.is_some() || self.config.chat.channel_id.is_some() {
            Some(LiveChat::from_config(&self.config.chat, Arc::clone(&self.fetcher))?)
        } else {
            None
        };
        if session.is_none() && chat.is_none() {
            return Err(AppError::config(
                "nothing to watch: set board.thread_url or a chat channel_id/live_id",
            ));
        }

        let has_board = session.is_some();
        let period = Duration::from_millis(self.config.board.poll_interval_ms);

        let board = async {
            if let Some(session) = session {
                run_board(session, period, sink.clone(), shutdown.clone()).await;
            }
        };
        let chat = async {
            match chat {
                Some((chat, events)) => run_chat(chat, events, sink.clone(), shutdown.clone()).await,
                None => Ok(()),
            }
        };

        let ((), chat_result) = future::join(board, chat).await;
        match chat_result {
            Err(error) if !has_board => Err(error),
            Err(error) => {
                log::warn!("Live chat unavailable, continued with the board only: {error}");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }
}

/// Resolves once shutdown has been requested.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    // A closed channel counts as a request.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_board(
    mut session: ThreadSession,
    period: Duration,
    sink: mpsc::Sender<SyncEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    log::info!("Watching {} every {:?}", session.thread_url(), period);
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let records = tokio::select! {
            records = async {
                ticks.tick().await;
                session.poll().await
            } => records,
            () = shutdown_requested(&mut shutdown) => break,
        };
        if records.is_empty() {
            continue;
        }

        let Some(dialect) = session.dialect() else {
            continue;
        };
        if sink.send(SyncEvent::Board { dialect, records }).await.is_err() {
            log::debug!("Sink closed, stopping board loop");
            break;
        }
    }
    log::info!("Stopped watching {}", session.thread_url());
}

async fn run_chat(
    mut chat: LiveChat,
    mut events: mpsc::UnboundedReceiver<ChatEvent>,
    sink: mpsc::Sender<SyncEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    if let Err(error) = chat.start().await {
        while let Ok(event) = events.try_recv() {
            let _ = sink.send(SyncEvent::Chat(event)).await;
        }
        return Err(error);
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if sink.send(SyncEvent::Chat(event)).await.is_err() {
                    log::debug!("Sink closed, stopping chat forwarding");
                    break;
                }
            }
            () = shutdown_requested(&mut shutdown) => break,
        }
    }

    chat.stop(Some("shutdown".to_string()));
    while let Ok(event) = events.try_recv() {
        if sink.send(SyncEvent::Chat(event)).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoardConfig, ChatConfig};
    use crate::services::livechat::parser::fixtures::{continuation, feed, text_action};
    use crate::utils::codec::TextEncoding;
    use crate::utils::http::stub::{StubFetcher, response};

    const OFFSET_THREAD: &str = "https://jbbs.shitaraba.net/bbs/read.cgi/game/12345/1572739200/";
    // 2100-01-01, safely after the poller's wall-clock cursor.
    const FUTURE_USEC: i64 = 4_102_444_800_000_000;

    async fn next(receiver: &mut mpsc::Receiver<SyncEvent>) -> SyncEvent {
        tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("event within timeout")
            .expect("sink open")
    }

    #[tokio::test]
    async fn test_nothing_configured_is_error() {
        let driver = SyncDriver::new(Config::default(), Arc::new(StubFetcher::new()));
        let (sink, _receiver) = mpsc::channel(8);
        let (_stop, shutdown) = watch::channel(false);
        assert!(matches!(driver.run(sink, shutdown).await, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_board_records_reach_sink() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(response(
            200,
            &[],
            TextEncoding::EucJp.encode("7<>a<><>d<>hello<><>\n8<>b<><>d<>world<><>\n"),
        ));
        let config = Config {
            board: BoardConfig {
                thread_url: Some(OFFSET_THREAD.into()),
                start_from: "7".into(),
                poll_interval_ms: 10,
                ..BoardConfig::default()
            },
            ..Config::default()
        };

        let driver = SyncDriver::new(config, stub.clone());
        let (sink, mut receiver) = mpsc::channel(8);
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run(sink, shutdown).await });

        match next(&mut receiver).await {
            SyncEvent::Board { dialect, records } => {
                assert_eq!(dialect, Dialect::Offset);
                let numbers: Vec<u64> = records.iter().map(|r| r.number).collect();
                assert_eq!(numbers, vec![7, 8]);
            }
            other => panic!("unexpected event {other:?}"),
        }

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        assert!(stub.requests().iter().skip(1).all(|(url, _)| url.ends_with("/9-")));
    }

    #[tokio::test]
    async fn test_chat_events_forwarded_until_shutdown() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(response(
            200,
            &[],
            serde_json::to_vec(&feed(vec![text_action("c1", FUTURE_USEC, "hi"), continuation()])).unwrap(),
        ));
        let config = Config {
            chat: ChatConfig {
                live_id: Some("abc123".into()),
                interval_ms: 10,
                ..ChatConfig::default()
            },
            ..Config::default()
        };

        let driver = SyncDriver::new(config, stub.clone());
        let (sink, mut receiver) = mpsc::channel(64);
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run(sink, shutdown).await });

        assert_eq!(
            next(&mut receiver).await,
            SyncEvent::Chat(ChatEvent::Start("abc123".into()))
        );
        match next(&mut receiver).await {
            SyncEvent::Chat(ChatEvent::Comment(comment)) => assert_eq!(comment.id, "c1"),
            other => panic!("unexpected event {other:?}"),
        }

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();

        let mut last = None;
        while let Ok(event) = receiver.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(SyncEvent::Chat(ChatEvent::End(Some("shutdown".into()))))
        );
    }

    #[tokio::test]
    async fn test_unresolvable_chat_without_board_fails() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(response(200, &[], "<html>offline</html>"));
        let config = Config {
            chat: ChatConfig {
                channel_id: Some("UCoffline".into()),
                ..ChatConfig::default()
            },
            ..Config::default()
        };

        let driver = SyncDriver::new(config, stub);
        let (sink, mut receiver) = mpsc::channel(8);
        let (_stop, shutdown) = watch::channel(false);

        let result = driver.run(sink, shutdown).await;

        assert!(matches!(result, Err(AppError::Resolution(_))));
        assert!(matches!(
            receiver.try_recv(),
            Ok(SyncEvent::Chat(ChatEvent::Error(_)))
        ));
    }

    #[tokio::test]
    async fn test_chat_start_failure_with_board_surfaces_on_sink() {
        // Nothing queued: every request fails, including the channel lookup.
        let stub = Arc::new(StubFetcher::new());
        let config = Config {
            board: BoardConfig {
                thread_url: Some(OFFSET_THREAD.into()),
                poll_interval_ms: 10,
                ..BoardConfig::default()
            },
            chat: ChatConfig {
                channel_id: Some("UCoffline".into()),
                ..ChatConfig::default()
            },
            ..Config::default()
        };

        let driver = SyncDriver::new(config, stub);
        let (sink, mut receiver) = mpsc::channel(8);
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(async move { driver.run(sink, shutdown).await });

        assert!(matches!(next(&mut receiver).await, SyncEvent::Chat(ChatEvent::Error(_))));

        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();
        while let Ok(event) = receiver.try_recv() {
            assert!(!matches!(event, SyncEvent::Chat(ChatEvent::Start(_))));
        }
    }

    #[test]
    fn test_event_json_shape() {
        let event = SyncEvent::Chat(ChatEvent::End(Some("shutdown".into())));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"], "chat");
        assert_eq!(json["event"], "end");
        assert_eq!(json["data"], "shutdown");
    }
}
