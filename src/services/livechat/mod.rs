// src/services/livechat/mod.rs

//! Live chat poller.
//!
//! Resolves the current stream of a channel (or takes a stream id directly),
//! then polls the chat feed on a fixed interval and emits every comment newer
//! than its cursor as a [`ChatEvent`].
//!
//! Each tick runs its cycle as a separate task, so a slow cycle never delays
//! the next one. Cycles only touch shared state after their network call has
//! settled, under the cursor lock, which is also where `stop` flips the
//! running flag.

pub mod parser;
pub mod types;

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regex::Regex;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{ChatComment, ChatConfig};
use crate::utils::http::{HttpFetch, RawResponse};

const CHANNEL_LIVE_URL: &str = "https://www.youtube.com/channel";
const FEED_URL: &str = "https://www.youtube.com/live_chat";
const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Stream id as embedded in the live page, escaped or not.
static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"videoId\\?":\\?"([\w-]+)"#).expect("valid video id regex"));

/// What the poller follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveTarget {
    /// A channel; its current live stream is resolved on start
    Channel(String),
    /// A stream id
    Live(String),
}

/// Events emitted by the poller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ChatEvent {
    /// Polling began for this stream id
    Start(String),
    Comment(ChatComment),
    /// A cycle or the resolution failed
    Error(String),
    /// Polling ended
    End(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Resolving,
    Active,
    Stopped,
    Errored,
}

struct Cursor {
    timestamp_ms: i64,
    running: bool,
}

struct Shared {
    fetcher: Arc<dyn HttpFetch>,
    events: mpsc::UnboundedSender<ChatEvent>,
    cursor: Mutex<Cursor>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ChatEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.events.send(event);
    }
}

/// Polls one live chat.
pub struct LiveChat {
    target: LiveTarget,
    interval: Duration,
    state: PollerState,
    live_id: Option<String>,
    shared: Arc<Shared>,
    timer: Option<JoinHandle<()>>,
}

impl LiveChat {
    /// Create an idle poller and the receiving end of its event stream.
    ///
    /// The cursor starts at the current wall-clock time, so comments already
    /// in the feed are not replayed.
    pub fn new(target: LiveTarget, fetcher: Arc<dyn HttpFetch>) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            fetcher,
            events,
            cursor: Mutex::new(Cursor {
                timestamp_ms: chrono::Utc::now().timestamp_millis(),
                running: false,
            }),
        });
        let live_id = match &target {
            LiveTarget::Live(id) => Some(id.clone()),
            LiveTarget::Channel(_) => None,
        };
        let chat = Self {
            target,
            interval: DEFAULT_INTERVAL,
            state: PollerState::Idle,
            live_id,
            shared,
            timer: None,
        };
        (chat, receiver)
    }

    /// Create a poller from `[chat]` configuration; a stream id wins over a
    /// channel id.
    pub fn from_config(
        config: &ChatConfig,
        fetcher: Arc<dyn HttpFetch>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>)> {
        let target = match (&config.live_id, &config.channel_id) {
            (Some(live_id), _) => LiveTarget::Live(live_id.clone()),
            (None, Some(channel_id)) => LiveTarget::Channel(channel_id.clone()),
            (None, None) => return Err(AppError::config("chat needs a channel_id or a live_id")),
        };
        let (chat, receiver) = Self::new(target, fetcher);
        Ok((chat.with_interval(Duration::from_millis(config.interval_ms)), receiver))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the initial cursor (milliseconds since the Unix epoch).
    pub fn with_cursor(self, timestamp_ms: i64) -> Self {
        self.shared.lock().timestamp_ms = timestamp_ms;
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn target(&self) -> &LiveTarget {
        &self.target
    }

    /// Stream id being polled, once known.
    pub fn live_id(&self) -> Option<&str> {
        self.live_id.as_deref()
    }

    /// Timestamp of the newest comment emitted so far.
    pub fn cursor(&self) -> i64 {
        self.shared.lock().timestamp_ms
    }

    /// Resolve the stream if needed and start the polling timer.
    ///
    /// Returns the stream id. A resolution failure moves the poller to
    /// [`PollerState::Errored`], emits an error event and is returned.
    pub async fn start(&mut self) -> Result<String> {
        if self.state == PollerState::Active {
            if let Some(live_id) = &self.live_id {
                return Ok(live_id.clone());
            }
        }

        self.state = PollerState::Resolving;
        let live_id = match &self.target {
            LiveTarget::Live(id) => id.clone(),
            LiveTarget::Channel(channel_id) => match self.resolve(channel_id).await {
                Ok(id) => id,
                Err(error) => {
                    log::error!("Failed to resolve live stream of {channel_id}: {error}");
                    self.state = PollerState::Errored;
                    self.shared.emit(ChatEvent::Error(error.to_string()));
                    return Err(error);
                }
            },
        };

        log::info!("Polling live chat {} every {:?}", live_id, self.interval);
        self.live_id = Some(live_id.clone());
        self.shared.lock().running = true;
        self.state = PollerState::Active;
        self.shared.emit(ChatEvent::Start(live_id.clone()));
        self.timer = Some(spawn_timer(Arc::clone(&self.shared), live_id.clone(), self.interval));
        Ok(live_id)
    }

    /// Run one fetch-and-emit cycle now, outside the timer.
    pub async fn poll_once(&self) {
        if let Some(live_id) = &self.live_id {
            run_cycle(&self.shared, live_id).await;
        }
    }

    /// Cancel the timer and emit an end event.
    ///
    /// No-op when no timer is running. Once this returns, no cycle emits
    /// anything.
    pub fn stop(&mut self, reason: Option<String>) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        self.shared.lock().running = false;
        timer.abort();
        self.state = PollerState::Stopped;
        log::info!("Live chat stopped: {}", reason.as_deref().unwrap_or("no reason given"));
        self.shared.emit(ChatEvent::End(reason));
    }

    async fn resolve(&self, channel_id: &str) -> Result<String> {
        let url = format!("{CHANNEL_LIVE_URL}/{channel_id}/live");
        let response = self.shared.fetcher.get(&url, HeaderMap::new()).await?;
        if !response.status.is_success() {
            return Err(AppError::resolution(format!(
                "{url} answered {}",
                response.status.as_u16()
            )));
        }
        extract_live_id(&response.text_lossy())
            .ok_or_else(|| AppError::resolution(format!("no live stream found for channel {channel_id}")))
    }
}

impl Drop for LiveChat {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.shared.lock().running = false;
            timer.abort();
        }
    }
}

/// Stream id embedded in a channel's live page.
pub fn extract_live_id(page: &str) -> Option<String> {
    VIDEO_ID
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn feed_url(live_id: &str) -> String {
    format!("{FEED_URL}?v={live_id}&pbj=1")
}

fn spawn_timer(shared: Arc<Shared>, live_id: String, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            ticks.tick().await;
            let shared = Arc::clone(&shared);
            let live_id = live_id.clone();
            tokio::spawn(async move { run_cycle(&shared, &live_id).await });
        }
    })
}

async fn run_cycle(shared: &Shared, live_id: &str) {
    let url = feed_url(live_id);
    let response = shared.fetcher.get(&url, HeaderMap::new()).await;

    let mut cursor = shared.lock();
    if !cursor.running {
        log::debug!("Discarding chat cycle result after stop");
        return;
    }

    let comments = response
        .and_then(|response| decode_feed(&url, response))
        .and_then(|feed| parser::parse_feed(&feed, cursor.timestamp_ms));
    match comments {
        Ok(comments) => {
            if let Some(last) = comments.last() {
                cursor.timestamp_ms = last.timestamp_ms;
            }
            log::debug!("{} new chat comments from {live_id}", comments.len());
            for comment in comments {
                shared.emit(ChatEvent::Comment(comment));
            }
        }
        Err(error) => {
            log::warn!("Chat cycle for {live_id} failed: {error}");
            shared.emit(ChatEvent::Error(error.to_string()));
        }
    }
}

fn decode_feed(url: &str, response: RawResponse) -> Result<Value> {
    if !response.status.is_success() {
        return Err(AppError::Status {
            url: url.to_string(),
            status: response.status.as_u16(),
        });
    }
    Ok(serde_json::from_slice(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::parser::fixtures::{continuation, feed, text_action};
    use super::*;
    use crate::utils::http::stub::{StubFetcher, response};

    const LONG: Duration = Duration::from_secs(3600);

    fn feed_response(actions: Vec<Value>) -> RawResponse {
        response(200, &[], serde_json::to_vec(&feed(actions)).unwrap())
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn comment_ids(events: &[ChatEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ChatEvent::Comment(c) => Some(c.id.clone()),
                _ => None,
            })
            .collect()
    }

    async fn started(stub: &Arc<StubFetcher>, cursor: i64) -> (LiveChat, mpsc::UnboundedReceiver<ChatEvent>) {
        let (chat, mut receiver) = LiveChat::new(LiveTarget::Live("abc123".into()), stub.clone());
        let mut chat = chat.with_interval(LONG).with_cursor(cursor);
        assert_eq!(chat.start().await.unwrap(), "abc123");
        assert_eq!(receiver.try_recv().unwrap(), ChatEvent::Start("abc123".into()));
        (chat, receiver)
    }

    #[test]
    fn test_extract_live_id() {
        let escaped = r#"...\"videoId\":\"dQw4w9WgXcQ\",\"title\"..."#;
        assert_eq!(extract_live_id(escaped).as_deref(), Some("dQw4w9WgXcQ"));
        let plain = r#"{"videoId":"a-B_c1","x":1}"#;
        assert_eq!(extract_live_id(plain).as_deref(), Some("a-B_c1"));
        assert_eq!(extract_live_id("<html>offline</html>"), None);
    }

    #[test]
    fn test_feed_url() {
        assert_eq!(feed_url("abc"), "https://www.youtube.com/live_chat?v=abc&pbj=1");
    }

    #[test]
    fn test_from_config_prefers_live_id() {
        let config = ChatConfig {
            channel_id: Some("UCchannel".into()),
            live_id: Some("stream".into()),
            interval_ms: 250,
        };
        let (chat, _rx) = LiveChat::from_config(&config, Arc::new(StubFetcher::new())).unwrap();
        assert_eq!(chat.target(), &LiveTarget::Live("stream".into()));
        assert_eq!(chat.interval, Duration::from_millis(250));

        let empty = ChatConfig::default();
        assert!(LiveChat::from_config(&empty, Arc::new(StubFetcher::new())).is_err());
    }

    #[tokio::test]
    async fn test_resolves_channel_live_page() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(response(200, &[], r#"<script>var x = "{\"videoId\":\"live42\"}";</script>"#));

        let (chat, mut receiver) = LiveChat::new(LiveTarget::Channel("UCxyz".into()), stub.clone());
        let mut chat = chat.with_interval(LONG);
        assert_eq!(chat.state(), PollerState::Idle);

        assert_eq!(chat.start().await.unwrap(), "live42");
        assert_eq!(chat.state(), PollerState::Active);
        assert_eq!(chat.live_id(), Some("live42"));
        assert_eq!(stub.requests()[0].0, "https://www.youtube.com/channel/UCxyz/live");
        assert_eq!(receiver.try_recv().unwrap(), ChatEvent::Start("live42".into()));
        chat.stop(None);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_errored() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(response(200, &[], "<html>not live</html>"));

        let (mut chat, mut receiver) = LiveChat::new(LiveTarget::Channel("UCxyz".into()), stub.clone());
        let result = chat.start().await;

        assert!(matches!(result, Err(AppError::Resolution(_))));
        assert_eq!(chat.state(), PollerState::Errored);
        assert!(matches!(receiver.try_recv().unwrap(), ChatEvent::Error(_)));
        assert!(chat.timer.is_none());
    }

    #[tokio::test]
    async fn test_cycle_emits_new_comments_and_advances_cursor() {
        let stub = Arc::new(StubFetcher::new());
        let (mut chat, mut receiver) = started(&stub, 1_000).await;

        stub.push(feed_response(vec![
            text_action("old", 900_000, "seen"),
            text_action("a", 2_000_000, "x"),
            text_action("b", 3_000_000, "y"),
            continuation(),
        ]));
        chat.poll_once().await;

        assert_eq!(comment_ids(&drain(&mut receiver)), vec!["a", "b"]);
        assert_eq!(chat.cursor(), 3_000);
        assert_eq!(stub.requests()[0].0, feed_url("abc123"));
        chat.stop(None);
    }

    #[tokio::test]
    async fn test_second_cycle_with_only_old_items_emits_nothing() {
        let stub = Arc::new(StubFetcher::new());
        let (mut chat, mut receiver) = started(&stub, 1_000).await;

        stub.push(feed_response(vec![text_action("a", 5_000_000, "x"), continuation()]));
        chat.poll_once().await;
        assert_eq!(comment_ids(&drain(&mut receiver)), vec!["a"]);
        assert_eq!(chat.cursor(), 5_000);

        stub.push(feed_response(vec![
            text_action("a", 5_000_000, "x"),
            text_action("z", 4_000_000, "older"),
            continuation(),
        ]));
        chat.poll_once().await;
        assert!(drain(&mut receiver).is_empty());
        assert_eq!(chat.cursor(), 5_000);
        chat.stop(None);
    }

    #[tokio::test]
    async fn test_equal_timestamps_within_and_across_cycles() {
        let stub = Arc::new(StubFetcher::new());
        let (mut chat, mut receiver) = started(&stub, 1_000).await;

        stub.push(feed_response(vec![
            text_action("a", 7_000_000, "x"),
            text_action("b", 7_000_000, "y"),
            continuation(),
        ]));
        chat.poll_once().await;
        assert_eq!(comment_ids(&drain(&mut receiver)), vec!["a", "b"]);

        stub.push(feed_response(vec![
            text_action("c", 7_000_000, "same ms as cursor"),
            text_action("d", 7_001_000, "newer"),
            continuation(),
        ]));
        chat.poll_once().await;
        assert_eq!(comment_ids(&drain(&mut receiver)), vec!["d"]);
        assert_eq!(chat.cursor(), 7_001);
        chat.stop(None);
    }

    #[tokio::test]
    async fn test_failed_cycle_emits_error_and_stays_active() {
        let stub = Arc::new(StubFetcher::new());
        let (mut chat, mut receiver) = started(&stub, 1_000).await;

        stub.push(response(200, &[], "not json"));
        chat.poll_once().await;
        // Nothing queued: transport-style failure.
        chat.poll_once().await;

        let events = drain(&mut receiver);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, ChatEvent::Error(_))));
        assert_eq!(chat.state(), PollerState::Active);
        assert_eq!(chat.cursor(), 1_000);

        stub.push(feed_response(vec![text_action("a", 2_000_000, "back"), continuation()]));
        chat.poll_once().await;
        assert_eq!(comment_ids(&drain(&mut receiver)), vec!["a"]);
        chat.stop(None);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_silences_cycles() {
        let stub = Arc::new(StubFetcher::new());
        let (mut chat, mut receiver) = started(&stub, 1_000).await;

        chat.stop(Some("done".into()));
        assert_eq!(chat.state(), PollerState::Stopped);
        assert_eq!(drain(&mut receiver), vec![ChatEvent::End(Some("done".into()))]);

        chat.stop(Some("again".into()));
        stub.push(feed_response(vec![text_action("a", 9_000_000, "late"), continuation()]));
        chat.poll_once().await;
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let (mut chat, mut receiver) = LiveChat::new(LiveTarget::Live("x".into()), Arc::new(StubFetcher::new()));
        chat.stop(None);
        assert_eq!(chat.state(), PollerState::Idle);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_timer_drives_cycles_until_stopped() {
        let stub = Arc::new(StubFetcher::new());
        stub.push(feed_response(vec![text_action("a", 2_000_000, "tick"), continuation()]));

        let (chat, mut receiver) = LiveChat::new(LiveTarget::Live("abc123".into()), stub.clone());
        let mut chat = chat.with_interval(Duration::from_millis(10)).with_cursor(1_000);
        chat.start().await.unwrap();
        assert_eq!(receiver.recv().await, Some(ChatEvent::Start("abc123".into())));

        let first = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(first, ChatEvent::Comment(ref c) if c.id == "a"));

        // Later ticks find nothing queued and report errors.
        let second = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(second, ChatEvent::Error(_)));

        chat.stop(Some("bye".into()));
        let mut rest = drain(&mut receiver);
        assert_eq!(rest.pop(), Some(ChatEvent::End(Some("bye".into()))));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(drain(&mut receiver).is_empty());
    }
}
