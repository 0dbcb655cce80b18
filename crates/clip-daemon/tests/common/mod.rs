#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clip_daemon::capability::{
    AvatarSource, ClipboardWriter, LinkResolver, LiveChannels, MediaPlayer, Notifier, Services,
};
use clip_daemon::error::{ApiError, ClipboardError, NotifyError, PlayerError, ResolveError};
use clip_daemon::menu::HeadlessMenu;
use clip_proto::protocol::{ChannelId, LiveStream};

pub fn live(id: &str, name: &str, game: &str) -> LiveStream {
    LiveStream::new(id, name, game, format!("{} stream", id))
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

// ── channels ──────────────────────────────────────────────────────────────────

/// Serves queued lists in order, then keeps returning the last one.
#[derive(Default)]
pub struct ScriptedChannels {
    queue: Mutex<VecDeque<Result<Vec<LiveStream>, String>>>,
    last: Mutex<Vec<LiveStream>>,
    calls: AtomicUsize,
}

impl ScriptedChannels {
    pub fn push(&self, streams: Vec<LiveStream>) {
        self.queue.lock().unwrap().push_back(Ok(streams));
    }

    pub fn push_error(&self, message: &str) {
        self.queue.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveChannels for ScriptedChannels {
    async fn live_followed(&self) -> Result<Vec<LiveStream>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(streams)) => {
                *self.last.lock().unwrap() = streams.clone();
                Ok(streams)
            }
            Some(Err(message)) => Err(ApiError::Status {
                status: 500,
                body: message,
            }),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

// ── avatars ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StaticAvatars {
    pub requests: Mutex<Vec<ChannelId>>,
}

#[async_trait]
impl AvatarSource for StaticAvatars {
    async fn avatar(&self, id: &ChannelId) -> Result<Vec<u8>, ApiError> {
        self.requests.lock().unwrap().push(id.clone());
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

// ── resolver ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeResolver {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    /// When set, `resolve` never returns (until cancelled by the caller).
    pub hang: AtomicBool,
}

impl FakeResolver {
    pub fn url_for(id: &ChannelId) -> String {
        format!("https://cdn.example/{}.m3u8", id)
    }
}

#[async_trait]
impl LinkResolver for FakeResolver {
    async fn resolve(&self, id: &ChannelId, _timeout: Duration) -> Result<String, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolveError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "error: No playable streams found".to_string(),
            });
        }
        // Padded on purpose: the dispatcher trims.
        Ok(format!("  {}\n", Self::url_for(id)))
    }
}

// ── player ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingPlayer {
    pub launches: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingPlayer {
    pub fn launches(&self) -> Vec<(String, String)> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaPlayer for RecordingPlayer {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn launch(&self, url: &str, title: &str) -> Result<(), PlayerError> {
        self.launches
            .lock()
            .unwrap()
            .push((url.to_string(), title.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlayerError::Failed {
                player: "recorder".to_string(),
                status: "exit status: 2".to_string(),
                output: "cannot open display".to_string(),
            });
        }
        Ok(())
    }
}

// ── notifier ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, ChannelId)>>,
    pub fail: AtomicBool,
    pub closed: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String, ChannelId)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        display_name: &str,
        category: &str,
        id: &ChannelId,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((
            display_name.to_string(),
            category.to_string(),
            id.clone(),
        ));
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Unsupported("test".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── clipboard ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingClipboard {
    pub writes: Mutex<Vec<String>>,
}

impl RecordingClipboard {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl ClipboardWriter for RecordingClipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// ── wiring ────────────────────────────────────────────────────────────────────

/// Every fake, kept so tests can inspect what the core did.
#[derive(Clone)]
pub struct Fakes {
    pub channels: Arc<ScriptedChannels>,
    pub avatars: Arc<StaticAvatars>,
    pub resolver: Arc<FakeResolver>,
    pub player: Arc<RecordingPlayer>,
    pub notifier: Arc<RecordingNotifier>,
    pub clipboard: Arc<RecordingClipboard>,
    pub menu: HeadlessMenu,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(ScriptedChannels::default()),
            avatars: Arc::new(StaticAvatars::default()),
            resolver: Arc::new(FakeResolver::default()),
            player: Arc::new(RecordingPlayer::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            clipboard: Arc::new(RecordingClipboard::default()),
            menu: HeadlessMenu::new(),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            channels: self.channels.clone(),
            avatars: self.avatars.clone(),
            resolver: self.resolver.clone(),
            player: self.player.clone(),
            notifier: self.notifier.clone(),
            clipboard: self.clipboard.clone(),
            menu: Arc::new(self.menu.clone()),
        }
    }
}
