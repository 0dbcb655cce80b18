//! Action dispatcher: one long-lived task per stream item.
//!
//! On click: resolve the channel to a playable URL, hand the URL to the
//! clipboard sink, then run the player until it exits.  A click is handled
//! to completion before the next one is received, so overlapping launches
//! for the same channel are serialised.  Failures are logged and the task
//! goes back to waiting; only cancellation (or the click stream closing)
//! ends it.

use std::sync::Arc;
use std::time::Duration;

use clip_proto::protocol::ChannelId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::capability::{LinkResolver, MediaPlayer};
use crate::clipboard::ClipboardSender;

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// What every dispatcher needs, shared across items.
#[derive(Clone)]
pub struct ActionContext {
    pub resolver: Arc<dyn LinkResolver>,
    pub player: Arc<dyn MediaPlayer>,
    pub clipboard: ClipboardSender,
    pub resolve_timeout: Duration,
}

/// Outcome of one click, logged when the click finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClickOutcome {
    Played,
    ResolveFailed,
    PlayerFailed,
}

pub struct ActionDispatcher {
    id: ChannelId,
    ctx: ActionContext,
}

impl ActionDispatcher {
    pub fn new(id: ChannelId, ctx: ActionContext) -> Self {
        Self { id, ctx }
    }

    pub async fn run(self, mut clicks: mpsc::Receiver<()>, cancel: CancellationToken) {
        debug!("starting click routine for [{}]", self.id);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: click [{}]", self.id);
                    return;
                }
                click = clicks.recv() => {
                    if click.is_none() {
                        debug!("click stream closed for [{}]", self.id);
                        return;
                    }
                }
            }

            debug!("[{}] item is clicked", self.id);
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel during click: [{}]", self.id);
                    return;
                }
                outcome = self.handle_click() => {
                    debug!("[{}] click finished: {:?}", self.id, outcome);
                }
            }
        }
    }

    async fn handle_click(&self) -> ClickOutcome {
        let url = match self
            .ctx
            .resolver
            .resolve(&self.id, self.ctx.resolve_timeout)
            .await
        {
            Ok(raw) => raw.trim().to_string(),
            Err(e) => {
                error!("[{}] cannot resolve stream link: {}", self.id, e);
                return ClickOutcome::ResolveFailed;
            }
        };
        if url.is_empty() {
            error!("[{}] resolver returned an empty link", self.id);
            return ClickOutcome::ResolveFailed;
        }

        if self.ctx.clipboard.send(url.clone()).await.is_err() {
            warn!("[{}] clipboard sink is gone, link not copied", self.id);
        }

        info!("opening [{}] with {}", self.id, self.ctx.player.name());
        match self.ctx.player.launch(&url, self.id.as_str()).await {
            Ok(()) => ClickOutcome::Played,
            Err(e) => {
                error!(
                    "[{}] cannot run {} ({}), received output: {}",
                    self.id,
                    self.ctx.player.name(),
                    e,
                    e.output().unwrap_or_default()
                );
                ClickOutcome::PlayerFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::clipboard::clipboard_queue;
    use crate::error::{PlayerError, ResolveError};

    /// Each resolve waits for one permit from the gate.
    struct Gated {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LinkResolver for Gated {
        async fn resolve(&self, id: &ChannelId, _: Duration) -> Result<String, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let permit = self.gate.acquire().await.map_err(|_| ResolveError::Empty)?;
            permit.forget();
            Ok(format!("https://cdn.example/{}.m3u8\n", id))
        }
    }

    #[derive(Default)]
    struct Player {
        launches: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaPlayer for Player {
        fn name(&self) -> &str {
            "test"
        }

        async fn launch(&self, url: &str, _: &str) -> Result<(), PlayerError> {
            self.launches.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    async fn settle<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_one_click_at_a_time() {
        let resolver = Arc::new(Gated {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        });
        let player = Arc::new(Player::default());
        let (clip_tx, mut clip_rx) = clipboard_queue();
        tokio::spawn(async move { while clip_rx.recv().await.is_some() {} });

        let ctx = ActionContext {
            resolver: resolver.clone(),
            player: player.clone(),
            clipboard: clip_tx,
            resolve_timeout: Duration::from_secs(1),
        };
        let (clicks, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            ActionDispatcher::new(ChannelId::new("alice"), ctx).run(rx, cancel.clone()),
        );

        assert!(clicks.try_send(()).is_ok());
        settle(|| resolver.calls.load(Ordering::SeqCst) == 1).await;
        // First click in flight, second parked, third has nowhere to go.
        assert!(clicks.try_send(()).is_ok());
        assert!(clicks.try_send(()).is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

        resolver.gate.add_permits(1);
        settle(|| resolver.calls.load(Ordering::SeqCst) == 2).await;
        assert_eq!(player.launches.lock().unwrap().len(), 1);

        resolver.gate.add_permits(1);
        settle(|| player.launches.lock().unwrap().len() == 2).await;
        assert_eq!(
            player.launches.lock().unwrap()[0],
            "https://cdn.example/alice.m3u8"
        );

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
