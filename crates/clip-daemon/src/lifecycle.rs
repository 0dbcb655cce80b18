//! Lifecycle controller: owns the cancellation signal and the start/stop
//! ordering of every core task.
//!
//! ```text
//!   start():    clipboard sink ─┐
//!               callback router ├─ share one CancellationToken
//!               reconciler ─────┤    (dispatchers + avatar fetches are
//!               poller ─────────┘     spawned later by the reconciler)
//!
//!   shutdown(): cancel → join workers (poller, reconciler, dispatchers,
//!               router, avatar fetches) → join clipboard sink → close notifier
//! ```
//!
//! The reconciler hides every entry it added before it returns, so a later
//! `start()` on the same menu begins from a clean slate.
//!
//! The clipboard queue only closes once its last sender is dropped, i.e. once
//! the reconciler and every dispatcher have returned, so nothing ever sends
//! into a closed queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::callback::{CallbackReceiver, CallbackRouter};
use crate::capability::{Notifier, Services};
use crate::clipboard::{clipboard_queue, ClipboardSink};
use crate::dispatcher::{ActionContext, DEFAULT_RESOLVE_TIMEOUT};
use crate::poller::{relay, Poller};
use crate::reconciler::Reconciler;
use crate::registry::Registry;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub poll_interval: Duration,
    pub resolve_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

pub struct Lifecycle {
    cancel: CancellationToken,
    workers: TaskTracker,
    clipboard_sink: JoinHandle<()>,
    registry: Registry,
    notifier: Arc<dyn Notifier>,
}

impl Lifecycle {
    /// Spawn every core task.  Must be called from within a tokio runtime.
    pub fn start(services: Services, settings: RunSettings, callbacks: CallbackReceiver) -> Self {
        let cancel = CancellationToken::new();
        let workers = TaskTracker::new();
        let registry = Registry::new();

        let (relay_tx, relay_rx) = relay();
        let (clip_tx, clip_rx) = clipboard_queue();

        let clipboard_sink = tokio::spawn(
            ClipboardSink::new(Arc::clone(&services.clipboard)).run(clip_rx, cancel.clone()),
        );

        workers.spawn(CallbackRouter::new(registry.clone()).run(callbacks, cancel.clone()));

        let actions = ActionContext {
            resolver: Arc::clone(&services.resolver),
            player: Arc::clone(&services.player),
            clipboard: clip_tx,
            resolve_timeout: settings.resolve_timeout,
        };
        let reconciler = Reconciler::new(
            registry.clone(),
            Arc::clone(&services.menu),
            Arc::clone(&services.notifier),
            Arc::clone(&services.avatars),
            actions,
            workers.clone(),
            cancel.clone(),
        );
        workers.spawn(reconciler.run(relay_rx));

        let poller = Poller::new(Arc::clone(&services.channels), settings.poll_interval);
        workers.spawn(poller.run(relay_tx, cancel.clone()));

        info!(
            "core started, refreshing every {:?}",
            settings.poll_interval
        );

        Self {
            cancel,
            workers,
            clipboard_sink,
            registry,
            notifier: services.notifier,
        }
    }

    /// The process-wide cancellation signal, for collaborators that run their
    /// own long-lived tasks (HTTP server, notifier action waits).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Number of core tasks still running, clipboard sink excluded.
    pub fn running_tasks(&self) -> usize {
        self.workers.len()
    }

    /// Cancel everything and wait for it, in order.  Returns false if some
    /// task did not finish within `grace`.
    pub async fn shutdown(self, grace: Duration) -> bool {
        info!("shutting down");
        self.cancel.cancel();
        self.workers.close();

        let mut clean = true;
        if tokio::time::timeout(grace, self.workers.wait()).await.is_err() {
            warn!(
                "{} task(s) still running after {:?}",
                self.workers.len(),
                grace
            );
            clean = false;
        }

        match tokio::time::timeout(grace, self.clipboard_sink).await {
            Ok(Ok(())) => debug!("clipboard sink stopped"),
            Ok(Err(e)) => {
                error!("clipboard sink panicked: {}", e);
                clean = false;
            }
            Err(_) => {
                warn!("clipboard sink still running after {:?}", grace);
                clean = false;
            }
        }

        if let Err(e) = self.notifier.close().await {
            error!("fail to stop notification service: {}", e);
        }
        clean
    }
}
