//! Poller: periodic "live followed channels" fetch feeding the relay.
//!
//! Fires immediately, then every `interval`.  A successful fetch is pushed
//! into the capacity-1 relay; the send blocks until the reconciler has taken
//! the previous list, so the refresh cadence follows the consumer.  A failed
//! fetch is logged and the cycle skipped.

use std::sync::Arc;
use std::time::Duration;

use clip_proto::protocol::LiveStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::capability::LiveChannels;

/// Sending half of the single-slot relay between poller and reconciler.
pub type RelaySender = mpsc::Sender<Vec<LiveStream>>;
pub type RelayReceiver = mpsc::Receiver<Vec<LiveStream>>;

pub fn relay() -> (RelaySender, RelayReceiver) {
    mpsc::channel(1)
}

pub struct Poller {
    channels: Arc<dyn LiveChannels>,
    interval: Duration,
}

impl Poller {
    pub fn new(channels: Arc<dyn LiveChannels>, interval: Duration) -> Self {
        Self { channels, interval }
    }

    pub async fn run(self, out: RelaySender, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        // No catch-up burst after a slow consumer.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: poller");
                    return;
                }
                _ = ticker.tick() => {}
            }

            debug!("refreshing followed streams infos");
            let fetched = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: poller");
                    return;
                }
                res = self.channels.live_followed() => res,
            };

            let streams = match fetched {
                Ok(streams) => streams,
                Err(e) => {
                    error!("unable to list followed streams: {}", e);
                    continue;
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: poller");
                    return;
                }
                sent = out.send(streams) => {
                    if sent.is_err() {
                        debug!("relay closed, poller exiting");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::ApiError;

    /// Returns a one-channel list named after the call number: c0, c1, ...
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LiveChannels for Counting {
        async fn live_followed(&self) -> Result<Vec<LiveStream>, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![LiveStream::new(format!("c{}", n), "", "", "")])
        }
    }

    #[tokio::test]
    async fn test_relay_blocks_while_full_and_keeps_order() {
        let channels = Arc::new(Counting::default());
        let (tx, mut rx) = relay();
        let cancel = CancellationToken::new();
        let poller = Poller::new(channels.clone(), Duration::from_millis(5));
        let handle = tokio::spawn(poller.run(tx, cancel.clone()));

        // One list parked in the slot, the next one waiting on send.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(channels.calls.load(Ordering::SeqCst), 2);

        let mut seen = Vec::new();
        for _ in 0..5 {
            let list = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(list[0].id.to_string());
        }
        assert_eq!(seen, vec!["c0", "c1", "c2", "c3", "c4"]);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_poller_exits_when_relay_closes() {
        let (tx, rx) = relay();
        drop(rx);
        let poller = Poller::new(Arc::new(Counting::default()), Duration::from_millis(5));
        tokio::time::timeout(Duration::from_secs(2), poller.run(tx, CancellationToken::new()))
            .await
            .unwrap();
    }
}
