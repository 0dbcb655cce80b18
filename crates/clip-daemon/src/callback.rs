//! Notification callback router.
//!
//! The notifier's click transport (notify-send action, `/notification` HTTP
//! endpoint) delivers channel identities here.  A known identity gets a
//! synthesized click on its menu entry, so it goes through the same
//! dispatcher as a direct click.  An unknown identity is a lookup miss: the
//! item may simply have expired.

use clip_proto::protocol::ChannelId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::registry::Registry;

pub type CallbackSender = mpsc::Sender<ChannelId>;
pub type CallbackReceiver = mpsc::Receiver<ChannelId>;

pub fn callback_channel() -> (CallbackSender, CallbackReceiver) {
    mpsc::channel(8)
}

pub struct CallbackRouter {
    registry: Registry,
}

impl CallbackRouter {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub async fn run(self, mut inbound: CallbackReceiver, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: notification callback router");
                    return;
                }
                id = inbound.recv() => match id {
                    Some(id) => {
                        self.route(&id).await;
                    }
                    None => {
                        debug!("notification callback channel closed");
                        return;
                    }
                }
            }
        }
    }

    /// Returns true if a click was delivered.
    pub async fn route(&self, id: &ChannelId) -> bool {
        trace!("received notification callback [{}]", id);
        match self.registry.get(id).await {
            Some(item) => item.click(),
            None => {
                warn!("received notification callback for non-existent stream [{}]", id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use clip_proto::protocol::LiveStream;

    use crate::capability::Menu;
    use crate::item::StreamItem;
    use crate::menu::HeadlessMenu;
    use crate::notifier::DisabledNotifier;

    #[tokio::test]
    async fn test_router_delivers_known_ids_and_exits_when_closed() {
        let registry = Registry::new();
        let menu = HeadlessMenu::new();
        let mut entry = menu.add_item("alice", "");
        let stream = LiveStream::new("alice", "Alice", "Chess", "");
        let item = Arc::new(StreamItem::new(&stream, entry.item, Arc::new(DisabledNotifier)));
        assert!(registry.insert(item).await);

        let (tx, rx) = callback_channel();
        let router = tokio::spawn(CallbackRouter::new(registry).run(rx, CancellationToken::new()));

        tx.send(ChannelId::new("ghost")).await.unwrap();
        tx.send(ChannelId::new("ALICE")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), entry.clicks.recv())
            .await
            .unwrap()
            .unwrap();

        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), router)
            .await
            .unwrap()
            .unwrap();
    }
}
