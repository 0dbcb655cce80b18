//! Seams between the core and the outside world.
//!
//! The poller, reconciler and dispatchers only ever see these traits.  The
//! binary wires in the Twitch client, streamlink, a media player, a desktop
//! notifier, the system clipboard and the headless menu; the integration
//! tests wire in recording fakes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clip_proto::protocol::{ChannelId, LiveStream};
use tokio::sync::mpsc;

use crate::error::{ApiError, ClipboardError, NotifyError, PlayerError, ResolveError};

/// "List live followed channels".
#[async_trait]
pub trait LiveChannels: Send + Sync {
    async fn live_followed(&self) -> Result<Vec<LiveStream>, ApiError>;
}

/// Channel avatar bytes.  Implementations cache; callers may ask repeatedly.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    async fn avatar(&self, id: &ChannelId) -> Result<Vec<u8>, ApiError>;
}

/// Turns a channel identity into a URL a media player can open.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, id: &ChannelId, timeout: Duration) -> Result<String, ResolveError>;
}

/// Opens a URL in a local player.  Resolves once the player exits.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    fn name(&self) -> &str;

    async fn launch(&self, url: &str, title: &str) -> Result<(), PlayerError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        display_name: &str,
        category: &str,
        id: &ChannelId,
    ) -> Result<(), NotifyError>;

    /// Stop the notification service.  Called once, last, on shutdown.
    async fn close(&self) -> Result<(), NotifyError>;
}

/// Synchronous, like the OS clipboard APIs it wraps.  Only the clipboard
/// sink calls it, from a blocking task.
pub trait ClipboardWriter: Send + Sync {
    fn write(&self, text: &str) -> Result<(), ClipboardError>;
}

/// One entry of the menu.
pub trait MenuItem: Send + Sync {
    fn show(&self);
    fn hide(&self);
    fn set_title(&self, title: &str);
    fn set_tooltip(&self, tooltip: &str);
    fn set_icon(&self, icon: Vec<u8>);
    fn disable(&self);
    /// Sender feeding this entry's click stream.  Used to synthesize clicks.
    fn click_sender(&self) -> mpsc::Sender<()>;
}

/// Handle returned when an entry is added: the entry itself plus the stream
/// of click events, which belongs to exactly one consumer.
pub struct MenuEntry {
    pub item: Arc<dyn MenuItem>,
    pub clicks: mpsc::Receiver<()>,
}

pub trait Menu: Send + Sync {
    fn add_item(&self, title: &str, tooltip: &str) -> MenuEntry;
}

/// All external collaborators, constructed once by the binary and handed to
/// the lifecycle controller.
#[derive(Clone)]
pub struct Services {
    pub channels: Arc<dyn LiveChannels>,
    pub avatars: Arc<dyn AvatarSource>,
    pub resolver: Arc<dyn LinkResolver>,
    pub player: Arc<dyn MediaPlayer>,
    pub notifier: Arc<dyn Notifier>,
    pub clipboard: Arc<dyn ClipboardWriter>,
    pub menu: Arc<dyn Menu>,
}
