//! StreamItem: menu entry + visibility state for one followed channel.
//!
//! Two states, `Hidden` and `Visible`, created `Visible`.  `show()` and
//! `hide()` are idempotent and serialised on the item's own lock, so the
//! reconciler's parallel visibility pass and a late `refresh()` never race.
//! Only `Hidden -> Visible` notifies.

use std::sync::Arc;

use clip_proto::protocol::{display_name_or_id, menu_title, ChannelId, LiveStream, StreamEntry};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::capability::{MenuItem, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

impl Visibility {
    pub fn from_live(live: bool) -> Self {
        if live {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    /// The transition needed to reach `target`, or `None` when already there.
    pub fn transition_to(self, target: Visibility) -> Option<Transition> {
        match (self, target) {
            (Visibility::Hidden, Visibility::Visible) => Some(Transition::Reveal),
            (Visibility::Visible, Visibility::Hidden) => Some(Transition::Conceal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Reveal,
    Conceal,
}

#[derive(Debug)]
struct ItemState {
    visibility: Visibility,
    display_name: String,
    category: String,
}

pub struct StreamItem {
    id: ChannelId,
    menu_item: Arc<dyn MenuItem>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<ItemState>,
}

impl StreamItem {
    /// Wrap a freshly added menu entry.  The entry is assumed to be shown
    /// already, which is how menus add items.
    pub fn new(stream: &LiveStream, menu_item: Arc<dyn MenuItem>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            id: stream.id.clone(),
            menu_item,
            notifier,
            state: Mutex::new(ItemState {
                visibility: Visibility::Visible,
                display_name: stream.display_name.clone(),
                category: stream.category.clone(),
            }),
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn menu_item(&self) -> &Arc<dyn MenuItem> {
        &self.menu_item
    }

    pub async fn visibility(&self) -> Visibility {
        self.state.lock().await.visibility
    }

    pub async fn is_visible(&self) -> bool {
        self.visibility().await == Visibility::Visible
    }

    /// Display name with the identity fallback applied.
    pub async fn display_name(&self) -> String {
        let state = self.state.lock().await;
        display_name_or_id(&state.display_name, &self.id).to_string()
    }

    pub async fn entry(&self) -> StreamEntry {
        let state = self.state.lock().await;
        StreamEntry {
            id: self.id.clone(),
            display_name: display_name_or_id(&state.display_name, &self.id).to_string(),
            category: state.category.clone(),
            visible: state.visibility == Visibility::Visible,
        }
    }

    /// Notify that this channel went live.  Used once at creation; later
    /// announcements come from `show()`.
    pub async fn announce(&self) {
        let state = self.state.lock().await;
        self.notify_locked(&state).await;
    }

    /// Hidden -> Visible.  Returns true if the state changed.
    pub async fn show(&self) -> bool {
        self.set_visibility(Visibility::Visible).await
    }

    /// Visible -> Hidden.  Returns true if the state changed.
    pub async fn hide(&self) -> bool {
        self.set_visibility(Visibility::Hidden).await
    }

    pub async fn set_visible(&self, visible: bool) -> bool {
        self.set_visibility(Visibility::from_live(visible)).await
    }

    async fn set_visibility(&self, target: Visibility) -> bool {
        let mut state = self.state.lock().await;
        let Some(transition) = state.visibility.transition_to(target) else {
            return false;
        };

        match transition {
            Transition::Reveal => {
                debug!(channel = %self.id, "showing item");
                self.menu_item.show();
                state.visibility = Visibility::Visible;
                self.notify_locked(&state).await;
            }
            Transition::Conceal => {
                debug!(channel = %self.id, "hiding item");
                self.menu_item.hide();
                state.visibility = Visibility::Hidden;
            }
        }
        true
    }

    /// Overwrite display text from a newer snapshot, whatever the state.
    pub async fn refresh(&self, stream: &LiveStream) {
        let mut state = self.state.lock().await;
        state.display_name = stream.display_name.clone();
        state.category = stream.category.clone();

        let name = display_name_or_id(&state.display_name, &self.id);
        self.menu_item.set_title(&menu_title(name, &state.category));
        self.menu_item.set_tooltip(&stream.title);
    }

    /// Synthesize a click on this entry's click stream.  Returns false if a
    /// click is already pending or the dispatcher is gone.
    pub fn click(&self) -> bool {
        match self.menu_item.click_sender().try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!(channel = %self.id, "click ignored: previous click still pending");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!(channel = %self.id, "click ignored: dispatcher has exited");
                false
            }
        }
    }

    async fn notify_locked(&self, state: &ItemState) {
        let name = display_name_or_id(&state.display_name, &self.id);
        if let Err(e) = self.notifier.notify(name, &state.category, &self.id).await {
            error!("fail to notify for [{}]: {}", self.id, e);
        }
    }
}
