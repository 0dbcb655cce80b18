//! Reconciler: single owner of the item registry's key set.
//!
//! Receives live-channel lists from the relay one at a time.  Per list:
//!
//! ```text
//!   for each stream ──┬── unknown id → add menu entry, spawn dispatcher +
//!                     │                avatar fetch, notify once
//!                     └── known id   → refresh title/tooltip, no notify
//!   then, in parallel for every item:
//!                     visible := id ∈ list   (Hidden→Visible notifies)
//!   then the "No active stream" placeholder := list is empty
//! ```
//!
//! The parallel visibility pass is joined before the next relay receive, so
//! every cycle starts from a consistent view.

use std::collections::HashSet;
use std::sync::Arc;

use clip_proto::protocol::{menu_title, ChannelId, LiveStream};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace};

use crate::capability::{AvatarSource, Menu, MenuItem, Notifier};
use crate::dispatcher::{ActionContext, ActionDispatcher};
use crate::item::StreamItem;
use crate::poller::RelayReceiver;
use crate::registry::Registry;

pub const NO_ACTIVE_STREAM: &str = "No active stream";

/// What one reconciliation pass did.  Used for logging and by tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<ChannelId>,
    pub refreshed: usize,
    pub shown: usize,
    pub hidden: usize,
}

pub struct Reconciler {
    registry: Registry,
    menu: Arc<dyn Menu>,
    notifier: Arc<dyn Notifier>,
    avatars: Arc<dyn AvatarSource>,
    actions: ActionContext,
    tasks: TaskTracker,
    cancel: CancellationToken,
    placeholder: Arc<dyn MenuItem>,
    placeholder_visible: bool,
}

impl Reconciler {
    /// Adds the always-present placeholder entry to the menu.  It starts
    /// visible, is disabled, and never gets a dispatcher.
    pub fn new(
        registry: Registry,
        menu: Arc<dyn Menu>,
        notifier: Arc<dyn Notifier>,
        avatars: Arc<dyn AvatarSource>,
        actions: ActionContext,
        tasks: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        let placeholder = menu.add_item(NO_ACTIVE_STREAM, NO_ACTIVE_STREAM).item;
        placeholder.disable();

        Self {
            registry,
            menu,
            notifier,
            avatars,
            actions,
            tasks,
            cancel,
            placeholder,
            placeholder_visible: true,
        }
    }

    pub fn placeholder_visible(&self) -> bool {
        self.placeholder_visible
    }

    pub async fn run(mut self, mut relay: RelayReceiver) {
        loop {
            let streams = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("received cancel: reconciler");
                    break;
                }
                streams = relay.recv() => match streams {
                    Some(streams) => streams,
                    None => {
                        debug!("relay closed, reconciler exiting");
                        break;
                    }
                }
            };

            let report = self.apply(&streams).await;
            trace!(
                created = report.created.len(),
                refreshed = report.refreshed,
                shown = report.shown,
                hidden = report.hidden,
                "reconciled"
            );
        }
        self.retire().await;
    }

    /// Hide every entry this run added, placeholder included.  Their
    /// dispatchers are gone, and a later run may reuse the same menu.
    pub async fn retire(&mut self) {
        for item in self.registry.items().await {
            item.hide().await;
        }
        self.set_placeholder_visible(false);
    }

    /// Reconcile the registry against one live-channel list.
    pub async fn apply(&mut self, streams: &[LiveStream]) -> ReconcileReport {
        debug!(
            "refreshing menu items for {} active followed streams",
            streams.len()
        );
        let mut report = ReconcileReport::default();

        // Registry mutation happens-before the visibility pass.
        for stream in streams {
            match self.registry.get(&stream.id).await {
                Some(item) => {
                    item.refresh(stream).await;
                    report.refreshed += 1;
                }
                None => {
                    self.create_item(stream).await;
                    report.created.push(stream.id.clone());
                }
            }
        }

        let live: HashSet<&ChannelId> = streams.iter().map(|s| &s.id).collect();
        let items = self.registry.items().await;
        let changes = join_all(items.iter().map(|item| {
            let visible = live.contains(item.id());
            async move { (visible, item.set_visible(visible).await) }
        }))
        .await;
        for (visible, changed) in changes {
            match (visible, changed) {
                (true, true) => report.shown += 1,
                (false, true) => report.hidden += 1,
                _ => {}
            }
        }

        self.set_placeholder_visible(streams.is_empty());
        report
    }

    fn set_placeholder_visible(&mut self, visible: bool) {
        if self.placeholder_visible == visible {
            return;
        }
        if visible {
            self.placeholder.show();
        } else {
            self.placeholder.hide();
        }
        self.placeholder_visible = visible;
    }

    async fn create_item(&self, stream: &LiveStream) {
        debug!(
            login = %stream.id,
            username = %stream.display_name,
            game = %stream.category,
            "new active stream detected [{}]",
            stream.id
        );

        let title = menu_title(stream.name_or_id(), &stream.category);
        let entry = self.menu.add_item(&title, &stream.title);
        let item = Arc::new(StreamItem::new(
            stream,
            Arc::clone(&entry.item),
            Arc::clone(&self.notifier),
        ));

        if !self.registry.insert(Arc::clone(&item)).await {
            // Only this task inserts, so a clash means a bug upstream.
            error!("stream [{}] already tracked, ignoring duplicate", stream.id);
            entry.item.hide();
            return;
        }

        let dispatcher = ActionDispatcher::new(stream.id.clone(), self.actions.clone());
        self.tasks
            .spawn(dispatcher.run(entry.clicks, self.cancel.child_token()));

        self.spawn_avatar_fetch(Arc::clone(&item));

        item.announce().await;
    }

    fn spawn_avatar_fetch(&self, item: Arc<StreamItem>) {
        let avatars = Arc::clone(&self.avatars);
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let res = tokio::select! {
                _ = cancel.cancelled() => return,
                res = avatars.avatar(item.id()) => res,
            };
            match res {
                Ok(bytes) if !bytes.is_empty() => item.menu_item().set_icon(bytes),
                Ok(_) => debug!("no image found for {}", item.id()),
                Err(e) => error!("unable to fetch avatar for {}: {}", item.id(), e),
            }
        });
    }
}
