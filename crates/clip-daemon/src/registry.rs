use std::collections::HashMap;
use std::sync::Arc;

use clip_proto::protocol::ChannelId;
use tokio::sync::RwLock;

use crate::item::StreamItem;

/// Identity -> StreamItem map.
///
/// Single writer: only the reconciler inserts.  Items are never removed
/// during a run; an offline channel is hidden instead.  Everyone else
/// (callback router, HTTP API) only looks entries up by key.
#[derive(Clone, Default)]
pub struct Registry {
    items: Arc<RwLock<HashMap<ChannelId, Arc<StreamItem>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &ChannelId) -> Option<Arc<StreamItem>> {
        self.items.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &ChannelId) -> bool {
        self.items.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Snapshot of every tracked item, in no particular order.
    pub async fn items(&self) -> Vec<Arc<StreamItem>> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn ids(&self) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self.items.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Insert a new item.  Keys are unique per run, so an existing entry is
    /// kept and the new one is dropped; returns whether the insert happened.
    pub(crate) async fn insert(&self, item: Arc<StreamItem>) -> bool {
        let mut items = self.items.write().await;
        if items.contains_key(item.id()) {
            return false;
        }
        items.insert(item.id().clone(), item);
        true
    }
}
