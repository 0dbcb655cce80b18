//! Headless menu: the in-process UI the core drives.
//!
//! Every entry keeps its title, tooltip, icon and flags so the HTTP API can
//! report them, and owns a capacity-1 click stream.  A click that arrives
//! while one is pending is dropped, which is what a real tray does with a
//! busy item.

use std::sync::{Arc, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::capability::{Menu, MenuEntry, MenuItem};

struct EntryState {
    title: String,
    tooltip: String,
    visible: bool,
    enabled: bool,
    icon: Option<Vec<u8>>,
    click_tx: mpsc::Sender<()>,
}

/// Point-in-time copy of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub index: usize,
    pub title: String,
    pub tooltip: String,
    pub visible: bool,
    pub enabled: bool,
    pub has_icon: bool,
}

#[derive(Clone, Default)]
pub struct HeadlessMenu {
    entries: Arc<RwLock<Vec<EntryState>>>,
}

impl HeadlessMenu {
    pub fn new() -> Self {
        Self::default()
    }

    /// A disabled, informational entry ("Connected as ...").
    pub fn add_label(&self, title: &str) -> Arc<dyn MenuItem> {
        let entry = self.add_item(title, "");
        entry.item.disable();
        entry.item
    }

    pub fn entries(&self) -> Vec<EntrySnapshot> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };
        entries
            .iter()
            .enumerate()
            .map(|(index, e)| EntrySnapshot {
                index,
                title: e.title.clone(),
                tooltip: e.tooltip.clone(),
                visible: e.visible,
                enabled: e.enabled,
                has_icon: e.icon.is_some(),
            })
            .collect()
    }

    pub fn visible_entries(&self) -> Vec<EntrySnapshot> {
        self.entries().into_iter().filter(|e| e.visible).collect()
    }

    pub fn find_by_title(&self, title: &str) -> Option<EntrySnapshot> {
        self.entries().into_iter().find(|e| e.title == title)
    }

    /// Click the entry at `index` the way a user would: ignored when the
    /// entry is hidden or disabled.
    pub fn click(&self, index: usize) -> bool {
        let Ok(entries) = self.entries.read() else {
            return false;
        };
        let Some(entry) = entries.get(index) else {
            return false;
        };
        if !entry.visible || !entry.enabled {
            debug!("menu: click on inactive entry {:?}", entry.title);
            return false;
        }
        entry.click_tx.try_send(()).is_ok()
    }
}

impl Menu for HeadlessMenu {
    fn add_item(&self, title: &str, tooltip: &str) -> MenuEntry {
        let (click_tx, clicks) = mpsc::channel(1);
        let index = match self.entries.write() {
            Ok(mut entries) => {
                entries.push(EntryState {
                    title: title.to_string(),
                    tooltip: tooltip.to_string(),
                    visible: true,
                    enabled: true,
                    icon: None,
                    click_tx: click_tx.clone(),
                });
                entries.len() - 1
            }
            Err(_) => {
                warn!("menu: entry table poisoned, {:?} is detached", title);
                usize::MAX
            }
        };
        debug!("menu: added {:?} at {}", title, index);

        MenuEntry {
            item: Arc::new(HeadlessItem {
                entries: Arc::clone(&self.entries),
                index,
                click_tx,
            }),
            clicks,
        }
    }
}

struct HeadlessItem {
    entries: Arc<RwLock<Vec<EntryState>>>,
    index: usize,
    click_tx: mpsc::Sender<()>,
}

impl HeadlessItem {
    fn update(&self, f: impl FnOnce(&mut EntryState)) {
        if let Ok(mut entries) = self.entries.write() {
            if let Some(entry) = entries.get_mut(self.index) {
                f(entry);
            }
        }
    }
}

impl MenuItem for HeadlessItem {
    fn show(&self) {
        self.update(|e| e.visible = true);
    }

    fn hide(&self) {
        self.update(|e| e.visible = false);
    }

    fn set_title(&self, title: &str) {
        self.update(|e| {
            if e.title != title {
                debug!("menu: {:?} -> {:?}", e.title, title);
                e.title = title.to_string();
            }
        });
    }

    fn set_tooltip(&self, tooltip: &str) {
        self.update(|e| e.tooltip = tooltip.to_string());
    }

    fn set_icon(&self, icon: Vec<u8>) {
        self.update(|e| e.icon = Some(icon));
    }

    fn disable(&self) {
        self.update(|e| e.enabled = false);
    }

    fn click_sender(&self) -> mpsc::Sender<()> {
        self.click_tx.clone()
    }
}
