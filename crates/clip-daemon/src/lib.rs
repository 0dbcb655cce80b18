//! Twitch Clip daemon: watches followed channels, keeps a menu of who is
//! live, and plays a channel when its entry (or notification) is clicked.

pub mod avatar;
pub mod callback;
pub mod capability;
pub mod clipboard;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod item;
pub mod lifecycle;
pub mod menu;
pub mod notifier;
pub mod player;
pub mod poller;
pub mod reconciler;
pub mod registry;
pub mod streamlink;
pub mod twitch;

pub use capability::Services;
pub use lifecycle::{Lifecycle, RunSettings};
