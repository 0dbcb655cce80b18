use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login-style key of a monitored streamer.  Always lower-case so the same
/// channel maps to the same registry entry whatever casing the API returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(login: impl AsRef<str>) -> Self {
        Self(login.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Public channel page, the input streamlink expects.
    pub fn channel_url(&self) -> String {
        format!("https://www.twitch.tv/{}", self.0)
    }
}

impl From<String> for ChannelId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a fetched "live followed channels" list.  Produced once per
/// poll cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStream {
    pub id: ChannelId,
    /// Display name as returned by the API; may be empty.
    pub display_name: String,
    /// Category (game) label; may be empty.
    pub category: String,
    /// Stream title, used as the menu tooltip.
    pub title: String,
    pub fetched_at: DateTime<Utc>,
}

impl LiveStream {
    pub fn new(
        id: impl Into<ChannelId>,
        display_name: impl Into<String>,
        category: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: category.into(),
            title: title.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Display name, falling back to the identity when the API omitted it.
    pub fn name_or_id(&self) -> &str {
        display_name_or_id(&self.display_name, &self.id)
    }
}

pub fn display_name_or_id<'a>(display_name: &'a str, id: &'a ChannelId) -> &'a str {
    if display_name.trim().is_empty() {
        id.as_str()
    } else {
        display_name
    }
}

/// Menu title for a live channel: `Name (Category)`, or just `Name` when the
/// category is unknown.
pub fn menu_title(display_name: &str, category: &str) -> String {
    if category.trim().is_empty() {
        display_name.to_string()
    } else {
        format!("{} ({})", display_name, category)
    }
}

// ── HTTP wire types ───────────────────────────────────────────────────────────

/// A tracked channel as reported by `GET /api/streams`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEntry {
    pub id: ChannelId,
    pub display_name: String,
    pub category: String,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StreamList {
    pub entries: Vec<StreamEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_is_case_normalized() {
        assert_eq!(ChannelId::new(" Alice "), ChannelId::new("alice"));
        assert_eq!(ChannelId::new("LockLear").as_str(), "locklear");
    }

    #[test]
    fn test_channel_id_serde_normalizes() {
        let id: ChannelId = serde_json::from_str("\"ZeratoR\"").unwrap();
        assert_eq!(id.as_str(), "zerator");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"zerator\"");
    }

    #[test]
    fn test_display_name_falls_back_to_identity() {
        let s = LiveStream::new("alice", "", "Just Chatting", "hello");
        assert_eq!(s.name_or_id(), "alice");
        let s = LiveStream::new("alice", "Alice", "Just Chatting", "hello");
        assert_eq!(s.name_or_id(), "Alice");
    }

    #[test]
    fn test_menu_title() {
        assert_eq!(menu_title("Alice", "Just Chatting"), "Alice (Just Chatting)");
        assert_eq!(menu_title("alice", ""), "alice");
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(
            ChannelId::new("alice").channel_url(),
            "https://www.twitch.tv/alice"
        );
    }
}
