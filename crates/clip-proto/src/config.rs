use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;
use crate::protocol::ChannelId;

pub const ENV_CLIENT_ID: &str = "TWITCH_CLIENT_ID";
pub const ENV_ACCESS_TOKEN: &str = "TWITCH_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub streamlink: StreamlinkConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// Application client id.  `TWITCH_CLIENT_ID` overrides it.
    #[serde(default)]
    pub client_id: String,
    /// User access token with the `user:read:follows` scope.
    /// `TWITCH_ACCESS_TOKEN` overrides it.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamlinkConfig {
    #[serde(default = "default_streamlink_binary")]
    pub binary: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_resolve_timeout_secs")]
    pub timeout_secs: u64,
    /// Appended after the built-in arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerConfig {
    /// argv template with `$url` and `$title` placeholders.  Empty means
    /// "use the first known player found on this machine".
    #[serde(default)]
    pub command: Vec<String>,
    /// Label used in logs for a custom command.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Only notify for these channels.  Empty means every followed channel.
    #[serde(default)]
    pub channels: Vec<ChannelId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 0 picks a free port at startup.
    #[serde(default)]
    pub port: u16,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            access_token: String::new(),
            api_url: default_api_url(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for StreamlinkConfig {
    fn default() -> Self {
        Self {
            binary: default_streamlink_binary(),
            quality: default_quality(),
            timeout_secs: default_resolve_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

impl StreamlinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            channels: Vec::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind_address: default_bind_address(),
            port: 0,
        }
    }
}

fn default_api_url() -> String {
    "https://api.twitch.tv/helix".to_string()
}

fn default_interval_secs() -> u64 {
    10
}

fn default_streamlink_binary() -> String {
    "streamlink".to_string()
}

fn default_quality() -> String {
    "best".to_string()
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)?
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Credentials from the environment win over the file so tokens do not
    /// have to be written to disk.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_CLIENT_ID).filter(|v| !v.trim().is_empty()) {
            self.twitch.client_id = v.trim().to_string();
        }
        if let Some(v) = lookup(ENV_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.twitch.access_token = v.trim().to_string();
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twitch: TwitchConfig::default(),
            poller: PollerConfig::default(),
            streamlink: StreamlinkConfig::default(),
            player: PlayerConfig::default(),
            notifications: NotificationsConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
