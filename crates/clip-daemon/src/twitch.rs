//! Twitch Helix client.
//!
//! Only the three calls the daemon needs: who am I, which followed channels
//! are live, and user profiles (for avatars).  Authentication is a
//! pre-issued user token; no OAuth flow here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use clip_proto::config::TwitchConfig;
use clip_proto::protocol::{ChannelId, LiveStream};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::capability::LiveChannels;
use crate::error::{ApiError, StartupError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_SIZE: usize = 100;
pub const MAX_LOGINS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stream {
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub title: String,
}

impl Stream {
    fn into_live(self) -> LiveStream {
        LiveStream {
            id: ChannelId::new(&self.user_login),
            display_name: self.user_name,
            category: self.game_name,
            title: self.title,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

/// `{"error": "Unauthorized", "status": 401, "message": "Invalid OAuth token"}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: String,
}

pub struct TwitchClient {
    client_id: String,
    access_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TwitchClient {
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::with_base_url(client_id, access_token, "https://api.twitch.tv/helix")
    }

    /// Point at another Helix-compatible server (tests).
    pub fn with_base_url(
        client_id: impl Into<String>,
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            access_token: access_token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn from_config(config: &TwitchConfig) -> Result<Self, StartupError> {
        if config.client_id.trim().is_empty() {
            return Err(StartupError::MissingClientId);
        }
        if config.access_token.trim().is_empty() {
            return Err(StartupError::MissingAccessToken);
        }
        Ok(Self::with_base_url(
            config.client_id.trim(),
            config.access_token.trim(),
            &config.api_url,
        ))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        trace!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(decode_error(status, body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// The user the access token belongs to.
    pub async fn me(&self) -> Result<User, ApiError> {
        let page: Page<User> = self.get("/users", &[]).await?;
        page.data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::UnknownUser("token owner".to_string()))
    }

    /// Every live channel `user_id` follows, across all pages.
    pub async fn followed_streams(&self, user_id: &str) -> Result<Vec<Stream>, ApiError> {
        let first = PAGE_SIZE.to_string();
        let mut streams = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page: Page<Stream> = {
                let mut query = vec![("user_id", user_id), ("first", first.as_str())];
                if let Some(after) = cursor.as_deref() {
                    query.push(("after", after));
                }
                self.get("/streams/followed", &query).await?
            };
            let fetched = page.data.len();
            streams.extend(page.data);

            match page.pagination.cursor {
                Some(next) if !next.is_empty() && fetched > 0 => cursor = Some(next),
                _ => break,
            }
        }
        Ok(streams)
    }

    pub async fn users(&self, logins: &[&str]) -> Result<Vec<User>, ApiError> {
        if logins.len() > MAX_LOGINS {
            return Err(ApiError::TooManyLogins(logins.len()));
        }
        if logins.is_empty() {
            return Ok(Vec::new());
        }
        let query: Vec<(&str, &str)> = logins.iter().map(|l| ("login", *l)).collect();
        let page: Page<User> = self.get("/users", &query).await?;
        Ok(page.data)
    }

    /// Plain unauthenticated download, for profile images on the CDN.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn decode_error(status: StatusCode, body: String) -> ApiError {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(e) if !e.message.is_empty() || !e.error.is_empty() => ApiError::Twitch {
            status: if e.status == 0 { status.as_u16() } else { e.status },
            error: e.error,
            message: e.message,
        },
        _ => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    }
}

/// `LiveChannels` for the connected user.
pub struct FollowedChannels {
    client: Arc<TwitchClient>,
    user: User,
}

impl FollowedChannels {
    pub fn new(client: Arc<TwitchClient>, user: User) -> Self {
        Self { client, user }
    }

    /// Resolve the token owner.  Fails if the credentials are rejected.
    pub async fn connect(client: Arc<TwitchClient>) -> Result<Self, ApiError> {
        let user = client.me().await?;
        debug!("connected as {} ({})", user.login, user.id);
        Ok(Self::new(client, user))
    }

    pub fn user(&self) -> &User {
        &self.user
    }
}

#[async_trait]
impl LiveChannels for FollowedChannels {
    async fn live_followed(&self) -> Result<Vec<LiveStream>, ApiError> {
        let streams = self.client.followed_streams(&self.user.id).await?;
        Ok(streams.into_iter().map(Stream::into_live).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_twitch_error_body() {
        let body = r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#;
        match decode_error(StatusCode::UNAUTHORIZED, body.to_string()) {
            ApiError::Twitch {
                status,
                error,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(error, "Unauthorized");
                assert_eq!(message, "Invalid OAuth token");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_non_json_error_body() {
        let err = decode_error(StatusCode::BAD_GATEWAY, "<html>".to_string());
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut config = TwitchConfig::default();
        assert!(matches!(
            TwitchClient::from_config(&config),
            Err(StartupError::MissingClientId)
        ));
        config.client_id = "abc".to_string();
        assert!(matches!(
            TwitchClient::from_config(&config),
            Err(StartupError::MissingAccessToken)
        ));
        config.access_token = "tok".to_string();
        assert!(TwitchClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_stream_identity_is_lowercased() {
        let s = Stream {
            user_login: "ZeratoR".to_string(),
            user_name: "ZeratoR".to_string(),
            game_name: "Trackmania".to_string(),
            title: "ZLAN".to_string(),
        };
        let live = s.into_live();
        assert_eq!(live.id.as_str(), "zerator");
        assert_eq!(live.display_name, "ZeratoR");
    }
}
