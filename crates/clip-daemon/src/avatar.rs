//! Channel avatars, downloaded once and kept under the cache directory.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clip_proto::protocol::ChannelId;
use tracing::{debug, warn};

use crate::capability::AvatarSource;
use crate::error::ApiError;
use crate::twitch::TwitchClient;

pub struct AvatarCache {
    client: Arc<TwitchClient>,
    dir: PathBuf,
}

impl AvatarCache {
    pub fn new(client: Arc<TwitchClient>, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    fn path_for(&self, id: &ChannelId) -> PathBuf {
        self.dir.join(id.as_str())
    }

    async fn fetch(&self, id: &ChannelId) -> Result<Vec<u8>, ApiError> {
        let users = self.client.users(&[id.as_str()]).await?;
        let user = users
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::UnknownUser(id.to_string()))?;
        if user.profile_image_url.is_empty() {
            return Ok(Vec::new());
        }
        self.client.download(&user.profile_image_url).await
    }
}

#[async_trait]
impl AvatarSource for AvatarCache {
    async fn avatar(&self, id: &ChannelId) -> Result<Vec<u8>, ApiError> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("avatar for {} served from cache", id);
                return Ok(bytes);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("unable to read cached avatar {:?}: {}", path, e),
        }

        let bytes = self.fetch(id).await?;
        if bytes.is_empty() {
            return Ok(bytes);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        debug!("avatar for {} cached at {:?} ({} bytes)", id, path, bytes.len());
        Ok(bytes)
    }
}
