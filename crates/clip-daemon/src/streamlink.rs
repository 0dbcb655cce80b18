//! Resolves a channel to its HLS playlist URL with the streamlink CLI.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use clip_proto::config::StreamlinkConfig;
use clip_proto::platform::find_binary;
use clip_proto::protocol::ChannelId;
use tokio::process::Command;
use tracing::debug;

use crate::capability::LinkResolver;
use crate::error::{ResolveError, StartupError};

pub struct Streamlink {
    binary: PathBuf,
    quality: String,
    extra_args: Vec<String>,
}

impl Streamlink {
    pub fn new(binary: impl Into<PathBuf>, quality: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            quality: quality.into(),
            extra_args,
        }
    }

    /// Locate the configured binary.  Missing streamlink is fatal at startup.
    pub fn from_config(config: &StreamlinkConfig) -> Result<Self, StartupError> {
        let binary = find_binary(&config.binary)
            .ok_or_else(|| StartupError::MissingBinary(config.binary.clone()))?;
        debug!("streamlink found at {:?}", binary);
        Ok(Self::new(binary, &config.quality, config.extra_args.clone()))
    }

    pub fn args(&self, id: &ChannelId) -> Vec<String> {
        let mut args: Vec<String> = [
            "--quiet",
            "--twitch-low-latency",
            "--stream-url",
            "--twitch-disable-ads",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(id.channel_url());
        args.push(self.quality.clone());
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[async_trait]
impl LinkResolver for Streamlink {
    async fn resolve(&self, id: &ChannelId, timeout: Duration) -> Result<String, ResolveError> {
        let child = Command::new(&self.binary)
            .args(self.args(id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ResolveError::NotFound,
                _ => ResolveError::Spawn(e),
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| ResolveError::Timeout(timeout))??;

        if !output.status.success() {
            // streamlink reports "error: No playable streams found" on stdout
            let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if detail.is_empty() {
                detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(ResolveError::Failed {
                status: output.status.to_string(),
                stderr: detail,
            });
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(ResolveError::Empty);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_order() {
        let sl = Streamlink::new("streamlink", "720p", vec!["--retry-open".into(), "2".into()]);
        assert_eq!(
            sl.args(&ChannelId::new("Alice")),
            vec![
                "--quiet",
                "--twitch-low-latency",
                "--stream-url",
                "--twitch-disable-ads",
                "https://www.twitch.tv/alice",
                "720p",
                "--retry-open",
                "2",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_a_startup_error() {
        let config = StreamlinkConfig {
            binary: "/nonexistent/streamlink-for-tests".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Streamlink::from_config(&config),
            Err(StartupError::MissingBinary(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_trims_stdout() {
        let sl = Streamlink::new("echo", "best", vec![]);
        // echo prints its arguments back, which is enough to exercise the
        // success path without streamlink installed.
        let url = sl
            .resolve(&ChannelId::new("alice"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(url.starts_with("--quiet"));
        assert!(url.ends_with("best"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_non_zero_exit() {
        let sl = Streamlink::new("false", "best", vec![]);
        let err = sl
            .resolve(&ChannelId::new("alice"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Failed { .. }));
    }
}
