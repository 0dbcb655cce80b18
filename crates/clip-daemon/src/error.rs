//! Error types for every external capability the core talks to.
//!
//! None of these ever stop a background task: the poller skips a cycle, the
//! dispatcher waits for the next click.  Only `StartupError` aborts the
//! process, and only before any task has been spawned.

use std::time::Duration;
use thiserror::Error;

/// Failures of the remote "live followed channels" API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("twitch error {status} {error}: {message}")]
    Twitch {
        status: u16,
        error: String,
        message: String,
    },
    #[error("twitch returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unable to read response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("too many logins requested ({0}), cannot be more than 100")]
    TooManyLogins(usize),
    #[error("no user found for {0}")]
    UnknownUser(String),
    #[error("avatar cache: {0}")]
    Cache(#[from] std::io::Error),
}

/// Failures turning a channel identity into a playable URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("streamlink not found in PATH. Check https://streamlink.github.io/install.html")]
    NotFound,
    #[error("failed to start resolver: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("resolver timed out after {0:?}")]
    Timeout(Duration),
    #[error("resolver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("resolver returned no URL")]
    Empty,
}

/// Failures launching the local media player.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("cannot find any compatible media player")]
    NotFound,
    #[error("failed to start {player}: {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{player} exited with {status}")]
    Failed {
        player: String,
        status: String,
        /// Combined stdout + stderr of the player process.
        output: String,
    },
}

impl PlayerError {
    /// Captured player output, if the process got far enough to produce any.
    pub fn output(&self) -> Option<&str> {
        match self {
            PlayerError::Failed { output, .. } => Some(output.as_str()),
            _ => None,
        }
    }
}

/// Failures delivering a desktop notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification service: unsupported operating system: {0}")]
    Unsupported(String),
    #[error("notification service: failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("notification service: {program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Backend(String),
    #[error("clipboard task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Missing dependencies detected before any task is spawned.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("missing Twitch client id. Set [twitch] client_id or TWITCH_CLIENT_ID")]
    MissingClientId,
    #[error("missing Twitch access token. Set [twitch] access_token or TWITCH_ACCESS_TOKEN")]
    MissingAccessToken,
    #[error("{0} missing in PATH")]
    MissingBinary(String),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error("unable to initialize Twitch client: {0}")]
    Api(#[from] ApiError),
}
