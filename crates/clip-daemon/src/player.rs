//! Local media players, launched as child processes.
//!
//! Known players are tried in order and the first one installed wins.  A
//! custom argv template from the config replaces the lookup.  Templates use
//! `$url` and `$title`, substituted inside every argument.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use clip_proto::config::PlayerConfig;
use clip_proto::platform::find_binary;
use tokio::process::Command;
use tracing::{debug, info};

use crate::capability::MediaPlayer;
use crate::error::PlayerError;

/// A player the daemon knows how to drive.
#[derive(Debug, Clone, Copy)]
pub struct KnownPlayer {
    pub name: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// `None` = any OS, else the `std::env::consts::OS` value it runs on.
    pub os: Option<&'static str>,
}

pub const KNOWN_PLAYERS: &[KnownPlayer] = &[
    KnownPlayer {
        name: "IINA",
        program: "iina",
        args: &["--no-stdin", "$url"],
        os: None,
    },
    KnownPlayer {
        name: "VLC",
        program: "vlc",
        args: &["$url", "--meta-title=$title"],
        os: None,
    },
    KnownPlayer {
        name: "MPV",
        program: "mpv",
        args: &["$url", "--quiet", "--title=$title"],
        os: None,
    },
    KnownPlayer {
        name: "QuickTime Player",
        program: "open",
        args: &["-a", "quicktime player", "$url"],
        os: Some("macos"),
    },
];

#[derive(Debug, Clone)]
pub struct CommandPlayer {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
        }
    }

    /// First known player available on this machine.
    pub fn detect() -> Option<Self> {
        Self::detect_with(std::env::consts::OS, find_binary)
    }

    fn detect_with(os: &str, find: impl Fn(&str) -> Option<PathBuf>) -> Option<Self> {
        KNOWN_PLAYERS
            .iter()
            .filter(|p| p.os.map_or(true, |o| o == os))
            .find_map(|p| {
                let program = find(p.program)?;
                Some(Self::new(
                    p.name,
                    program,
                    p.args.iter().map(|a| a.to_string()).collect(),
                ))
            })
    }

    pub fn from_config(config: &PlayerConfig) -> Result<Self, PlayerError> {
        let Some((program, args)) = config.command.split_first() else {
            let player = Self::detect().ok_or(PlayerError::NotFound)?;
            info!("using {} at {:?}", player.name, player.program);
            return Ok(player);
        };

        let path = find_binary(program).ok_or(PlayerError::NotFound)?;
        let name = if config.name.trim().is_empty() {
            program.clone()
        } else {
            config.name.clone()
        };
        info!("using custom player {} at {:?}", name, path);
        Ok(Self::new(name, path, args.to_vec()))
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub fn expand(&self, url: &str, title: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace("$url", url).replace("$title", title))
            .collect()
    }
}

#[async_trait]
impl MediaPlayer for CommandPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch(&self, url: &str, title: &str) -> Result<(), PlayerError> {
        let args = self.expand(url, title);
        debug!("launching {} {:?}", self.name, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| PlayerError::Spawn {
                player: self.name.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(PlayerError::Failed {
            player: self.name.clone(),
            status: output.status.to_string(),
            output: combined,
        })
    }
}
