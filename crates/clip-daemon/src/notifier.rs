//! Desktop notifications.
//!
//! The backend is picked at runtime from the OS name:
//!
//! ```text
//!   linux, *bsd → notify-send (with a "Watch" action; clicking it routes the
//!                 channel back through the callback channel)
//!   macos       → osascript "display notification"
//!   anything else → Unsupported (every notify fails, and is logged)
//! ```
//!
//! Wrapped by `FilteredNotifier` when the config lists channels.

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use clip_proto::config::NotificationsConfig;
use clip_proto::protocol::ChannelId;
use clip_proto::APP_DISPLAY_NAME;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::callback::CallbackSender;
use crate::capability::Notifier;
use crate::error::NotifyError;

pub const NOTIFICATION_TITLE: &str = "A stream has just started";
const WATCH_ACTION: &str = "default";

pub fn notification_body(display_name: &str, category: &str) -> String {
    format!("{} start streaming {}", display_name, category)
        .trim_end()
        .to_string()
}

/// Build the notifier for this machine.
pub fn select(config: &NotificationsConfig, callbacks: CallbackSender) -> Arc<dyn Notifier> {
    if !config.enabled {
        info!("notifications disabled");
        return Arc::new(DisabledNotifier);
    }

    let backend: Arc<dyn Notifier> = match std::env::consts::OS {
        "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => {
            Arc::new(NotifySend::new(callbacks))
        }
        "macos" => Arc::new(AppleScript),
        other => Arc::new(Unsupported::new(other)),
    };

    if config.channels.is_empty() {
        backend
    } else {
        Arc::new(FilteredNotifier::new(backend, config.channels.iter().cloned()))
    }
}

// ── notify-send ───────────────────────────────────────────────────────────────

pub struct NotifySend {
    program: String,
    callbacks: CallbackSender,
    cancel: CancellationToken,
    waits: TaskTracker,
}

impl NotifySend {
    pub fn new(callbacks: CallbackSender) -> Self {
        Self::with_program("notify-send", callbacks)
    }

    pub fn with_program(program: impl Into<String>, callbacks: CallbackSender) -> Self {
        Self {
            program: program.into(),
            callbacks,
            cancel: CancellationToken::new(),
            waits: TaskTracker::new(),
        }
    }

    fn args(display_name: &str, category: &str) -> Vec<String> {
        vec![
            format!("--app-name={}", APP_DISPLAY_NAME),
            "--wait".to_string(),
            format!("--action={}=Watch", WATCH_ACTION),
            NOTIFICATION_TITLE.to_string(),
            notification_body(display_name, category),
        ]
    }

    /// Number of notifications still waiting for a click or dismissal.
    pub fn pending(&self) -> usize {
        self.waits.len()
    }
}

#[async_trait]
impl Notifier for NotifySend {
    async fn notify(
        &self,
        display_name: &str,
        category: &str,
        id: &ChannelId,
    ) -> Result<(), NotifyError> {
        let child = Command::new(&self.program)
            .args(Self::args(display_name, category))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // notify-send blocks until the notification is clicked or dismissed,
        // printing the invoked action name.
        let id = id.clone();
        let program = self.program.clone();
        let callbacks = self.callbacks.clone();
        let cancel = self.cancel.clone();
        self.waits.spawn(async move {
            let output = tokio::select! {
                _ = cancel.cancelled() => {
                    trace!("notification wait for [{}] cancelled", id);
                    return;
                }
                output = child.wait_with_output() => output,
            };
            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    warn!("{} wait failed: {}", program, e);
                    return;
                }
            };
            if !output.status.success() {
                warn!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return;
            }
            if String::from_utf8_lossy(&output.stdout).trim() == WATCH_ACTION {
                debug!("notification clicked for [{}]", id);
                if callbacks.send(id).await.is_err() {
                    debug!("callback channel closed, dropping notification click");
                }
            }
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.cancel.cancel();
        self.waits.close();
        self.waits.wait().await;
        Ok(())
    }
}

// ── osascript ─────────────────────────────────────────────────────────────────

pub struct AppleScript;

impl AppleScript {
    fn script(display_name: &str, category: &str) -> String {
        format!(
            "display notification \"{}\" with title \"{}\"",
            escape_applescript(&notification_body(display_name, category)),
            escape_applescript(NOTIFICATION_TITLE)
        )
    }
}

fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Notifier for AppleScript {
    async fn notify(
        &self,
        display_name: &str,
        category: &str,
        _id: &ChannelId,
    ) -> Result<(), NotifyError> {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(Self::script(display_name, category))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| NotifyError::Spawn {
                program: "osascript".to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(NotifyError::Failed {
                program: "osascript".to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

// ── fallbacks and wrappers ────────────────────────────────────────────────────

pub struct Unsupported {
    os: String,
}

impl Unsupported {
    pub fn new(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }
}

#[async_trait]
impl Notifier for Unsupported {
    async fn notify(&self, _: &str, _: &str, _: &ChannelId) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported(self.os.clone()))
    }

    async fn close(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _: &str, _: &str, _: &ChannelId) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Only lets through channels on the allow-list.
pub struct FilteredNotifier {
    inner: Arc<dyn Notifier>,
    allow: HashSet<ChannelId>,
}

impl FilteredNotifier {
    pub fn new(inner: Arc<dyn Notifier>, allow: impl IntoIterator<Item = ChannelId>) -> Self {
        Self {
            inner,
            allow: allow.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Notifier for FilteredNotifier {
    async fn notify(
        &self,
        display_name: &str,
        category: &str,
        id: &ChannelId,
    ) -> Result<(), NotifyError> {
        if !self.allow.contains(id) {
            trace!("notification for [{}] filtered out", id);
            return Ok(());
        }
        self.inner.notify(display_name, category, id).await
    }

    async fn close(&self) -> Result<(), NotifyError> {
        self.inner.close().await
    }
}
