//! Clipboard sink: the only task that writes the system clipboard.
//!
//! Dispatchers push resolved URLs into a capacity-1 queue; the sink drains
//! it one entry at a time.  The queue closes once every sender (reconciler
//! and dispatchers) is gone, which the lifecycle only allows after those
//! tasks observed cancellation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::capability::ClipboardWriter;
use crate::error::ClipboardError;

pub type ClipboardSender = mpsc::Sender<String>;
pub type ClipboardReceiver = mpsc::Receiver<String>;

pub fn clipboard_queue() -> (ClipboardSender, ClipboardReceiver) {
    mpsc::channel(1)
}

pub struct ClipboardSink {
    writer: Arc<dyn ClipboardWriter>,
}

impl ClipboardSink {
    pub fn new(writer: Arc<dyn ClipboardWriter>) -> Self {
        Self { writer }
    }

    pub async fn run(self, mut rx: ClipboardReceiver, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("received cancel: clipboard sink");
                    break;
                }
                link = rx.recv() => match link {
                    Some(link) => self.write(link).await,
                    None => {
                        debug!("clipboard queue closed");
                        return;
                    }
                }
            }
        }

        // Dispatchers still mid-click may hold a sender; keep writing until
        // the last one is dropped.
        let mut flushed = 0usize;
        while let Some(link) = rx.recv().await {
            self.write(link).await;
            flushed += 1;
        }
        if flushed > 0 {
            debug!("flushed {} clipboard write(s) after cancel", flushed);
        }
        debug!("clipboard queue closed");
    }

    async fn write(&self, link: String) {
        trace!("setting [{}] to clipboard", link);
        let writer = Arc::clone(&self.writer);
        let res = tokio::task::spawn_blocking(move || writer.write(&link))
            .await
            .map_err(ClipboardError::from)
            .and_then(|r| r);
        if let Err(e) = res {
            error!("{}", e);
        }
    }
}

/// The OS clipboard through `arboard`.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardWriter for SystemClipboard {
    fn write(&self, text: &str) -> Result<(), ClipboardError> {
        arboard::Clipboard::new()
            .and_then(|mut cb| cb.set_text(text.to_string()))
            .map_err(|e| ClipboardError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        writes: Mutex<Vec<String>>,
        fail_first: Mutex<bool>,
    }

    impl ClipboardWriter for Recording {
        fn write(&self, text: &str) -> Result<(), ClipboardError> {
            let mut fail = self.fail_first.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(ClipboardError::Backend("no display".into()));
            }
            self.writes.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_writes_in_order_and_survives_failures() {
        let writer = Arc::new(Recording::default());
        *writer.fail_first.lock().unwrap() = true;
        let (tx, rx) = clipboard_queue();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(ClipboardSink::new(writer.clone()).run(rx, cancel.clone()));

        tx.send("first".into()).await.unwrap();
        tx.send("second".into()).await.unwrap();
        tx.send("third".into()).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*writer.writes.lock().unwrap(), vec!["second", "third"]);
    }

    #[tokio::test]
    async fn test_sink_outlives_cancel_until_last_sender_drops() {
        let writer = Arc::new(Recording::default());
        let (tx, rx) = clipboard_queue();
        let cancel = CancellationToken::new();
        let mut handle = tokio::spawn(ClipboardSink::new(writer.clone()).run(rx, cancel.clone()));

        cancel.cancel();
        assert!(tokio::time::timeout(Duration::from_millis(100), &mut handle)
            .await
            .is_err());

        // A dispatcher that has not yet seen the cancel can still hand off.
        tx.send("late".into()).await.unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*writer.writes.lock().unwrap(), vec!["late"]);
    }
}
