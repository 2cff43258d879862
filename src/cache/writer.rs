//! Single-writer task for background snapshot persistence.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::CacheInner;
use super::snapshot;

enum WriterCommand {
    Persist,
    Flush(oneshot::Sender<()>),
}

/// Handle to the task that owns background writes of one snapshot file.
pub(super) struct SnapshotWriter {
    tx: mpsc::Sender<WriterCommand>,
    handle: JoinHandle<()>,
}

impl SnapshotWriter {
    /// Spawn the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub(super) fn spawn(path: PathBuf, inner: Arc<CacheInner>) -> Self {
        // Capacity 1: one queued persist already covers any later change.
        let (tx, mut rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                write_once(&path, &inner).await;
                if let WriterCommand::Flush(ack) = command {
                    let _ = ack.send(());
                }
            }
            debug!(path = %path.display(), "cache writer stopped");
        });

        Self { tx, handle }
    }

    /// Ask for a background write without waiting for it.
    pub(super) fn request_persist(&self) {
        match self.tx.try_send(WriterCommand::Persist) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("cache persist already queued");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("cache writer is gone, persist dropped");
            }
        }
    }

    /// Write a final snapshot and stop the task.
    pub(super) async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
        drop(self.tx);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "cache writer task failed");
        }
    }
}

async fn write_once(path: &std::path::Path, inner: &CacheInner) {
    let _guard = inner.write_lock.lock().await;
    let entries = inner.live_entries();
    if let Err(e) = snapshot::write(path, &entries).await {
        warn!(path = %path.display(), error = %e, "failed to persist cache snapshot");
    }
}
