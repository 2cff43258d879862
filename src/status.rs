//! Progress messages for the host application.

use tracing::info;

/// Receives short human-readable progress messages.
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);
}

/// Forwards status messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatus;

impl StatusSink for TracingStatus {
    fn status(&self, message: &str) {
        info!(target: "tagwise::status", "{message}");
    }
}
