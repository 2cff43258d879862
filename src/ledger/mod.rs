//! Unmatched-track ledger.
//!
//! Tracks that produced no confident result are appended here for manual
//! follow-up. Appends are synchronous: once [`UnmatchedLedger::record`]
//! returns, the entry is visible to every later snapshot, drain or export.
//!
//! An optional [`LedgerExporter`] receives the whole ledger after each
//! append (write-through). Export failures are logged and never fail the
//! append.

mod export;

pub use export::{DirectoryExporter, ExportFormat, ImportStub, LedgerExporter};

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::types::UnmatchedEntry;
use crate::{Result, telemetry};

/// Append-only record of unmatched tracks.
#[derive(Default)]
pub struct UnmatchedLedger {
    entries: Mutex<Vec<UnmatchedEntry>>,
    exporter: Option<Arc<dyn LedgerExporter>>,
}

impl UnmatchedLedger {
    /// Create an in-memory ledger without write-through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger that re-exports through `exporter` on every append.
    pub fn with_exporter(exporter: Arc<dyn LedgerExporter>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            exporter: Some(exporter),
        }
    }

    /// Create a ledger from configuration.
    ///
    /// Write-through goes to a [`DirectoryExporter`] when enabled and an
    /// export directory can be resolved.
    pub fn from_config(config: &LedgerConfig) -> Self {
        match config.resolved_export_dir() {
            Some(dir) if config.write_through => {
                Self::with_exporter(Arc::new(DirectoryExporter::new(dir)))
            }
            _ => Self::new(),
        }
    }

    /// Append an entry.
    ///
    /// With write-through enabled this blocks on file I/O while holding the
    /// ledger lock. Async callers should run it on the blocking pool.
    pub fn record(&self, entry: UnmatchedEntry) {
        let mut entries = self.lock();
        debug!(path = %entry.path.display(), reason = %entry.reason, "recording unmatched track");
        entries.push(entry);
        metrics::counter!(telemetry::UNMATCHED_TOTAL).increment(1);

        // Exported under the lock so a concurrent drain never races the file.
        if let Some(exporter) = &self.exporter
            && let Err(e) = exporter.export(&entries)
        {
            warn!(error = %e, entries = entries.len(), "unmatched write-through export failed");
        }
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<UnmatchedEntry> {
        self.lock().clone()
    }

    /// Take every entry and leave the ledger empty.
    ///
    /// Atomic with respect to [`record`](Self::record): a concurrent append
    /// lands either in the returned entries or in the emptied ledger.
    pub fn drain(&self) -> Vec<UnmatchedEntry> {
        std::mem::take(&mut *self.lock())
    }

    /// Export the current entries through `exporter` and clear them.
    ///
    /// On export failure nothing is cleared. Returns how many entries were
    /// exported.
    pub fn export_and_clear(&self, exporter: &dyn LedgerExporter) -> Result<usize> {
        let mut entries = self.lock();
        exporter.export(&entries)?;
        let count = entries.len();
        entries.clear();
        debug!(count, "exported and cleared unmatched ledger");
        Ok(count)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UnmatchedEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for UnmatchedLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnmatchedLedger")
            .field("len", &self.len())
            .field("write_through", &self.exporter.is_some())
            .finish()
    }
}
