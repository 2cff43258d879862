use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::snapshot::{self, LoadOutcome};
use super::writer::SnapshotWriter;
use crate::Result;

/// Default entry lifetime: 7 days.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(7 * 24 * 3600);

/// Configuration for the entry cache.
///
/// ```rust
/// # use tagwise::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .path("/tmp/tagwise/cache.json")
///     .expiry(Duration::from_secs(24 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Snapshot file. `None` keeps the cache in memory only.
    pub path: Option<PathBuf>,
    /// Age after which an entry is treated as absent. Default: 7 days.
    pub expiry: Duration,
    /// Maximum in-memory entries. Default: 50,000.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            expiry: DEFAULT_EXPIRY,
            max_entries: 50_000,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist to this snapshot file.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the entry expiry.
    pub fn expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the maximum number of in-memory entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }
}

/// A cached suggestion and the time it was stored.
///
/// An empty `value` records that the provider had no usable answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    /// Insertion time, seconds since the Unix epoch.
    pub ts: f64,
}

impl CacheEntry {
    /// Entry stamped with the current time.
    pub fn now(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ts: now_secs(),
        }
    }

    /// Entry for a "known empty" answer.
    pub fn unknown() -> Self {
        Self::now(String::new())
    }

    /// Whether this entry records a known-empty answer.
    pub fn is_unknown(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the entry is older than `expiry` at time `now`.
    pub fn is_expired(&self, expiry: Duration, now: f64) -> bool {
        now - self.ts > expiry.as_secs_f64()
    }
}

/// Current wall-clock time in fractional Unix seconds.
pub(crate) fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// State shared between the cache handle and its writer task.
pub(super) struct CacheInner {
    entries: Cache<String, CacheEntry>,
    expiry: Duration,
    /// Serialises every snapshot write, background or explicit.
    pub(super) write_lock: tokio::sync::Mutex<()>,
}

impl CacheInner {
    /// Copy of all entries that have not expired yet.
    pub(super) fn live_entries(&self) -> HashMap<String, CacheEntry> {
        let now = now_secs();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(self.expiry, now))
            .map(|(key, entry)| (key.as_ref().clone(), entry))
            .collect()
    }
}

/// Shared suggestion cache with expiry and background persistence.
///
/// Safe to share between concurrent lookups (wrap in `Arc`). See the
/// [module docs](super) for the persistence model.
pub struct EntryCache {
    inner: Arc<CacheInner>,
    path: Option<PathBuf>,
    writer: Mutex<Option<SnapshotWriter>>,
}

impl EntryCache {
    /// Create an empty cache without loading or persisting anything.
    pub fn new(config: &CacheConfig) -> Self {
        // Plain LRU: a fresh put is always admitted, the coldest entry goes.
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            inner: Arc::new(CacheInner {
                entries,
                expiry: config.expiry,
                write_lock: tokio::sync::Mutex::new(()),
            }),
            path: config.path.clone(),
            writer: Mutex::new(None),
        }
    }

    /// Open the cache: load the snapshot (if a path is configured) and start
    /// the background writer.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(config: CacheConfig) -> Self {
        Self::open_with_outcome(config).await.0
    }

    /// Like [`open`](Self::open), also returning what the snapshot load
    /// kept and dropped. In-memory caches report zero for both.
    pub async fn open_with_outcome(config: CacheConfig) -> (Self, LoadOutcome) {
        let cache = Self::new(&config);
        let mut outcome = LoadOutcome::default();
        if let Some(path) = config.path.as_deref() {
            outcome = cache.load_from(path).await;
            let writer = SnapshotWriter::spawn(path.to_path_buf(), Arc::clone(&cache.inner));
            *cache.writer_slot() = Some(writer);
        }
        (cache, outcome)
    }

    /// Flush a final snapshot and stop the background writer.
    ///
    /// The cache stays usable in memory afterwards; further
    /// [`persist`](Self::persist) calls are ignored.
    pub async fn close(&self) {
        let writer = self.writer_slot().take();
        if let Some(writer) = writer {
            writer.shutdown().await;
            info!(entries = self.len(), "cache closed");
        }
    }

    /// Look up a value. Missing and expired keys both return `None`.
    ///
    /// A known-empty answer is returned as `Some("")`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Look up the full entry, skipping expired ones.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(self.inner.expiry, now_secs()))
    }

    /// Insert or overwrite a value, stamped with the current time.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.insert_entry(key, CacheEntry::now(value));
    }

    /// Insert an entry as-is, keeping its timestamp.
    pub fn insert_entry(&self, key: impl Into<String>, entry: CacheEntry) {
        self.inner.entries.insert(key.into(), entry);
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub fn len(&self) -> u64 {
        self.inner.entries.run_pending_tasks();
        self.inner.entries.entry_count()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured expiry.
    pub fn expiry(&self) -> Duration {
        self.inner.expiry
    }

    /// Remove expired entries from memory. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = now_secs();
        let expired: Vec<_> = self
            .inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.inner.expiry, now))
            .map(|(key, _)| key)
            .collect();
        for key in &expired {
            self.inner.entries.invalidate(key.as_ref());
        }
        if !expired.is_empty() {
            debug!(removed = expired.len(), "purged expired cache entries");
        }
        expired.len()
    }

    /// Remove every entry and schedule a persist of the empty cache.
    pub fn clear(&self) {
        self.inner.entries.invalidate_all();
        self.inner.entries.run_pending_tasks();
        self.persist();
    }

    /// Copy of all live entries.
    pub fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.inner.live_entries()
    }

    /// Schedule a background write of the snapshot file.
    ///
    /// Never blocks and never fails; write errors are logged by the writer.
    /// No-op for caches without a path or after [`close`](Self::close).
    pub fn persist(&self) {
        if let Some(writer) = self.writer_slot().as_ref() {
            writer.request_persist();
        }
    }

    /// Write the current snapshot to `path` and wait for it.
    ///
    /// Serialised with background writes.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        snapshot::write(path, &self.inner.live_entries()).await
    }

    /// Merge a snapshot file into memory, dropping malformed and expired
    /// entries.
    pub async fn load_from(&self, path: &Path) -> LoadOutcome {
        let (entries, outcome) = snapshot::load(path, self.inner.expiry, now_secs()).await;
        for (key, entry) in entries {
            self.inner.entries.insert(key, entry);
        }
        outcome
    }

    /// Configured snapshot path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn writer_slot(&self) -> std::sync::MutexGuard<'_, Option<SnapshotWriter>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for EntryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCache")
            .field("path", &self.path)
            .field("expiry", &self.inner.expiry)
            .finish_non_exhaustive()
    }
}
