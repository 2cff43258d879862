//! Persistent, time-expiring suggestion cache.
//!
//! [`EntryCache`] maps a cache key (operation, model, title, artist) to the
//! cleaned suggestion text. Entries carry their insertion timestamp and are
//! treated as absent once older than the configured expiry, even while they
//! still sit in memory waiting for the next [`EntryCache::purge_expired`]
//! sweep.
//!
//! # Architecture
//!
//! - In memory: a bounded moka cache, safe for concurrent readers and
//!   writers. No moka TTL is configured; expiry is decided from the stored
//!   timestamp so that entries loaded from disk age correctly.
//! - On disk: a JSON object `{ key: { "value": ..., "ts": ... } }` (see
//!   [`snapshot`]). Loading drops malformed and expired entries.
//! - Persisting: a single writer task owns all background file writes.
//!   [`EntryCache::persist`] only signals the writer and never blocks; a
//!   signal arriving while one is already queued is coalesced, since the
//!   writer reads the latest state when it runs.
//!
//! Check-then-fetch is not atomic: two concurrent misses on the same key
//! both reach the provider and the second write overwrites the first with an
//! equivalent value.

mod entry;
pub mod snapshot;
mod writer;

pub use entry::{CacheConfig, CacheEntry, EntryCache};
pub use snapshot::LoadOutcome;
