//! On-disk snapshot format for the entry cache.
//!
//! The snapshot is a UTF-8 JSON object mapping each cache key to
//! `{"value": <string>, "ts": <unix seconds>}`. Timestamps are fractional
//! seconds so files written by older tooling load unchanged.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::CacheEntry;
use crate::Result;

/// Counts reported after loading a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Entries accepted into the cache.
    pub kept: usize,
    /// Entries dropped because they were malformed or expired.
    pub removed: usize,
}

/// Read and filter a snapshot file.
///
/// A missing file yields an empty map. An unreadable or unparsable file is
/// logged and also yields an empty map; a bad cache file never stops the
/// caller.
pub async fn load(
    path: &Path,
    expiry: Duration,
    now: f64,
) -> (HashMap<String, CacheEntry>, LoadOutcome) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cache snapshot, starting empty");
            return (HashMap::new(), LoadOutcome::default());
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache snapshot unreadable, starting empty");
            return (HashMap::new(), LoadOutcome::default());
        }
    };

    match parse(&bytes, expiry, now) {
        Ok((entries, outcome)) => {
            info!(
                path = %path.display(),
                kept = outcome.kept,
                removed = outcome.removed,
                "loaded cache snapshot"
            );
            (entries, outcome)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache snapshot corrupt, starting empty");
            (HashMap::new(), LoadOutcome::default())
        }
    }
}

/// Parse snapshot bytes, dropping malformed and expired entries.
///
/// Fails only if the document as a whole is not a JSON object.
pub fn parse(
    bytes: &[u8],
    expiry: Duration,
    now: f64,
) -> Result<(HashMap<String, CacheEntry>, LoadOutcome)> {
    let raw: HashMap<String, Value> = serde_json::from_slice(bytes)?;
    let mut outcome = LoadOutcome::default();
    let mut entries = HashMap::with_capacity(raw.len());

    for (key, value) in raw {
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(entry) if entry.ts.is_finite() && !entry.is_expired(expiry, now) => {
                entries.insert(key, entry);
                outcome.kept += 1;
            }
            _ => outcome.removed += 1,
        }
    }

    Ok((entries, outcome))
}

/// Write a snapshot atomically: serialise to a sibling temp file, then rename.
pub async fn write(path: &Path, entries: &HashMap<String, CacheEntry>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(entries)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!(path = %path.display(), entries = entries.len(), "wrote cache snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

    #[test]
    fn parse_keeps_fresh_entries() {
        let doc = br#"{"a": {"value": "Jazz", "ts": 1000.0}}"#;
        let (entries, outcome) = parse(doc, WEEK, 2000.0).unwrap();
        assert_eq!(outcome, LoadOutcome { kept: 1, removed: 0 });
        assert_eq!(entries["a"].value, "Jazz");
    }

    #[test]
    fn parse_drops_expired_and_malformed() {
        let doc = br#"{
            "fresh": {"value": "Jazz", "ts": 1000000.0},
            "old": {"value": "Rock", "ts": 1.0},
            "no_ts": {"value": "Pop"},
            "bad_value": {"value": 3, "ts": 1000000.0},
            "scalar": "Blues"
        }"#;
        let (entries, outcome) = parse(doc, WEEK, 1_000_100.0).unwrap();
        assert_eq!(outcome, LoadOutcome { kept: 1, removed: 4 });
        assert!(entries.contains_key("fresh"));
    }

    #[test]
    fn parse_rejects_non_object_document() {
        assert!(parse(b"[1, 2, 3]", WEEK, 0.0).is_err());
        assert!(parse(b"not json", WEEK, 0.0).is_err());
    }

    #[test]
    fn parse_accepts_integer_timestamps() {
        let doc = br#"{"a": {"value": "", "ts": 5}}"#;
        let (entries, _) = parse(doc, WEEK, 10.0).unwrap();
        assert!(entries["a"].is_unknown());
    }
}
