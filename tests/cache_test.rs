//! Tests for EntryCache: expiry, snapshot load/persist and lifecycle.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tagwise::cache::{CacheConfig, CacheEntry, EntryCache, LoadOutcome};

const DAY: f64 = 24.0 * 3600.0;

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

fn read_snapshot(path: &std::path::Path) -> serde_json::Map<String, serde_json::Value> {
    let text = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn get_returns_none_for_missing_and_expired() {
    let cache = EntryCache::new(&CacheConfig::new());
    assert_eq!(cache.get("missing"), None);

    cache.insert_entry(
        "old",
        CacheEntry {
            value: "Jazz".into(),
            ts: now() - 8.0 * DAY,
        },
    );
    cache.insert_entry(
        "recent",
        CacheEntry {
            value: "Blues".into(),
            ts: now() - 6.0 * DAY,
        },
    );
    assert_eq!(cache.get("old"), None);
    assert_eq!(cache.get("recent").as_deref(), Some("Blues"));
}

#[test]
fn put_overwrites_and_restamps() {
    let cache = EntryCache::new(&CacheConfig::new());
    cache.insert_entry(
        "k",
        CacheEntry {
            value: "Old".into(),
            ts: now() - 30.0 * DAY,
        },
    );
    cache.put("k", "New");
    let entry = cache.get_entry("k").unwrap();
    assert_eq!(entry.value, "New");
    assert!(now() - entry.ts < 60.0);
}

#[test]
fn purge_expired_removes_only_stale_entries() {
    let cache = EntryCache::new(&CacheConfig::new().expiry(Duration::from_secs(3600)));
    cache.put("fresh", "Jazz");
    cache.insert_entry(
        "stale",
        CacheEntry {
            value: "Rock".into(),
            ts: now() - 7200.0,
        },
    );
    assert_eq!(cache.len(), 2);

    assert_eq!(cache.purge_expired(), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.purge_expired(), 0);
}

#[tokio::test]
async fn missing_snapshot_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EntryCache::open(CacheConfig::new().path(dir.path().join("cache.json"))).await;
    assert!(cache.is_empty());
    cache.close().await;
}

#[tokio::test]
async fn close_flushes_and_reopen_restores() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.json");

    let cache = EntryCache::open(CacheConfig::new().path(&path)).await;
    cache.put("genre\u{1f}m\u{1f}So What\u{1f}Miles Davis", "Jazz");
    cache.put("mood\u{1f}m\u{1f}Untitled\u{1f}Nobody", "");
    cache.close().await;

    let doc = read_snapshot(&path);
    assert_eq!(doc.len(), 2);
    let entry = &doc["genre\u{1f}m\u{1f}So What\u{1f}Miles Davis"];
    assert_eq!(entry["value"], "Jazz");
    assert!(entry["ts"].is_f64());

    let reopened = EntryCache::open(CacheConfig::new().path(&path)).await;
    assert_eq!(
        reopened
            .get("genre\u{1f}m\u{1f}So What\u{1f}Miles Davis")
            .as_deref(),
        Some("Jazz")
    );
    assert_eq!(
        reopened.get("mood\u{1f}m\u{1f}Untitled\u{1f}Nobody").as_deref(),
        Some("")
    );
    reopened.close().await;
}

#[tokio::test]
async fn load_drops_expired_and_malformed_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let doc = serde_json::json!({
        "fresh": { "value": "Jazz", "ts": now() - DAY },
        "expired": { "value": "Rock", "ts": now() - 10.0 * DAY },
        "no_ts": { "value": "Pop" },
        "wrong_type": { "value": 42, "ts": now() },
        "not_an_object": "Funk"
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let cache = EntryCache::new(&CacheConfig::new());
    let outcome = cache.load_from(&path).await;

    assert_eq!(outcome, LoadOutcome { kept: 1, removed: 4 });
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("fresh").as_deref(), Some("Jazz"));
}

#[tokio::test]
async fn corrupt_snapshot_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let cache = EntryCache::open(CacheConfig::new().path(&path)).await;
    assert!(cache.is_empty());

    // The next write replaces the corrupt file.
    cache.put("k", "v");
    cache.close().await;
    assert_eq!(read_snapshot(&path)["k"]["value"], "v");
}

#[tokio::test]
async fn persisted_snapshot_omits_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    let cache = EntryCache::new(&CacheConfig::new());
    cache.put("fresh", "Jazz");
    cache.insert_entry(
        "expired",
        CacheEntry {
            value: "Rock".into(),
            ts: now() - 8.0 * DAY,
        },
    );
    cache.save_to(&path).await.unwrap();

    let doc = read_snapshot(&path);
    assert!(doc.contains_key("fresh"));
    assert!(!doc.contains_key("expired"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_persist_requests_leave_a_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let cache = std::sync::Arc::new(EntryCache::open(CacheConfig::new().path(&path)).await);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let cache = std::sync::Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..50 {
                    cache.put(format!("key-{t}-{i}"), format!("value-{i}"));
                    cache.persist();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }
    cache.close().await;

    let doc = read_snapshot(&path);
    assert_eq!(doc.len(), 400);
    assert!(!dir.path().join("cache.json.tmp").exists());
}

#[tokio::test]
async fn clear_empties_memory_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    let cache = EntryCache::open(CacheConfig::new().path(&path)).await;
    cache.put("k", "v");
    cache.clear();
    assert!(cache.is_empty());
    cache.close().await;

    assert!(read_snapshot(&path).is_empty());
}

#[tokio::test]
async fn persist_after_close_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");

    let cache = EntryCache::open(CacheConfig::new().path(&path)).await;
    cache.close().await;
    cache.put("late", "value");
    cache.persist();
    assert_eq!(cache.get("late").as_deref(), Some("value"));
}

#[test]
fn put_into_full_cache_is_always_admitted() {
    let cache = EntryCache::new(&CacheConfig::new().max_entries(2));
    cache.put("a", "A");
    cache.put("b", "B");
    for _ in 0..10 {
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_some());
    }

    cache.put("c", "C");

    assert_eq!(cache.get("c").as_deref(), Some("C"));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("c").as_deref(), Some("C"));
}

#[tokio::test]
async fn open_reports_entries_dropped_while_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let doc = serde_json::json!({
        "fresh": { "value": "Jazz", "ts": now() },
        "expired": { "value": "Rock", "ts": now() - 10.0 * DAY },
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let (cache, outcome) = EntryCache::open_with_outcome(CacheConfig::new().path(&path)).await;

    assert_eq!(outcome, LoadOutcome { kept: 1, removed: 1 });
    assert_eq!(cache.purge_expired(), 0);
    cache.close().await;
}
