//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use tagwise::{
    LookupRequest, ProviderError, SuggestionEngine, SuggestionProvider, TrackFile, UnmatchedEntry,
    UnmatchedLedger, telemetry,
};

// ============================================================================
// Mock provider
// ============================================================================

struct EchoProvider;

#[async_trait]
impl SuggestionProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(
        &self,
        _prompt: &str,
        _model: &str,
        _timeout: Duration,
    ) -> Result<String, ProviderError> {
        Ok("Jazz".into())
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any entries of `kind` exist for a given metric name.
fn has_metric(snapshot: &SnapshotVec, kind: MetricKind, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == kind && key.key().name() == name)
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn batch_run_records_cache_and_batch_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let report = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let engine = SuggestionEngine::builder(Arc::new(EchoProvider), "test-model")
                    .build()
                    .unwrap();
                let requests = [
                    LookupRequest::genre("So What", "Miles Davis"),
                    LookupRequest::genre("So What", "Miles Davis"),
                    LookupRequest::genre("Freddie Freeloader", "Miles Davis"),
                ];
                engine.suggest_batch(&requests[..1]).await;
                engine.suggest_batch(&requests[1..]).await
            })
        })
    });
    assert_eq!(report.cached_count(), 1);

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 2);
    assert!(has_metric(&snapshot, MetricKind::Gauge, telemetry::BATCH_SIZE));
    assert!(has_metric(
        &snapshot,
        MetricKind::Histogram,
        telemetry::BATCH_DURATION_SECONDS
    ));
    assert!(has_metric(
        &snapshot,
        MetricKind::Gauge,
        telemetry::ADMISSION_ACTIVE
    ));
}

#[test]
fn ledger_records_unmatched_counter() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        let ledger = UnmatchedLedger::new();
        ledger.record(UnmatchedEntry::for_track(
            &TrackFile::new("/a.mp3"),
            "no match",
        ));
        ledger.record(UnmatchedEntry::for_track(
            &TrackFile::new("/b.mp3"),
            "no match",
        ));
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::UNMATCHED_TOTAL), 2);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let engine = SuggestionEngine::builder(Arc::new(EchoProvider), "test-model")
        .build()
        .unwrap();
    let outcome = engine
        .suggest(&LookupRequest::genre("So What", "Miles Davis"))
        .await;
    assert_eq!(outcome.value(), Some("Jazz"));
}
