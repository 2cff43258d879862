//! Telemetry metric name constants.
//!
//! Centralised metric names for tagwise operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `tagwise_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name (e.g. "ollama", "openai")
//! - `operation`: suggestion kind (e.g. "genre", "language")
//! - `status`: outcome: "ok" or the provider error kind

/// Total provider calls.
///
/// Labels: `provider`, `status` ("ok" | "timeout" | "connection" | "protocol" | "local").
pub const PROVIDER_REQUESTS_TOTAL: &str = "tagwise_provider_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `provider`.
pub const PROVIDER_REQUEST_DURATION_SECONDS: &str = "tagwise_provider_request_duration_seconds";

/// Total entry cache hits.
///
/// Labels: `operation`.
pub const CACHE_HITS_TOTAL: &str = "tagwise_cache_hits_total";

/// Total entry cache misses (including expired entries).
///
/// Labels: `operation`.
pub const CACHE_MISSES_TOTAL: &str = "tagwise_cache_misses_total";

/// Batch size chosen for the next batch.
pub const BATCH_SIZE: &str = "tagwise_batch_size";

/// Wall-clock duration of a whole batch in seconds.
pub const BATCH_DURATION_SECONDS: &str = "tagwise_batch_duration_seconds";

/// Work items currently holding an admission slot.
pub const ADMISSION_ACTIVE: &str = "tagwise_admission_active";

/// Work items waiting for an admission slot.
pub const ADMISSION_PENDING: &str = "tagwise_admission_pending";

/// Total unmatched tracks recorded in the ledger.
pub const UNMATCHED_TOTAL: &str = "tagwise_unmatched_total";
