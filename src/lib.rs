//! Tagwise - metadata suggestions for audio libraries
//!
//! This crate asks a local or remote language model to suggest genre, mood,
//! style or language tags for tracks, and keeps the expensive parts under
//! control:
//!
//! - an [`EntryCache`] with per-entry expiry and background persistence,
//! - a [`WorkerAdmission`] queue bounding concurrent provider calls,
//! - an adaptive [`BatchSizer`] that grows or shrinks batches from latency
//!   and error feedback,
//! - an [`UnmatchedLedger`] for tracks that need manual follow-up.
//!
//! # Example
//!
//! ```rust,no_run
//! use tagwise::{Config, LookupRequest, SuggestionEngine};
//!
//! #[tokio::main]
//! async fn main() -> tagwise::Result<()> {
//!     let config = Config::load(None)?;
//!     let engine = SuggestionEngine::from_config(&config).await?;
//!
//!     let report = engine
//!         .suggest_batch(&[
//!             LookupRequest::genre("So What", "Miles Davis"),
//!             LookupRequest::genre("Windowlicker", "Aphex Twin"),
//!         ])
//!         .await;
//!
//!     for outcome in &report.outcomes {
//!         println!("{:?}", outcome.value());
//!     }
//!     engine.close().await;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod batch;
pub mod cache;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod ledger;
pub mod providers;
pub mod status;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use admission::{AdmissionPermit, WorkerAdmission};
pub use batch::{BatchConfig, BatchSizer};
pub use cache::{CacheConfig, CacheEntry, EntryCache};
pub use config::Config;
pub use engine::{EngineBuilder, SuggestionEngine};
pub use enrich::{
    EnrichOutcome, FingerprintLookup, LookupError, ReleaseDateLookup, TrackEnricher,
};
pub use error::{ProviderError, Result, TagwiseError};
pub use ledger::{DirectoryExporter, ExportFormat, LedgerExporter, UnmatchedLedger};
pub use providers::{OllamaClient, OpenAiClient, SuggestionProvider, build_provider};
pub use status::{StatusSink, TracingStatus};
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    BatchReport, BatchStats, LookupRequest, MatchCandidate, Operation, SuggestionOutcome,
    TrackFile, TrackMetadata, UnmatchedEntry,
};
