//! Builder for configuring engine instances

use std::sync::Arc;
use std::time::Duration;

use super::SuggestionEngine;
use crate::admission::{DEFAULT_MAX_CONCURRENCY, WorkerAdmission};
use crate::batch::BatchConfig;
use crate::cache::{CacheConfig, EntryCache};
use crate::providers::SuggestionProvider;
use crate::{Result, TagwiseError};

/// Default per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for [`SuggestionEngine`].
pub struct EngineBuilder {
    provider: Arc<dyn SuggestionProvider>,
    model: String,
    cache: Option<Arc<EntryCache>>,
    admission: Option<WorkerAdmission>,
    max_concurrency: usize,
    batch: BatchConfig,
    timeout: Duration,
}

impl EngineBuilder {
    pub fn new(provider: Arc<dyn SuggestionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            cache: None,
            admission: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            batch: BatchConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Share an existing cache (default: a fresh in-memory cache).
    pub fn cache(mut self, cache: Arc<EntryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share an existing admission queue.
    ///
    /// Overrides [`max_concurrency`](Self::max_concurrency).
    pub fn admission(mut self, admission: WorkerAdmission) -> Self {
        self.admission = Some(admission);
        self
    }

    /// Concurrent provider calls (default: 2).
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Batch sizing for [`SuggestionEngine::suggest_batch`].
    pub fn batch(mut self, config: BatchConfig) -> Self {
        self.batch = config;
        self
    }

    /// Per-call timeout (default: 60s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<SuggestionEngine> {
        if self.model.trim().is_empty() {
            return Err(TagwiseError::Configuration(
                "model must not be empty".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(TagwiseError::Configuration(
                "timeout must be greater than zero".to_string(),
            ));
        }
        self.batch.validate()?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(EntryCache::new(&CacheConfig::new())));
        let admission = self
            .admission
            .unwrap_or_else(|| WorkerAdmission::new(self.max_concurrency));

        Ok(SuggestionEngine::new(
            cache,
            self.provider,
            admission,
            self.model,
            self.timeout,
            self.batch,
        ))
    }
}
