//! SuggestionEngine - serves lookups through cache, admission and provider

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use super::EngineBuilder;
use crate::admission::WorkerAdmission;
use crate::batch::{BatchConfig, BatchSizer};
use crate::cache::EntryCache;
use crate::config::Config;
use crate::providers::{SuggestionProvider, build_provider};
use crate::types::{BatchReport, BatchStats, LookupRequest, SuggestionOutcome};
use crate::{ProviderError, Result, telemetry};

/// Serves [`LookupRequest`]s.
///
/// For one request: skip if title or artist is blank, else answer from the
/// cache, else wait for an admission slot and call the provider, caching
/// whatever comes back (including "no answer") and scheduling a background
/// persist. Failures are never cached.
pub struct SuggestionEngine {
    cache: Arc<EntryCache>,
    provider: Arc<dyn SuggestionProvider>,
    admission: WorkerAdmission,
    model: String,
    timeout: Duration,
    batch: BatchConfig,
}

impl SuggestionEngine {
    pub(crate) fn new(
        cache: Arc<EntryCache>,
        provider: Arc<dyn SuggestionProvider>,
        admission: WorkerAdmission,
        model: String,
        timeout: Duration,
        batch: BatchConfig,
    ) -> Self {
        Self {
            cache,
            provider,
            admission,
            model,
            timeout,
            batch,
        }
    }

    /// Start configuring an engine around `provider`.
    pub fn builder(provider: Arc<dyn SuggestionProvider>, model: impl Into<String>) -> EngineBuilder {
        EngineBuilder::new(provider, model)
    }

    /// Build an engine from configuration: validate, pick the provider and
    /// open the cache.
    ///
    /// Configuration problems surface here, before any work is attempted.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let provider = build_provider(&config.provider)?;
        let cache = EntryCache::open(config.cache.to_cache_config()).await;

        EngineBuilder::new(provider, config.provider.model.clone())
            .cache(Arc::new(cache))
            .max_concurrency(config.admission.max_concurrency)
            .batch(config.batch.clone())
            .timeout(config.provider.timeout())
            .build()
    }

    /// Serve one request.
    pub async fn suggest(&self, request: &LookupRequest) -> SuggestionOutcome {
        if request.is_skipped() {
            debug!(
                operation = %request.operation,
                title = %request.title,
                artist = %request.artist,
                "skipping lookup without title or artist"
            );
            return SuggestionOutcome::Skipped;
        }

        let operation = request.operation.as_str();
        let key = request.cache_key(&self.model);

        if let Some(value) = self.cache.get(&key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "operation" => operation).increment(1);
            return if value.is_empty() {
                SuggestionOutcome::Unknown
            } else {
                SuggestionOutcome::Cached(value)
            };
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "operation" => operation).increment(1);

        let prompt = request.prompt();
        let result = self
            .admission
            .run(async {
                match tokio::time::timeout(
                    self.timeout,
                    self.provider.call(&prompt, &self.model, self.timeout),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(self.timeout)),
                }
            })
            .await;

        match result {
            Ok(raw) => match request.operation.clean_response(&raw) {
                Some(value) => {
                    self.cache.put(key, value.clone());
                    self.cache.persist();
                    SuggestionOutcome::Suggested(value)
                }
                None => {
                    debug!(operation, title = %request.title, "provider had no answer");
                    self.cache.put(key, "");
                    self.cache.persist();
                    SuggestionOutcome::Unknown
                }
            },
            Err(error) => {
                warn!(
                    provider = self.provider.name(),
                    operation,
                    title = %request.title,
                    artist = %request.artist,
                    kind = error.kind(),
                    error = %error,
                    "suggestion lookup failed"
                );
                SuggestionOutcome::Failed(error)
            }
        }
    }

    /// Serve many requests in adaptively sized batches.
    ///
    /// Batches run one after another; members of a batch run concurrently
    /// (still subject to admission). After each batch its wall time and
    /// error count pick the next batch size. Outcomes come back in input
    /// order. Stored answers are persisted in the background as they land;
    /// the writer folds a batch's requests into one or two writes.
    pub async fn suggest_batch(&self, requests: &[LookupRequest]) -> BatchReport {
        let mut sizer = BatchSizer::new(&self.batch);
        let mut report = BatchReport {
            outcomes: Vec::with_capacity(requests.len()),
            batches: Vec::new(),
        };

        let mut remaining = requests;
        while !remaining.is_empty() {
            let size = sizer.current().min(remaining.len());
            let (batch, rest) = remaining.split_at(size);
            remaining = rest;

            let start = tokio::time::Instant::now();
            let outcomes = join_all(batch.iter().map(|request| self.suggest(request))).await;
            let elapsed = start.elapsed();

            let errors = outcomes.iter().filter(|o| o.is_error()).count();
            let next_size = sizer.observe(elapsed, errors);

            metrics::gauge!(telemetry::BATCH_SIZE).set(next_size as f64);
            metrics::histogram!(telemetry::BATCH_DURATION_SECONDS).record(elapsed.as_secs_f64());
            debug!(
                size,
                errors,
                elapsed_ms = elapsed.as_millis() as u64,
                next_size,
                "batch finished"
            );

            report.outcomes.extend(outcomes);
            report.batches.push(BatchStats {
                size,
                elapsed,
                errors,
                next_size,
            });
        }

        info!(
            requests = requests.len(),
            batches = report.batches.len(),
            errors = report.error_count(),
            cached = report.cached_count(),
            "batch run complete"
        );
        report
    }

    /// Change the number of concurrent provider calls.
    pub fn set_concurrency(&self, n: usize) {
        self.admission.set_limit(n);
    }

    /// Shared entry cache.
    pub fn cache(&self) -> &Arc<EntryCache> {
        &self.cache
    }

    /// Admission queue used for provider calls.
    pub fn admission(&self) -> &WorkerAdmission {
        &self.admission
    }

    /// Model every request is sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Name of the configured provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Flush the cache and stop its background writer.
    pub async fn close(&self) {
        self.cache.close().await;
    }
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
