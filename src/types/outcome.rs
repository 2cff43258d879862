//! Suggestion results and batch statistics.

use std::time::Duration;

use crate::ProviderError;

/// Result of serving one [`LookupRequest`](super::LookupRequest).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// Fresh answer from the provider.
    Suggested(String),
    /// Answer served from the entry cache.
    Cached(String),
    /// The provider (now or earlier) had no usable answer.
    Unknown,
    /// The request lacked a title or artist and was not attempted.
    Skipped,
    /// The provider call failed.
    Failed(ProviderError),
}

impl SuggestionOutcome {
    /// The suggested value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            SuggestionOutcome::Suggested(v) | SuggestionOutcome::Cached(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this outcome counts against the batch when sizing the next one.
    ///
    /// Skipped requests carry no result and count, like failures.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SuggestionOutcome::Failed(_) | SuggestionOutcome::Skipped
        )
    }

    /// Whether the value came from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, SuggestionOutcome::Cached(_))
    }
}

/// Measurements for one dispatched batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    /// Number of requests in the batch.
    pub size: usize,
    /// Wall time from dispatch until every member resolved.
    pub elapsed: Duration,
    /// Members counted as errors.
    pub errors: usize,
    /// Batch size chosen for the following batch.
    pub next_size: usize,
}

/// Result of [`SuggestionEngine::suggest_batch`](crate::SuggestionEngine::suggest_batch).
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// One outcome per input request, in input order.
    pub outcomes: Vec<SuggestionOutcome>,
    /// One entry per dispatched batch, in dispatch order.
    pub batches: Vec<BatchStats>,
}

impl BatchReport {
    /// Total number of outcomes counted as errors.
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }

    /// Number of outcomes served from cache.
    pub fn cached_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_cached()).count()
    }
}
