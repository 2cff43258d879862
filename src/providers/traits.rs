//! Provider trait for suggestion backends.
//!
//! Every backend exposes the same single capability: send a prompt to a
//! model and get text back. Operation kinds (genre, mood, ...) differ only in
//! the prompt, so there is no per-operation provider.
//!
//! # Error Semantics
//!
//! Implementations classify failures into [`ProviderError`] variants and
//! never cache anything themselves; caching is the caller's job.

use std::time::Duration;

use async_trait::async_trait;

use crate::ProviderError;

/// A backend that answers prompts.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Send `prompt` to `model` and return the raw answer text.
    ///
    /// The call must give up after `timeout` with [`ProviderError::Timeout`].
    async fn call(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError>;
}
