//! Suggestion provider implementations.
//!
//! Two backends speak the same [`SuggestionProvider`] capability:
//!
//! - [`OllamaClient`]: local models through Ollama's generate endpoint.
//! - [`OpenAiClient`]: remote OpenAI-compatible chat completion APIs.
//!
//! [`build_provider`] picks one from configuration. Selection is a pure
//! function of [`ProviderConfig`]: no network traffic happens until the
//! first call.

pub mod ollama;
pub mod openai;
pub mod traits;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use traits::SuggestionProvider;

use crate::config::ProviderConfig;
use crate::telemetry;
use crate::{ProviderError, Result, TagwiseError};

/// Calls slower than this log a performance warning.
pub const DEFAULT_SLOW_CALL_WARN: Duration = Duration::from_secs(10);

/// Longest error body kept in a [`ProviderError::Protocol`] message.
const MAX_ERROR_BODY: usize = 512;

/// Backend kinds tagwise can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = TagwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            other => Err(TagwiseError::UnknownProvider(other.to_string())),
        }
    }
}

/// Build the configured provider.
///
/// Fails fast on an unknown kind, an empty base URL, or a remote provider
/// without an API key.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn SuggestionProvider>> {
    let kind: ProviderKind = config.kind.parse()?;
    let slow = Duration::from_secs(config.slow_call_warn_secs);

    if config
        .base_url
        .as_deref()
        .is_some_and(|url| url.trim().is_empty())
    {
        return Err(TagwiseError::Configuration(format!(
            "empty base_url for provider {kind}"
        )));
    }

    let provider: Arc<dyn SuggestionProvider> = match kind {
        ProviderKind::Ollama => {
            let url = config
                .base_url
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            Arc::new(OllamaClient::new(url)?.slow_call_warn(slow))
        }
        ProviderKind::OpenAi => {
            let key = config
                .resolved_api_key()
                .ok_or_else(|| TagwiseError::MissingApiKey(kind.to_string()))?;
            let url = config
                .base_url
                .as_deref()
                .unwrap_or(openai::DEFAULT_OPENAI_URL);
            Arc::new(OpenAiClient::with_base_url(key, url)?.slow_call_warn(slow))
        }
    };

    debug!(provider = %kind, model = %config.model, "provider configured");
    Ok(provider)
}

/// Turn a non-2xx response into a protocol error, keeping a bounded body excerpt.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    ProviderError::Protocol { status, message }
}

/// Record metrics for a finished call and warn about slow ones.
pub(crate) fn record_call(
    provider: &str,
    model: &str,
    start: Instant,
    slow_call_warn: Duration,
    result: &std::result::Result<String, ProviderError>,
) {
    let elapsed = start.elapsed();
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };

    metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::PROVIDER_REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
    )
    .record(elapsed.as_secs_f64());

    if elapsed > slow_call_warn {
        warn!(
            provider,
            model,
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = slow_call_warn.as_millis() as u64,
            "slow provider call"
        );
    }
}
