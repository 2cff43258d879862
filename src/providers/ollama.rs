//! Ollama client for local suggestion models.
//!
//! Uses the non-streaming generate endpoint.
//! See: <https://github.com/ollama/ollama/blob/main/docs/api.md#generate-a-completion>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::SuggestionProvider;
use super::{DEFAULT_SLOW_CALL_WARN, error_from_response, record_call};
use crate::{ProviderError, Result, TagwiseError};

/// Default base URL for a local Ollama server.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Client for an Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    slow_call_warn: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| TagwiseError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            slow_call_warn: DEFAULT_SLOW_CALL_WARN,
        })
    }

    /// Create a client for the default local server.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_OLLAMA_URL)
    }

    /// Warn about calls slower than this (default: 10s).
    pub fn slow_call_warn(mut self, threshold: Duration) -> Self {
        self.slow_call_warn = threshold;
        self
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let status = response.status().as_u16();
        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::Protocol {
                    status,
                    message: format!("invalid response body: {e}"),
                }
            }
        })?;

        Ok(body.response)
    }
}

#[async_trait]
impl SuggestionProvider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn call(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ProviderError> {
        let start = Instant::now();
        let result = self.generate(prompt, model, timeout).await;
        record_call(self.name(), model, start, self.slow_call_warn, &result);
        result
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}
