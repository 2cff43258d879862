//! Client for remote OpenAI-compatible chat completion APIs.
//!
//! Sends the prompt as a single user message and returns the first
//! choice's content. Works against OpenAI itself and compatible servers
//! (LM Studio, vLLM, llama.cpp server, ...).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::SuggestionProvider;
use super::{DEFAULT_SLOW_CALL_WARN, error_from_response, record_call};
use crate::{ProviderError, Result, TagwiseError};

/// Default base URL for the OpenAI API.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Client for an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    http: Client,
    base_url: String,
    slow_call_warn: Duration,
}

impl OpenAiClient {
    /// Create a client for the OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_OPENAI_URL)
    }

    /// Create a client with a custom base URL (for compatible servers and wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(TagwiseError::MissingApiKey("openai".to_string()));
        }
        let http = Client::builder()
            .build()
            .map_err(|e| TagwiseError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            slow_call_warn: DEFAULT_SLOW_CALL_WARN,
        })
    }

    /// Warn about calls slower than this (default: 10s).
    pub fn slow_call_warn(mut self, threshold: Duration) -> Self {
        self.slow_call_warn = threshold;
        self
    }

    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                stream: false,
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let status = response.status().as_u16();
        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::Protocol {
                    status,
                    message: format!("invalid response body: {e}"),
                }
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Protocol {
                status,
                message: "response contained no choices".to_string(),
            })
    }
}

#[async_trait]
impl SuggestionProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn call(
        &self,
        prompt: &str,
        model: &str,
        timeout: Duration,
    ) -> std::result::Result<String, ProviderError> {
        let start = Instant::now();
        let result = self.complete(prompt, model, timeout).await;
        record_call(self.name(), model, start, self.slow_call_warn, &result);
        result
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
