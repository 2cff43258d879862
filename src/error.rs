//! Tagwise error types

use std::time::Duration;

/// Failure of a single provider call.
///
/// The batch controller only needs to know that a call failed, but the
/// variant is kept intact for logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failure: {0}")]
    Connection(String),

    #[error("provider returned status {status}: {message}")]
    Protocol { status: u16, message: String },

    #[error("local failure: {0}")]
    Local(String),
}

impl ProviderError {
    /// Stable label for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Connection(_) => "connection",
            ProviderError::Protocol { .. } => "protocol",
            ProviderError::Local(_) => "local",
        }
    }

    /// Whether the failure is likely to clear up on its own
    /// (timeouts, dropped connections, rate limits and 5xx responses).
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Connection(_) => true,
            ProviderError::Protocol { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Local(_) => false,
        }
    }

    /// Classify a reqwest error that happened before a status was available.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else if err.is_connect() || err.is_request() {
            ProviderError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Protocol {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ProviderError::Local(err.to_string())
        }
    }
}

/// Tagwise error types
#[derive(Debug, thiserror::Error)]
pub enum TagwiseError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("missing API key for provider {0}")]
    MissingApiKey(String),

    // Provider errors
    #[error(transparent)]
    Provider(#[from] ProviderError),

    // Data errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TagwiseError {
    /// Whether this error should stop work before any batch begins.
    ///
    /// Configuration problems are reported once and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TagwiseError::Configuration(_)
                | TagwiseError::UnknownProvider(_)
                | TagwiseError::MissingApiKey(_)
                | TagwiseError::Toml(_)
        )
    }
}

/// Result type alias for Tagwise operations
pub type Result<T> = std::result::Result<T, TagwiseError>;
