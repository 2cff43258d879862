//! Configuration loading.
//!
//! Configuration is loaded from a TOML file with the following resolution order:
//! 1. Explicit path (CLI flag or host setting); must exist
//! 2. `<config dir>/tagwise/config.toml` (e.g. `~/.config/tagwise/config.toml`)
//! 3. Built-in defaults
//!
//! Every field has a default, so a file only needs the values it changes.
//! API keys may come from the file or from the `TAGWISE_API_KEY` /
//! `OPENAI_API_KEY` environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::batch::BatchConfig;
use crate::cache::CacheConfig;
use crate::types::Operation;
use crate::{Result, TagwiseError};

/// Environment variables consulted for the API key, in order.
const API_KEY_ENV_VARS: &[&str] = &["TAGWISE_API_KEY", "OPENAI_API_KEY"];

/// Directory name under the platform config dir.
const APP_DIR: &str = "tagwise";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
}

/// Suggestion provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend kind: "ollama" or "openai" (default: "ollama").
    pub kind: String,
    /// Base URL; defaults per kind (Ollama: http://localhost:11434).
    pub base_url: Option<String>,
    /// Model identifier (default: "llama3").
    pub model: String,
    /// API key for remote providers.
    pub api_key: Option<String>,
    /// Per-call timeout in seconds (default: 60).
    pub timeout_secs: u64,
    /// Calls slower than this log a warning (default: 10).
    pub slow_call_warn_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".to_string(),
            base_url: None,
            model: "llama3".to_string(),
            api_key: None,
            timeout_secs: 60,
            slow_call_warn_secs: 10,
        }
    }
}

impl ProviderConfig {
    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from the file, else from the environment.
    ///
    /// A key present in the file but blank is treated as missing and does
    /// not fall through to the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        match &self.api_key {
            Some(key) => Some(key.trim().to_string()).filter(|k| !k.is_empty()),
            None => API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|k| !k.trim().is_empty()),
        }
    }
}

/// Worker admission settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Concurrent provider calls (default: 2).
    pub max_concurrency: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrency: crate::admission::DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Entry cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Snapshot file (default: `<config dir>/tagwise/suggestion_cache.json`).
    pub path: Option<PathBuf>,
    /// Keep the cache in memory only.
    pub in_memory: bool,
    /// Entry lifetime in days (default: 7).
    pub expiry_days: u64,
    /// Maximum in-memory entries (default: 50,000).
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: None,
            in_memory: false,
            expiry_days: 7,
            max_entries: 50_000,
        }
    }
}

impl CacheSection {
    /// Convert to a [`CacheConfig`], resolving the default path.
    pub fn to_cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new()
            .expiry(Duration::from_secs(self.expiry_days.saturating_mul(24 * 3600)))
            .max_entries(self.max_entries);
        if !self.in_memory {
            let path = self
                .path
                .clone()
                .or_else(|| app_dir().map(|dir| dir.join("suggestion_cache.json")));
            if let Some(path) = path {
                config = config.path(path);
            }
        }
        config
    }
}

/// Unmatched ledger settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Export directory (default: `<config dir>/tagwise/unmatched`).
    pub export_dir: Option<PathBuf>,
    /// Re-export every format on each record (default: true).
    pub write_through: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            export_dir: None,
            write_through: true,
        }
    }
}

impl LedgerConfig {
    /// Export directory with the default resolved.
    pub fn resolved_export_dir(&self) -> Option<PathBuf> {
        self.export_dir
            .clone()
            .or_else(|| app_dir().map(|dir| dir.join("unmatched")))
    }
}

/// Track enrichment settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Suggestions requested for each matched track (default: genre).
    pub operations: Vec<Operation>,
    /// Minimum fingerprint match score (default: 0.5).
    pub min_score: f64,
    /// Replace existing tag values (default: false).
    pub overwrite: bool,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            operations: vec![Operation::Genre],
            min_score: 0.5,
            overwrite: false,
        }
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided; missing file is an error)
    /// 2. `<config dir>/tagwise/config.toml`
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TagwiseError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            TagwiseError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(TagwiseError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        Ok(app_dir()
            .map(|dir| dir.join("config.toml"))
            .filter(|path| path.exists()))
    }

    /// Check settings that must hold before any batch work starts.
    pub fn validate(&self) -> Result<()> {
        self.batch.validate()?;
        if self.provider.model.trim().is_empty() {
            return Err(TagwiseError::Configuration(
                "provider.model must not be empty".to_string(),
            ));
        }
        if self.admission.max_concurrency == 0 {
            return Err(TagwiseError::Configuration(
                "admission.max_concurrency must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.enrich.min_score) {
            return Err(TagwiseError::Configuration(
                "enrich.min_score must be within 0.0..=1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// `<config dir>/tagwise`, if the platform has a config dir.
pub fn app_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}
