//! Lookup request type.

use serde::{Deserialize, Serialize};

use super::Operation;

/// Separator between cache key components.
///
/// A control character keeps `("a|b", "c")` and `("a", "b|c")` distinct.
const KEY_SEPARATOR: &str = "\u{1f}";

/// A single suggestion request for one track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupRequest {
    pub title: String,
    pub artist: String,
    pub operation: Operation,
}

impl LookupRequest {
    /// Create a request for the given operation.
    pub fn new(operation: Operation, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            operation,
        }
    }

    /// Shorthand for a genre request.
    pub fn genre(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self::new(Operation::Genre, title, artist)
    }

    /// Whether this request lacks the fields needed to ask anything.
    ///
    /// Skipped requests never touch the cache, the admission queue or the
    /// provider.
    pub fn is_skipped(&self) -> bool {
        self.title.trim().is_empty() || self.artist.trim().is_empty()
    }

    /// Cache key for this request against `model`.
    ///
    /// Exact match on all components; no normalisation is applied.
    pub fn cache_key(&self, model: &str) -> String {
        [
            self.operation.as_str(),
            model,
            self.title.as_str(),
            self.artist.as_str(),
        ]
        .join(KEY_SEPARATOR)
    }

    /// Prompt text for this request.
    pub fn prompt(&self) -> String {
        self.operation.prompt(&self.title, &self.artist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_deterministic() {
        let a = LookupRequest::genre("So What", "Miles Davis");
        let b = LookupRequest::genre("So What", "Miles Davis");
        assert_eq!(a.cache_key("llama3"), b.cache_key("llama3"));
    }

    #[test]
    fn cache_key_differs_on_operation() {
        let a = LookupRequest::new(Operation::Genre, "So What", "Miles Davis");
        let b = LookupRequest::new(Operation::Mood, "So What", "Miles Davis");
        assert_ne!(a.cache_key("llama3"), b.cache_key("llama3"));
    }

    #[test]
    fn cache_key_differs_on_model() {
        let r = LookupRequest::genre("So What", "Miles Davis");
        assert_ne!(r.cache_key("llama3"), r.cache_key("mistral"));
    }

    #[test]
    fn cache_key_keeps_fields_apart() {
        let a = LookupRequest::genre("ab", "c");
        let b = LookupRequest::genre("a", "bc");
        assert_ne!(a.cache_key("m"), b.cache_key("m"));
    }

    #[test]
    fn empty_title_or_artist_is_skipped() {
        assert!(LookupRequest::genre("", "Miles Davis").is_skipped());
        assert!(LookupRequest::genre("So What", "  ").is_skipped());
        assert!(!LookupRequest::genre("So What", "Miles Davis").is_skipped());
    }
}
