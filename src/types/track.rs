//! Track, match candidate and ledger entry types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Operation;

/// Tag fields tagwise reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TrackMetadata {
    /// Mutable slot holding the value for a suggestion operation.
    pub fn suggestion_slot(&mut self, operation: Operation) -> &mut Option<String> {
        match operation {
            Operation::Genre => &mut self.genre,
            Operation::Mood => &mut self.mood,
            Operation::Style => &mut self.style,
            Operation::LanguageCode => &mut self.language,
        }
    }

    /// Current value for a suggestion operation.
    pub fn suggestion(&self, operation: Operation) -> Option<&str> {
        match operation {
            Operation::Genre => self.genre.as_deref(),
            Operation::Mood => self.mood.as_deref(),
            Operation::Style => self.style.as_deref(),
            Operation::LanguageCode => self.language.as_deref(),
        }
        .filter(|v| !v.trim().is_empty())
    }

    /// Merge a fingerprint match into this metadata.
    ///
    /// Existing non-empty fields win unless `overwrite` is set.
    pub fn merge_candidate(&mut self, candidate: &MatchCandidate, overwrite: bool) {
        merge_field(&mut self.title, candidate.title.as_deref(), overwrite);
        merge_field(&mut self.artist, candidate.artist.as_deref(), overwrite);
        merge_field(&mut self.album, candidate.album.as_deref(), overwrite);
        merge_field(
            &mut self.recording_id,
            Some(candidate.recording_id.as_str()),
            overwrite,
        );
    }

    /// Merge a value into an arbitrary slot with the same precedence rule.
    pub fn merge_suggestion(&mut self, operation: Operation, value: &str, overwrite: bool) {
        merge_field(self.suggestion_slot(operation), Some(value), overwrite);
    }

    /// Merge a release date.
    pub fn merge_date(&mut self, date: &str, overwrite: bool) {
        merge_field(&mut self.date, Some(date), overwrite);
    }
}

fn merge_field(slot: &mut Option<String>, value: Option<&str>, overwrite: bool) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    let occupied = slot.as_deref().is_some_and(|v| !v.trim().is_empty());
    if overwrite || !occupied {
        *slot = Some(value.to_string());
    }
}

/// An audio file handed over by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFile {
    pub path: PathBuf,
    /// Container/codec name, e.g. "flac" or "mp3".
    #[serde(default)]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Tags already present on the file.
    #[serde(default)]
    pub metadata: TrackMetadata,
}

impl TrackFile {
    /// Create a track with only a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the format.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Set the duration.
    pub fn duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Set existing title and artist tags.
    pub fn tagged(mut self, title: impl Into<String>, artist: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self.metadata.artist = Some(artist.into());
        self
    }
}

/// One candidate recording returned by a fingerprint lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub recording_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Match confidence in `0.0..=1.0`.
    pub score: f64,
    /// Fingerprint the lookup was made with, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// A track that produced no confident result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl UnmatchedEntry {
    /// Build an entry for `track` stamped with the current time.
    pub fn for_track(track: &TrackFile, reason: impl Into<String>) -> Self {
        Self {
            path: track.path.clone(),
            format: track.format.clone(),
            duration_secs: track.duration_secs,
            fingerprint: None,
            reason: reason.into(),
            title: track.metadata.title.clone(),
            artist: track.metadata.artist.clone(),
            album: track.metadata.album.clone(),
            recorded_at: Utc::now(),
        }
    }

    /// Attach the fingerprint used for the failed lookup.
    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }
}
