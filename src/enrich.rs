//! Track enrichment.
//!
//! [`TrackEnricher`] drives the whole per-track flow:
//!
//! 1. fingerprint lookup for candidate recordings
//! 2. pick the best candidate at or above the minimum score
//! 3. optional release date lookup
//! 4. merge into the track's metadata
//! 5. model suggestions for the configured operations
//!
//! Fingerprinting and the metadata web service are collaborators behind
//! [`FingerprintLookup`] and [`ReleaseDateLookup`]. A track with no usable
//! candidate is recorded in the [`UnmatchedLedger`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::Result;
use crate::config::{Config, EnrichConfig};
use crate::engine::SuggestionEngine;
use crate::ledger::UnmatchedLedger;
use crate::status::{StatusSink, TracingStatus};
use crate::types::{
    LookupRequest, MatchCandidate, Operation, SuggestionOutcome, TrackFile, TrackMetadata,
    UnmatchedEntry,
};

/// Why a fingerprint lookup produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no fingerprint backend available")]
    NoBackend,

    #[error("fingerprinting failed: {0}")]
    Fingerprint(String),

    #[error("lookup service error: {0}")]
    WebService(String),
}

/// Finds candidate recordings for an audio file.
#[async_trait]
pub trait FingerprintLookup: Send + Sync {
    async fn lookup(
        &self,
        track: &TrackFile,
    ) -> std::result::Result<Vec<MatchCandidate>, LookupError>;
}

/// Resolves a recording's release date.
#[async_trait]
pub trait ReleaseDateLookup: Send + Sync {
    /// `None` when the date is unknown or the service is unavailable.
    async fn release_date(&self, recording_id: &str) -> Option<String>;
}

/// Result of enriching one track.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichOutcome {
    /// Merged metadata for a matched track.
    Matched(TrackMetadata),
    /// The track was recorded in the ledger.
    Unmatched(UnmatchedEntry),
}

impl EnrichOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, EnrichOutcome::Matched(_))
    }
}

/// Enriches tracks with matched metadata and model suggestions.
pub struct TrackEnricher {
    engine: Arc<SuggestionEngine>,
    fingerprints: Arc<dyn FingerprintLookup>,
    release_dates: Option<Arc<dyn ReleaseDateLookup>>,
    ledger: Arc<UnmatchedLedger>,
    status: Arc<dyn StatusSink>,
    operations: Vec<Operation>,
    min_score: f64,
    overwrite: bool,
}

impl TrackEnricher {
    pub fn new(
        engine: Arc<SuggestionEngine>,
        fingerprints: Arc<dyn FingerprintLookup>,
        ledger: Arc<UnmatchedLedger>,
    ) -> Self {
        let defaults = EnrichConfig::default();
        Self {
            engine,
            fingerprints,
            release_dates: None,
            ledger,
            status: Arc::new(TracingStatus),
            operations: defaults.operations,
            min_score: defaults.min_score,
            overwrite: defaults.overwrite,
        }
    }

    /// Build an enricher, its engine and its ledger from configuration.
    ///
    /// Setup failures are reported once through `status` and returned; no
    /// track is touched.
    pub async fn from_config(
        config: &Config,
        fingerprints: Arc<dyn FingerprintLookup>,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        let engine = match SuggestionEngine::from_config(config).await {
            Ok(engine) => engine,
            Err(e) => {
                error!(error = %e, "tagwise setup failed");
                status.status(&format!("Configuration error: {e}"));
                return Err(e);
            }
        };
        let ledger = UnmatchedLedger::from_config(&config.ledger);

        Ok(
            Self::new(Arc::new(engine), fingerprints, Arc::new(ledger))
                .with_config(&config.enrich)
                .status(status),
        )
    }

    /// Apply operations, minimum score and overwrite from configuration.
    pub fn with_config(mut self, config: &EnrichConfig) -> Self {
        self.operations = config.operations.clone();
        self.min_score = config.min_score;
        self.overwrite = config.overwrite;
        self
    }

    pub fn release_dates(mut self, lookup: Arc<dyn ReleaseDateLookup>) -> Self {
        self.release_dates = Some(lookup);
        self
    }

    pub fn status(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = sink;
        self
    }

    /// Operations to request suggestions for (empty disables suggestions).
    pub fn operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = operations;
        self
    }

    pub fn min_score(mut self, score: f64) -> Self {
        self.min_score = score;
        self
    }

    /// Replace existing non-empty tag values.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Ledger unmatched tracks are recorded in.
    pub fn ledger(&self) -> &Arc<UnmatchedLedger> {
        &self.ledger
    }

    pub fn engine(&self) -> &Arc<SuggestionEngine> {
        &self.engine
    }

    /// Flush the suggestion cache and stop its writer.
    pub async fn close(&self) {
        self.engine.close().await;
    }

    /// Enrich one track.
    pub async fn enrich(&self, track: &TrackFile) -> EnrichOutcome {
        let mut metadata = match self.identify(track).await {
            Ok(metadata) => metadata,
            Err(entry) => return self.unmatched(entry).await,
        };

        for request in self.suggestion_requests(&metadata) {
            let outcome = self.engine.suggest(&request).await;
            self.apply(&mut metadata, request.operation, &outcome);
        }
        EnrichOutcome::Matched(metadata)
    }

    /// Enrich many tracks, sending every suggestion through one adaptive
    /// batch run. Outcomes are in input order.
    pub async fn enrich_many(&self, tracks: &[TrackFile]) -> Vec<EnrichOutcome> {
        let mut identified = Vec::with_capacity(tracks.len());
        for track in tracks {
            identified.push(self.identify(track).await);
        }

        let mut requests = Vec::new();
        let mut owners = Vec::new();
        for (index, result) in identified.iter().enumerate() {
            if let Ok(metadata) = result {
                for request in self.suggestion_requests(metadata) {
                    owners.push(index);
                    requests.push(request);
                }
            }
        }

        if !requests.is_empty() {
            self.status
                .status(&format!("Requesting {} suggestions", requests.len()));
            let report = self.engine.suggest_batch(&requests).await;
            for ((index, request), outcome) in owners.iter().zip(&requests).zip(&report.outcomes) {
                if let Some(Ok(metadata)) = identified.get_mut(*index) {
                    self.apply(metadata, request.operation, outcome);
                }
            }
        }

        let mut outcomes = Vec::with_capacity(identified.len());
        for result in identified {
            outcomes.push(match result {
                Ok(metadata) => EnrichOutcome::Matched(metadata),
                Err(entry) => self.unmatched(entry).await,
            });
        }
        outcomes
    }

    /// Fingerprint, pick a candidate and merge it. The error side is the
    /// ledger entry to record.
    async fn identify(
        &self,
        track: &TrackFile,
    ) -> std::result::Result<TrackMetadata, UnmatchedEntry> {
        let name = track
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| track.path.display().to_string());
        self.status.status(&format!("Looking up {name}"));

        let candidates = match self.fingerprints.lookup(track).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(path = %track.path.display(), error = %e, "fingerprint lookup failed");
                return Err(UnmatchedEntry::for_track(track, e.to_string()));
            }
        };

        let Some(best) = best_candidate(&candidates, self.min_score) else {
            let reason = if candidates.is_empty() {
                "no fingerprint match".to_string()
            } else {
                format!(
                    "no candidate scored at least {:.2} ({} below threshold)",
                    self.min_score,
                    candidates.len()
                )
            };
            debug!(path = %track.path.display(), %reason, "track unmatched");
            let fingerprint = candidates.iter().find_map(|c| c.fingerprint.clone());
            return Err(UnmatchedEntry::for_track(track, reason).with_fingerprint(fingerprint));
        };

        let mut metadata = track.metadata.clone();
        metadata.merge_candidate(best, self.overwrite);

        if let Some(lookup) = &self.release_dates
            && let Some(date) = lookup.release_date(&best.recording_id).await
        {
            metadata.merge_date(&date, self.overwrite);
        }

        debug!(
            path = %track.path.display(),
            recording_id = %best.recording_id,
            score = best.score,
            "track matched"
        );
        Ok(metadata)
    }

    fn suggestion_requests(&self, metadata: &TrackMetadata) -> Vec<LookupRequest> {
        let title = metadata.title.as_deref().unwrap_or("");
        let artist = metadata.artist.as_deref().unwrap_or("");
        self.operations
            .iter()
            .filter(|op| self.overwrite || metadata.suggestion(**op).is_none())
            .map(|op| LookupRequest::new(*op, title, artist))
            .filter(|request| !request.is_skipped())
            .collect()
    }

    fn apply(&self, metadata: &mut TrackMetadata, operation: Operation, outcome: &SuggestionOutcome) {
        if let Some(value) = outcome.value() {
            metadata.merge_suggestion(operation, value, self.overwrite);
        }
    }

    /// Record on the blocking pool; write-through exports touch the disk.
    async fn unmatched(&self, entry: UnmatchedEntry) -> EnrichOutcome {
        let ledger = Arc::clone(&self.ledger);
        let recorded = entry.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || ledger.record(recorded)).await {
            error!(path = %entry.path.display(), error = %e, "recording unmatched track failed");
        }
        EnrichOutcome::Unmatched(entry)
    }
}

/// Highest-scoring candidate at or above `min_score`.
fn best_candidate(candidates: &[MatchCandidate], min_score: f64) -> Option<&MatchCandidate> {
    candidates
        .iter()
        .filter(|c| c.score >= min_score)
        .max_by(|a, b| a.score.total_cmp(&b.score))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f64) -> MatchCandidate {
        MatchCandidate {
            recording_id: id.into(),
            title: None,
            artist: None,
            album: None,
            score,
            fingerprint: None,
        }
    }

    #[test]
    fn best_candidate_picks_highest_above_threshold() {
        let candidates = [candidate("a", 0.4), candidate("b", 0.9), candidate("c", 0.7)];
        assert_eq!(best_candidate(&candidates, 0.5).unwrap().recording_id, "b");
    }

    #[test]
    fn best_candidate_respects_threshold() {
        let candidates = [candidate("a", 0.49)];
        assert!(best_candidate(&candidates, 0.5).is_none());
        assert!(best_candidate(&[], 0.0).is_none());
    }

    #[test]
    fn lookup_error_messages() {
        assert_eq!(
            LookupError::NoBackend.to_string(),
            "no fingerprint backend available"
        );
        assert!(
            LookupError::WebService("503".into())
                .to_string()
                .contains("503")
        );
    }
}
