//! Public types for the Tagwise API.

mod operation;
mod outcome;
mod request;
mod track;

pub use operation::Operation;
pub use outcome::{BatchReport, BatchStats, SuggestionOutcome};
pub use request::LookupRequest;
pub use track::{MatchCandidate, TrackFile, TrackMetadata, UnmatchedEntry};
