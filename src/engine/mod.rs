//! Suggestion engine: cache, admission and provider wired together.

mod builder;
mod suggest;

pub use builder::EngineBuilder;
pub use suggest::SuggestionEngine;
