//! Suggestion operation kinds and their prompt templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TagwiseError;

/// Answers a model gives when it does not know.
const UNKNOWN_ANSWERS: &[&str] = &["unknown", "n/a", "na", "none", "not sure", "unsure", "?"];

/// Kind of suggestion requested from the model.
///
/// Each kind has its own prompt template and its own cache namespace, so a
/// genre and a mood for the same track never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Genre,
    Mood,
    Style,
    LanguageCode,
}

impl Operation {
    /// All operation kinds, in display order.
    pub const ALL: [Operation; 4] = [
        Operation::Genre,
        Operation::Mood,
        Operation::Style,
        Operation::LanguageCode,
    ];

    /// Cache namespace and metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Genre => "genre",
            Operation::Mood => "mood",
            Operation::Style => "style",
            Operation::LanguageCode => "language",
        }
    }

    /// Render the prompt for a track.
    pub fn prompt(self, title: &str, artist: &str) -> String {
        match self {
            Operation::Genre => format!(
                "What is the music genre of the song \"{title}\" by \"{artist}\"? \
                 Answer with the genre name only, no explanation."
            ),
            Operation::Mood => format!(
                "Describe the mood of the song \"{title}\" by \"{artist}\" in one or two words. \
                 Answer with the mood only, no explanation."
            ),
            Operation::Style => format!(
                "What is the musical style or subgenre of the song \"{title}\" by \"{artist}\"? \
                 Answer with the style name only, no explanation."
            ),
            Operation::LanguageCode => format!(
                "What language are the lyrics of the song \"{title}\" by \"{artist}\" sung in? \
                 Answer with the ISO 639 language code only (for example: eng, fra, deu). \
                 If the song is instrumental answer zxx."
            ),
        }
    }

    /// Reduce a raw model answer to a tag value.
    ///
    /// Returns `None` when the model did not give a usable answer; the
    /// caller caches that as "known empty".
    pub fn clean_response(self, raw: &str) -> Option<String> {
        let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
        let line = line
            .trim_start_matches(['-', '*', '•', '>'])
            .trim()
            .trim_matches(['"', '\'', '`', '“', '”'])
            .trim_end_matches(['.', '!', ',', ';', ':'])
            .trim();
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.is_empty() || UNKNOWN_ANSWERS.contains(&collapsed.to_lowercase().as_str()) {
            return None;
        }

        match self {
            Operation::LanguageCode => {
                let code = collapsed.to_lowercase();
                let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
                valid.then_some(code)
            }
            _ => Some(collapsed),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = TagwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "genre" => Ok(Operation::Genre),
            "mood" => Ok(Operation::Mood),
            "style" => Ok(Operation::Style),
            "language" | "language_code" | "language-code" | "lang" => Ok(Operation::LanguageCode),
            other => Err(TagwiseError::InvalidInput(format!(
                "unknown operation: {other}"
            ))),
        }
    }
}
