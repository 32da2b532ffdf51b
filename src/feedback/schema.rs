//! Typed feedback response and boundary validation.
//!
//! The feedback service returns JSON; it is deserialised into
//! [`PronunciationFeedback`] and validated field-by-field exactly once at the
//! service boundary.  A response that deserialises but carries out-of-range
//! or empty required fields is rejected — never surfaced as a partial
//! success.
//!
//! Wire field names are camelCase (`overallScore`, `wordScores`, …) to match
//! the schema the prompt instructs the model to produce.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// WordScore
// ---------------------------------------------------------------------------

/// Per-word pronunciation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordScore {
    /// The specific word being scored.
    pub word: String,
    /// Pronunciation score for the word (0–100).
    pub score: u8,
    /// Optional short remark about this word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// PronunciationFeedback
// ---------------------------------------------------------------------------

/// Structured pronunciation feedback for one recording session.
///
/// `word_scores` and `suggestions` are optional: in free-text mode the model
/// is never asked for them, and even in structured mode it may omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationFeedback {
    /// Overall pronunciation score from 0 (very poor) to 100 (native-like).
    pub overall_score: u8,
    /// One-sentence qualitative assessment (e.g. "Good effort").
    pub overall_assessment: String,
    /// Scores for individual words in the pronounced text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_scores: Option<Vec<WordScore>>,
    /// Specific suggestions for improvement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// SchemaError
// ---------------------------------------------------------------------------

/// A structurally valid response that violates the feedback contract.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("overall score {0} is out of range 0-100")]
    ScoreOutOfRange(u8),

    #[error("overall assessment is empty")]
    EmptyAssessment,

    #[error("word score for {word:?} is out of range 0-100")]
    WordScoreOutOfRange { word: String },

    #[error("word score entry has an empty word")]
    EmptyWord,
}

impl PronunciationFeedback {
    /// Validate the contract the deserialiser cannot express: score ranges
    /// and non-empty required strings.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.overall_score > 100 {
            return Err(SchemaError::ScoreOutOfRange(self.overall_score));
        }
        if self.overall_assessment.trim().is_empty() {
            return Err(SchemaError::EmptyAssessment);
        }
        for ws in self.word_scores.iter().flatten() {
            if ws.word.trim().is_empty() {
                return Err(SchemaError::EmptyWord);
            }
            if ws.score > 100 {
                return Err(SchemaError::WordScoreOutOfRange {
                    word: ws.word.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
