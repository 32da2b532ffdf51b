//! Prompt builder for the pronunciation-feedback request.
//!
//! [`PromptBuilder`] produces a `(system_msg, user_msg)` pair for any
//! OpenAI-compatible `/v1/chat/completions` endpoint.  The mode is selected
//! at construction time: [`FeedbackMode::Structured`] asks for the full
//! word-level breakdown, [`FeedbackMode::FreeText`] for score and assessment
//! only.  Both instruct the model to reply with a single JSON object so the
//! response can be validated against [`crate::feedback::PronunciationFeedback`].

use crate::config::FeedbackMode;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Structured mode — overall score, assessment, word scores, suggestions.
const SYSTEM_INSTRUCTION_STRUCTURED: &str = "\
You are a pronunciation coach. You receive a practice text and an audio
recording of a learner pronouncing that text. Evaluate the pronunciation
accuracy and reply with ONLY a JSON object, no prose and no markdown, with
these fields:

1. \"overallScore\": integer 0 (very poor) to 100 (native-like).
2. \"overallAssessment\": one-sentence qualitative assessment
   (e.g. \"Excellent pronunciation\", \"Good effort, some sounds need work\").
3. \"wordScores\": array of {\"word\", \"score\", \"comment\"} objects for key
   or problematic words, each scored 0-100 (comment is optional).
4. \"suggestions\": array of 1-3 specific, actionable suggestions focusing on
   the most critical errors (e.g. \"Focus on the 'th' sound in 'the'\").
   If pronunciation is excellent, say so.

Be concise and encouraging.";

/// Free-text mode — overall score and a prose assessment only.
const SYSTEM_INSTRUCTION_FREE_TEXT: &str = "\
You are a pronunciation coach. You receive a practice text and an audio
recording of a learner pronouncing that text. Evaluate the pronunciation
accuracy and reply with ONLY a JSON object, no prose and no markdown, with
these fields:

1. \"overallScore\": integer 0 (very poor) to 100 (native-like).
2. \"overallAssessment\": personalized feedback on the pronunciation,
   including suggestions for improvement.

Be specific, actionable, encouraging and supportive.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds the chat messages for one feedback request.
///
/// # Example
/// ```rust
/// use pronounce_coach::config::FeedbackMode;
/// use pronounce_coach::feedback::PromptBuilder;
///
/// let builder = PromptBuilder::new(FeedbackMode::Structured);
/// let (system, user) = builder.build_chat("The quick brown fox.");
/// assert!(system.contains("pronunciation coach"));
/// assert!(user.contains("The quick brown fox."));
/// ```
pub struct PromptBuilder {
    mode: FeedbackMode,
}

impl PromptBuilder {
    pub fn new(mode: FeedbackMode) -> Self {
        Self { mode }
    }

    /// The system instruction for the configured mode.
    pub fn system_instruction(&self) -> &'static str {
        match self.mode {
            FeedbackMode::Structured => SYSTEM_INSTRUCTION_STRUCTURED,
            FeedbackMode::FreeText => SYSTEM_INSTRUCTION_FREE_TEXT,
        }
    }

    /// Build the `(system_msg, user_msg)` pair.
    ///
    /// The audio itself travels as a separate `input_audio` content part of
    /// the user message; the user text only names the practice sentence.
    pub fn build_chat(&self, practice_text: &str) -> (String, String) {
        let user = format!(
            "Analyze the attached audio recording of a user pronouncing the \
             given text.\n\nText to pronounce:\n\"{practice_text}\""
        );
        (self.system_instruction().to_string(), user)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
