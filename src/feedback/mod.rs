//! Pronunciation-feedback request client.
//!
//! This module provides:
//! * [`FeedbackClient`] — async trait implemented by all feedback backends.
//! * [`ApiFeedbackClient`] — OpenAI-compatible REST API client.
//! * [`PromptBuilder`] — builds structured / free-text feedback prompts.
//! * [`PronunciationFeedback`] / [`WordScore`] — typed, validated response.
//! * [`FeedbackError`] / [`ConfigError`] — error variants for the request
//!   and for client construction.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pronounce_coach::config::AppConfig;
//! use pronounce_coach::feedback::{ApiFeedbackClient, FeedbackClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!
//!     // Construction-time failure: handled once, at the composition root.
//!     let client = ApiFeedbackClient::from_config(&config.feedback)
//!         .expect("feedback service is not configured");
//!
//!     let feedback = client
//!         .get_feedback(
//!             "The quick brown fox jumps over the lazy dog.",
//!             "data:audio/wav;base64,UklGRg==",
//!         )
//!         .await
//!         .unwrap();
//!     println!("{}/100 — {}", feedback.overall_score, feedback.overall_assessment);
//! }
//! ```

pub mod client;
pub mod prompt;
pub mod schema;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{ApiFeedbackClient, ConfigError, FeedbackClient, FeedbackError};
pub use prompt::PromptBuilder;
pub use schema::{PronunciationFeedback, SchemaError, WordScore};
