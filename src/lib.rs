//! Pronounce Coach — pronunciation-practice core.
//!
//! Records a short utterance from the default input device, encodes it into
//! a base64 data URI, and sends it together with the practice text to an
//! OpenAI-compatible chat endpoint for structured pronunciation feedback.
//!
//! # Module map
//!
//! * [`audio`]    — cpal capture, chunk buffering, WAV data-URI encoding.
//! * [`config`]   — TOML configuration and platform paths.
//! * [`feedback`] — feedback request client, prompt building, response schema.
//! * [`session`]  — the session state machine tying it all together.

pub mod audio;
pub mod config;
pub mod feedback;
pub mod session;
