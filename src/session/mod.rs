//! Practice-session orchestration for Pronounce Coach.
//!
//! This module wires the full record → encode → feedback flow and exposes
//! the shared state the presentation layer reads.
//!
//! # Architecture
//!
//! ```text
//! SessionEvent (mpsc)
//!        │
//!        ▼
//! SessionRunner::run()  ← async tokio task
//!        │
//!        ├─ Start { practice_text } → probe encodings, acquire device
//!        │                            → Recording (timer ticks elapsed_ms)
//!        │
//!        └─ Stop (or duration cap)
//!              │
//!              ├─ release device, drain ChunkBuffer
//!              ├─ encode_chunks → data URI                → Encoding
//!              └─ spawn FeedbackClient::get_feedback      → AwaitingFeedback
//!                    └─ Ready / Failed (stale results dropped by id)
//!
//! SharedState (Arc<Mutex<SessionState>>) ←─── read by the presentation layer
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! use pronounce_coach::audio::CpalCapture;
//! use pronounce_coach::config::AppConfig;
//! use pronounce_coach::feedback::ApiFeedbackClient;
//! use pronounce_coach::session::{new_shared_state, SessionEvent, SessionRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let state = new_shared_state();
//!     let client = ApiFeedbackClient::from_config(&config.feedback)
//!         .expect("feedback service is not configured");
//!
//!     let runner = SessionRunner::new(
//!         Arc::clone(&state),
//!         Arc::new(CpalCapture::new()),
//!         Arc::new(client),
//!         config,
//!     );
//!
//!     let (tx, rx) = mpsc::channel(16);
//!     tokio::spawn(runner.run(rx));
//!
//!     tx.send(SessionEvent::Start {
//!         practice_text: "The quick brown fox jumps over the lazy dog.".into(),
//!     })
//!     .await
//!     .unwrap();
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{SessionEvent, SessionRunner};
pub use state::{new_shared_state, SessionPhase, SessionState, SharedState};
