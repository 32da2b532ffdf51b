//! Session state machine data and shared application state.
//!
//! [`SessionPhase`] drives the recording state machine.  The presentation
//! layer reads it via [`SharedState`] to render the appropriate view.
//!
//! [`SessionState`] is the single source of truth for one practice session:
//! current phase, practice text, encoded audio, elapsed recording time, and
//! the terminal feedback or error.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<SessionState>>` — cheap to
//! clone and safe to share across tasks.

use std::sync::{Arc, Mutex};

use crate::feedback::PronunciationFeedback;

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Phases of one pronunciation-practice session.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──start──▶ Recording ──stop / max duration──▶ Encoding
///                                                      ├─encoded──▶ AwaitingFeedback
///                                                      │              ├─success─▶ Ready
///                                                      │              └─failure─▶ Failed
///                                                      └─encode failed──────────▶ Failed
/// Ready / Failed / AwaitingFeedback ──start──▶ Recording   (full reset)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the user to start recording.
    Idle,

    /// Microphone is acquired; chunks are accumulating in the session's
    /// chunk buffer while the timer counts towards the duration cap.
    Recording,

    /// Capture has been released; the chunks are being encoded into a
    /// data URI.
    Encoding,

    /// The feedback request is in flight.
    AwaitingFeedback,

    /// Feedback arrived and validated; `feedback` is set.
    Ready,

    /// The session failed; `error` is set.  The encoded audio (when the
    /// failure happened after encoding) remains available for playback.
    Failed,
}

impl SessionPhase {
    /// Returns `true` while the session is actively capturing or processing.
    ///
    /// The presentation layer uses this to disable the start control.
    ///
    /// ```
    /// use pronounce_coach::session::SessionPhase;
    ///
    /// assert!(!SessionPhase::Idle.is_busy());
    /// assert!(SessionPhase::Recording.is_busy());
    /// assert!(SessionPhase::Encoding.is_busy());
    /// assert!(SessionPhase::AwaitingFeedback.is_busy());
    /// assert!(!SessionPhase::Ready.is_busy());
    /// assert!(!SessionPhase::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionPhase::Recording | SessionPhase::Encoding | SessionPhase::AwaitingFeedback
        )
    }

    /// Returns `true` for the two terminal phases.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Ready | SessionPhase::Failed)
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "Idle",
            SessionPhase::Recording => "Recording",
            SessionPhase::Encoding => "Encoding",
            SessionPhase::AwaitingFeedback => "Processing",
            SessionPhase::Ready => "Done",
            SessionPhase::Failed => "Error",
        }
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Shared session state — the single source of truth for the presentation
/// layer.
///
/// Held behind [`SharedState`] (`Arc<Mutex<SessionState>>`).  The session
/// runner mutates it; the UI reads it.
///
/// Invariants:
/// * exactly one of `{feedback, error}` is set in a terminal phase, both are
///   unset otherwise;
/// * `encoded_audio` is set iff the session passed through `Encoding`
///   successfully, and is never cleared by a feedback-service failure;
/// * `elapsed_ms` never exceeds the configured maximum.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Current phase of the session state machine.
    pub phase: SessionPhase,

    /// Monotonically increasing session identity.  A late feedback result
    /// whose id no longer matches is dropped instead of overwriting a newer
    /// session.
    pub session_id: u64,

    /// The text the user is attempting to pronounce; immutable for the
    /// duration of one session.
    pub practice_text: String,

    /// Encoded recording (`data:<mime>;base64,<payload>`), set once at the
    /// end of `Encoding` and never mutated afterward.
    pub encoded_audio: Option<String>,

    /// Elapsed recording time in milliseconds; drives the progress
    /// indicator and the enforced duration cap.
    pub elapsed_ms: u64,

    /// Validated feedback, populated only on successful completion.
    pub feedback: Option<PronunciationFeedback>,

    /// Human-readable failure description; mutually exclusive with
    /// `feedback`.
    pub error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`SessionState`].
///
/// Cheap to clone (`Arc` clone).  Lock with `.lock().unwrap()` for a short
/// critical section; do **not** hold the lock across `.await` points.
pub type SharedState = Arc<Mutex<SessionState>>;

/// Construct a new [`SharedState`] wrapping a default [`SessionState`].
pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(SessionState::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
