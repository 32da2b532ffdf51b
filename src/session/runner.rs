//! Session runner — drives the record → encode → feedback state machine.
//!
//! [`SessionRunner`] owns the [`SharedState`] and responds to
//! [`SessionEvent`]s received over a `tokio::sync::mpsc` channel.
//!
//! # Session flow
//!
//! ```text
//! SessionEvent::Start { practice_text }
//!   └─▶ probe encodings, fresh chunk sink, acquire device   [Recording]
//!
//! timer tick (tokio interval, only while capture is active)
//!   └─▶ elapsed_ms += tick; at the cap, synthesize one stop
//!
//! SessionEvent::Stop
//!   └─▶ release device, drain chunks, encode                [Encoding]
//!         ├─ Ok  → set encoded_audio, spawn feedback task   [AwaitingFeedback]
//!         │         ├─ Ok  (id still current) → feedback    [Ready]
//!         │         └─ Err (id still current) → error       [Failed]
//!         └─ Err → error                                    [Failed]
//! ```
//!
//! The runner is a single logical thread: at most one capture device and one
//! "live" feedback request exist per session.  A feedback request is never
//! cancelled — starting a new session abandons interest in it, and the
//! session-id check drops its late result.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::audio::{
    choose_encoding, encode_chunks, new_chunk_sink, AudioEncoding, CaptureDevice, CaptureError,
    CaptureHandle, ChunkSink,
};
use crate::config::AppConfig;
use crate::feedback::FeedbackClient;

use super::state::{SessionPhase, SharedState};

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// External events driving the session state machine.
///
/// The duration-cap timer is the only autonomous transition; everything else
/// arrives as one of these.
#[derive(Debug)]
pub enum SessionEvent {
    /// Begin a new recording session for `practice_text`.
    ///
    /// Rejected (state untouched) when the trimmed text is empty, capture is
    /// already active, or the device supports no usable encoding.
    Start { practice_text: String },

    /// Stop the current recording and run encode + feedback.
    ///
    /// A no-op when no capture is active, so stop is idempotent.
    Stop,
}

// ---------------------------------------------------------------------------
// ActiveCapture
// ---------------------------------------------------------------------------

/// Resources owned for the duration of one `Recording` phase.
struct ActiveCapture {
    /// RAII device guard; dropping it releases the microphone.
    handle: Box<dyn CaptureHandle>,
    /// Fresh per-session chunk buffer the capture appends to.
    sink: ChunkSink,
    /// Encoding chosen from the device probe before acquisition.
    encoding: AudioEncoding,
}

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Drives the complete practice-session state machine.
///
/// Create with [`SessionRunner::new`], then call [`run`](Self::run) inside a
/// tokio task.
pub struct SessionRunner {
    state: SharedState,
    device: Arc<dyn CaptureDevice>,
    client: Arc<dyn FeedbackClient>,
    config: AppConfig,
    capture: Option<ActiveCapture>,
}

impl SessionRunner {
    /// Create a new runner.
    ///
    /// # Arguments
    ///
    /// * `state`  — shared session state (also read by the presentation layer).
    /// * `device` — capture device (e.g. `CpalCapture`).
    /// * `client` — feedback client (e.g. `ApiFeedbackClient`).
    /// * `config` — timer and duration-cap settings.
    pub fn new(
        state: SharedState,
        device: Arc<dyn CaptureDevice>,
        client: Arc<dyn FeedbackClient>,
        config: AppConfig,
    ) -> Self {
        Self {
            state,
            device,
            client,
            config,
            capture: None,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the state machine until `events` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task.  Any
    /// capture still active when the channel closes is released on drop.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        let mut ticker = interval(Duration::from_millis(self.config.audio.tick_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(SessionEvent::Start { practice_text }) => {
                        if self.handle_start(&practice_text) {
                            ticker.reset();
                        }
                    }
                    Some(SessionEvent::Stop) => self.handle_stop().await,
                    None => break,
                },
                _ = ticker.tick(), if self.capture.is_some() => {
                    self.handle_tick().await;
                }
            }
        }

        log::info!("session: event channel closed, runner shutting down");
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Handle a start event.  Returns `true` when recording actually began
    /// so the caller can realign the tick timer.
    fn handle_start(&mut self, practice_text: &str) -> bool {
        let text = practice_text.trim();
        if text.is_empty() {
            log::warn!("session: start rejected — practice text is empty");
            return false;
        }
        if self.capture.is_some() {
            log::warn!("session: start rejected — capture already active");
            return false;
        }

        // Probe supported encodings before touching the device so an
        // unusable device fails fast with the state untouched.
        let supported = self.device.supported_encodings();
        let Some(encoding) = choose_encoding(&supported) else {
            log::error!("session: start rejected — {}", CaptureError::NoSupportedEncoding);
            return false;
        };

        // Full reset: a new session replaces the prior one.  Any in-flight
        // feedback request for the old id will find its result stale.
        let session_id = {
            let mut st = self.state.lock().unwrap();
            st.session_id += 1;
            st.phase = SessionPhase::Idle;
            st.practice_text = text.to_string();
            st.encoded_audio = None;
            st.elapsed_ms = 0;
            st.feedback = None;
            st.error = None;
            st.session_id
        };

        let sink = new_chunk_sink();
        match self.device.acquire(Arc::clone(&sink)) {
            Ok(handle) => {
                self.capture = Some(ActiveCapture {
                    handle,
                    sink,
                    encoding,
                });
                self.state.lock().unwrap().phase = SessionPhase::Recording;
                log::debug!("session {session_id}: recording started ({encoding:?})");
                true
            }
            Err(e) => {
                let mut st = self.state.lock().unwrap();
                st.phase = SessionPhase::Failed;
                st.error = Some(format!("Could not access the microphone: {e}"));
                log::error!("session {session_id}: capture acquisition failed: {e}");
                false
            }
        }
    }

    /// Advance the elapsed-time counter; synthesize a stop at the cap.
    async fn handle_tick(&mut self) {
        let tick_ms = self.config.audio.tick_ms;
        let max_ms = self.config.audio.max_recording_ms;

        let hit_cap = {
            let mut st = self.state.lock().unwrap();
            if st.phase != SessionPhase::Recording {
                return;
            }
            st.elapsed_ms = (st.elapsed_ms + tick_ms).min(max_ms);
            st.elapsed_ms >= max_ms
        };

        if hit_cap {
            log::info!("session: maximum recording duration reached, stopping");
            self.handle_stop().await;
        }
    }

    /// Handle a stop event: release the device, encode, request feedback.
    async fn handle_stop(&mut self) {
        let Some(ActiveCapture {
            handle,
            sink,
            encoding,
        }) = self.capture.take()
        else {
            log::debug!("session: stop ignored — no active capture");
            return;
        };

        // Release the device first; encoding strictly follows the full stop
        // of capture, so no partial chunk may land after the drain below.
        drop(handle);

        let chunks = sink.lock().unwrap().drain();

        let (session_id, practice_text) = {
            let mut st = self.state.lock().unwrap();
            st.phase = SessionPhase::Encoding;
            (st.session_id, st.practice_text.clone())
        };

        let data_uri = match encode_chunks(&chunks, encoding) {
            Ok(uri) => uri,
            Err(e) => {
                let mut st = self.state.lock().unwrap();
                st.phase = SessionPhase::Failed;
                st.error = Some(format!("Failed to encode the recording: {e}"));
                log::error!("session {session_id}: encoding failed: {e}");
                return;
            }
        };

        {
            let mut st = self.state.lock().unwrap();
            st.encoded_audio = Some(data_uri.clone());
            st.phase = SessionPhase::AwaitingFeedback;
        }
        log::debug!(
            "session {session_id}: encoded {} chunk(s), requesting feedback",
            chunks.len()
        );

        // One live request per session, detached so the runner stays
        // responsive.  The id check drops a result that arrives after a
        // newer session has started.
        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let result = client.get_feedback(&practice_text, &data_uri).await;

            let mut st = state.lock().unwrap();
            if st.session_id != session_id || st.phase != SessionPhase::AwaitingFeedback {
                log::debug!("session {session_id}: dropping stale feedback result");
                return;
            }
            match result {
                Ok(feedback) => {
                    log::info!(
                        "session {session_id}: feedback received (score {}/100)",
                        feedback.overall_score
                    );
                    st.feedback = Some(feedback);
                    st.phase = SessionPhase::Ready;
                }
                Err(e) => {
                    log::warn!("session {session_id}: feedback request failed: {e}");
                    // encoded_audio stays set so the recording remains
                    // playable after a service-side failure.
                    st.error = Some(e.to_string());
                    st.phase = SessionPhase::Failed;
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockCaptureDevice;
    use crate::config::AppConfig;
    use crate::feedback::{FeedbackError, PronunciationFeedback};
    use crate::session::state::new_shared_state;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    fn fb(score: u8, assessment: &str) -> PronunciationFeedback {
        PronunciationFeedback {
            overall_score: score,
            overall_assessment: assessment.into(),
            word_scores: None,
            suggestions: None,
        }
    }

    /// Mock client that always succeeds with a fixed feedback object.
    struct OkClient(PronunciationFeedback);

    #[async_trait]
    impl FeedbackClient for OkClient {
        async fn get_feedback(
            &self,
            _text: &str,
            _uri: &str,
        ) -> Result<PronunciationFeedback, FeedbackError> {
            Ok(self.0.clone())
        }
    }

    /// Mock client that always reports rate-limit exhaustion.
    struct RateLimitedClient;

    #[async_trait]
    impl FeedbackClient for RateLimitedClient {
        async fn get_feedback(
            &self,
            _text: &str,
            _uri: &str,
        ) -> Result<PronunciationFeedback, FeedbackError> {
            Err(FeedbackError::RateLimited)
        }
    }

    /// Scripted responses, one per call, each after its own delay.
    struct ScriptedClient {
        script: Mutex<VecDeque<(u64, Result<PronunciationFeedback, ()>)>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<(u64, Result<PronunciationFeedback, ()>)>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl FeedbackClient for ScriptedClient {
        async fn get_feedback(
            &self,
            _text: &str,
            _uri: &str,
        ) -> Result<PronunciationFeedback, FeedbackError> {
            let (delay_ms, result) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted client ran out of responses");
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            result.map_err(|_| FeedbackError::RateLimited)
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const PRACTICE_TEXT: &str = "The quick brown fox jumps over the lazy dog.";

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.audio.tick_ms = 10;
        config.audio.max_recording_ms = 50;
        config
    }

    fn make_runner(
        device: Arc<MockCaptureDevice>,
        client: Arc<dyn FeedbackClient>,
    ) -> (SessionRunner, SharedState) {
        let state = new_shared_state();
        let dev: Arc<dyn CaptureDevice> = device;
        let runner = SessionRunner::new(Arc::clone(&state), dev, client, test_config());
        (runner, state)
    }

    fn start(text: &str) -> SessionEvent {
        SessionEvent::Start {
            practice_text: text.into(),
        }
    }

    /// Poll until the session reaches a terminal phase (the feedback task is
    /// detached, so `run()` returning does not imply completion).
    async fn wait_for_terminal(state: &SharedState) {
        for _ in 0..200 {
            // Yield before checking so the runner task can process any
            // just-sent events; otherwise a terminal phase left over from a
            // previous session is mistaken for this one's.
            tokio::time::sleep(Duration::from_millis(10)).await;
            if state.lock().unwrap().phase.is_terminal() {
                return;
            }
        }
        panic!("session never reached a terminal phase");
    }

    /// Terminal exclusivity: exactly one of `{feedback, error}` is set.
    fn assert_terminal_exclusive(state: &SharedState) {
        let st = state.lock().unwrap();
        assert!(st.phase.is_terminal());
        assert_ne!(st.feedback.is_some(), st.error.is_some());
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Full happy path: start + stop drives the session through encoding and
    /// feedback to `Ready`.
    #[tokio::test]
    async fn start_stop_reaches_ready_with_feedback() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) = make_runner(
            Arc::clone(&device),
            Arc::new(OkClient(fb(82, "Good effort"))),
        );

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        wait_for_terminal(&state).await;
        assert_terminal_exclusive(&state);

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Ready);
        assert_eq!(st.practice_text, PRACTICE_TEXT);
        let feedback = st.feedback.as_ref().unwrap();
        assert_eq!(feedback.overall_score, 82);
        assert_eq!(feedback.overall_assessment, "Good effort");
        assert!(st
            .encoded_audio
            .as_deref()
            .unwrap()
            .starts_with("data:audio/wav;base64,"));
        assert_eq!(device.active_handles(), 0);
    }

    /// A rate-limited feedback request fails the session but keeps the
    /// encoded audio available for playback.
    #[tokio::test]
    async fn rate_limited_feedback_keeps_encoded_audio() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) = make_runner(Arc::clone(&device), Arc::new(RateLimitedClient));

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        wait_for_terminal(&state).await;
        assert_terminal_exclusive(&state);

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Failed);
        assert!(st.error.as_deref().unwrap().contains("try again"));
        assert!(st.encoded_audio.is_some());
    }

    /// Empty practice text must be rejected without acquiring the device.
    #[tokio::test]
    async fn empty_practice_text_is_rejected_without_acquisition() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) =
            make_runner(Arc::clone(&device), Arc::new(OkClient(fb(80, "ok"))));

        let (tx, rx) = mpsc::channel(4);
        tx.send(start("   ")).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Idle);
        assert!(st.error.is_none());
        assert_eq!(device.acquire_calls(), 0);
    }

    /// An empty encoding probe must reject the start with the state still
    /// `Idle` and no device acquired.
    #[tokio::test]
    async fn no_supported_encoding_is_rejected_in_idle() {
        let device = Arc::new(MockCaptureDevice::new().with_encodings(vec![]));
        let (runner, state) =
            make_runner(Arc::clone(&device), Arc::new(OkClient(fb(80, "ok"))));

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Idle);
        assert!(st.error.is_none());
        assert!(st.encoded_audio.is_none());
        assert_eq!(device.acquire_calls(), 0);
    }

    /// Device acquisition failure is terminal for that attempt: `Failed`
    /// with the error set, never entering `Recording`.
    #[tokio::test]
    async fn acquisition_failure_fails_the_session() {
        let device = Arc::new(MockCaptureDevice::new().failing());
        let (runner, state) =
            make_runner(Arc::clone(&device), Arc::new(OkClient(fb(80, "ok"))));

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        assert_terminal_exclusive(&state);
        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Failed);
        assert!(st.error.as_deref().unwrap().contains("microphone"));
        assert!(st.encoded_audio.is_none());
        assert!(st.feedback.is_none());
    }

    /// Stopping with no active capture is an idempotent no-op.
    #[tokio::test]
    async fn stop_without_capture_is_a_no_op() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) =
            make_runner(Arc::clone(&device), Arc::new(OkClient(fb(80, "ok"))));

        let (tx, rx) = mpsc::channel(4);
        tx.send(SessionEvent::Stop).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Idle);
        assert!(st.error.is_none());
    }

    /// Starting while already recording is rejected; the first session keeps
    /// its single device.
    #[tokio::test]
    async fn start_while_recording_is_rejected() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) = make_runner(
            Arc::clone(&device),
            Arc::new(OkClient(fb(75, "Fair"))),
        );

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(start("something else")).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        wait_for_terminal(&state).await;
        let st = state.lock().unwrap();
        assert_eq!(device.acquire_calls(), 1);
        // The original session's text survived the rejected second start.
        assert_eq!(st.practice_text, PRACTICE_TEXT);
        assert_eq!(st.session_id, 1);
    }

    /// A capture that produced no samples fails at the encoding step.
    #[tokio::test]
    async fn empty_capture_fails_encoding() {
        let device = Arc::new(MockCaptureDevice::with_chunks(vec![]));
        let (runner, state) =
            make_runner(Arc::clone(&device), Arc::new(OkClient(fb(80, "ok"))));

        let (tx, rx) = mpsc::channel(4);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        assert_terminal_exclusive(&state);
        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Failed);
        assert!(st.error.as_deref().unwrap().contains("encode"));
        assert!(st.encoded_audio.is_none());
    }

    /// Reaching the duration cap stops the recording automatically, exactly
    /// once, and `elapsed_ms` never exceeds the cap.
    #[tokio::test]
    async fn duration_cap_triggers_automatic_stop() {
        let device = Arc::new(MockCaptureDevice::new());
        let (runner, state) = make_runner(
            Arc::clone(&device),
            Arc::new(OkClient(fb(64, "Keep practicing"))),
        );

        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(runner.run(rx));

        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        // max_recording_ms = 50, tick_ms = 10 — no stop event is ever sent.
        wait_for_terminal(&state).await;

        {
            let st = state.lock().unwrap();
            assert_eq!(st.phase, SessionPhase::Ready);
            assert_eq!(st.elapsed_ms, 50);
            assert!(st.encoded_audio.is_some());
        }
        assert_eq!(device.active_handles(), 0);

        drop(tx);
        handle.await.unwrap();
    }

    /// A stale feedback result from an abandoned session must not overwrite
    /// a newer session's state.
    #[tokio::test]
    async fn stale_feedback_result_is_dropped() {
        let device = Arc::new(MockCaptureDevice::new());
        // First request is slow and would report score 10; the second is
        // fast and reports score 82.
        let client = Arc::new(ScriptedClient::new(vec![
            (300, Ok(fb(10, "stale"))),
            (10, Ok(fb(82, "Good effort"))),
        ]));
        let (runner, state) = make_runner(Arc::clone(&device), client);

        let (tx, rx) = mpsc::channel(8);
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        // Re-entrant start while the first request is still in flight.
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        drop(tx);
        runner.run(rx).await;

        // Wait past the slow response so the staleness check has fired.
        tokio::time::sleep(Duration::from_millis(400)).await;

        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Ready);
        assert_eq!(st.session_id, 2);
        assert_eq!(st.feedback.as_ref().unwrap().overall_score, 82);
        assert!(st.error.is_none());
        assert_eq!(device.acquire_calls(), 2);
        assert_eq!(device.active_handles(), 0);
    }

    /// A failed session can be restarted; the reset clears the old error and
    /// the retry can succeed.
    #[tokio::test]
    async fn restart_after_failure_fully_resets() {
        let device = Arc::new(MockCaptureDevice::new());
        let client = Arc::new(ScriptedClient::new(vec![
            (0, Err(())), // rate limited
            (0, Ok(fb(90, "Much better"))),
        ]));
        let (runner, state) = make_runner(Arc::clone(&device), client);

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(runner.run(rx));

        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        wait_for_terminal(&state).await;
        {
            let st = state.lock().unwrap();
            assert_eq!(st.phase, SessionPhase::Failed);
            assert!(st.error.is_some());
            assert!(st.encoded_audio.is_some());
        }

        // User-triggered retry: a brand-new session.
        tx.send(start(PRACTICE_TEXT)).await.unwrap();
        tx.send(SessionEvent::Stop).await.unwrap();
        wait_for_terminal(&state).await;

        assert_terminal_exclusive(&state);
        let st = state.lock().unwrap();
        assert_eq!(st.phase, SessionPhase::Ready);
        assert_eq!(st.feedback.as_ref().unwrap().overall_score, 90);
        assert!(st.error.is_none());
        assert_eq!(st.session_id, 2);

        drop(tx);
        handle.await.unwrap();
    }
}
