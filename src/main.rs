//! Application entry point — Pronounce Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Build the feedback client ([`ApiFeedbackClient`]) from config.
//! 4. Spawn the [`SessionRunner`] on the tokio runtime.
//! 5. Drive sessions from stdin: a line of text starts a recording (empty
//!    line uses the configured default practice text), the next line stops
//!    it, and the feedback is printed once it arrives.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use pronounce_coach::{
    audio::CpalCapture,
    config::AppConfig,
    feedback::{ApiFeedbackClient, PronunciationFeedback},
    session::{new_shared_state, SessionEvent, SessionPhase, SessionRunner, SharedState},
};

// ---------------------------------------------------------------------------
// Result rendering
// ---------------------------------------------------------------------------

fn print_feedback(feedback: &PronunciationFeedback) {
    println!();
    println!(
        "  Score: {}/100 — {}",
        feedback.overall_score, feedback.overall_assessment
    );
    if let Some(words) = &feedback.word_scores {
        println!("  Word scores:");
        for w in words {
            match &w.comment {
                Some(comment) => println!("    {:>3}  {} ({comment})", w.score, w.word),
                None => println!("    {:>3}  {}", w.score, w.word),
            }
        }
    }
    if let Some(suggestions) = &feedback.suggestions {
        println!("  Suggestions:");
        for s in suggestions {
            println!("    - {s}");
        }
    }
    println!();
}

/// Poll until the session leaves its busy phases, then print the outcome.
async fn wait_and_print_result(state: &SharedState) {
    loop {
        {
            let st = state.lock().unwrap();
            match st.phase {
                SessionPhase::Ready => {
                    if let Some(feedback) = &st.feedback {
                        print_feedback(feedback);
                    }
                    return;
                }
                SessionPhase::Failed => {
                    if let Some(error) = &st.error {
                        eprintln!("\n  Error: {error}");
                    }
                    if st.encoded_audio.is_some() {
                        eprintln!("  Your recording was captured and is still available.\n");
                    }
                    return;
                }
                // Start was rejected and no session is running.
                SessionPhase::Idle => return,
                _ => {
                    println!("  [{}]", st.phase.label());
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Pronounce Coach starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let default_text = config.practice.default_text.clone();
    let max_secs = config.audio.max_recording_ms / 1000;

    // 3. Feedback client (construction failure is fatal and reported once)
    let client = ApiFeedbackClient::from_config(&config.feedback)
        .context("feedback service is not configured")?;

    // 4. Session runner
    let state = new_shared_state();
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(16);
    let runner = SessionRunner::new(
        Arc::clone(&state),
        Arc::new(CpalCapture::new()),
        Arc::new(client),
        config,
    );
    tokio::spawn(runner.run(event_rx));

    // 5. stdin drive loop
    println!("Pronounce Coach");
    println!("Type a sentence and press Enter to start recording (empty line");
    println!("uses the default text). Press Enter again to stop, or wait for");
    println!("the {max_secs}-second limit. Ctrl-D quits.");
    println!();
    println!("Default text: \"{default_text}\"");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut recording = false;

    while let Some(line) = lines.next_line().await? {
        if recording {
            event_tx.send(SessionEvent::Stop).await?;
            recording = false;
            wait_and_print_result(&state).await;
            println!("Record again? Type a sentence (or an empty line) to start.");
            continue;
        }

        let practice_text = if line.trim().is_empty() {
            default_text.clone()
        } else {
            line.trim().to_string()
        };

        println!("  Recording \"{practice_text}\" — press Enter to stop.");
        event_tx
            .send(SessionEvent::Start { practice_text })
            .await?;
        recording = true;

        // The duration cap can finish the session without a stop line; the
        // next Enter then falls through handle_stop as a no-op.
    }

    // Channel drop shuts the runner down.
    drop(event_tx);
    log::info!("Pronounce Coach exiting");
    Ok(())
}
