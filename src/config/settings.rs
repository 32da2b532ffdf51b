//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// FeedbackMode
// ---------------------------------------------------------------------------

/// Selects how much structure the feedback service is asked for.
///
/// | Variant    | Response contents                                      |
/// |------------|--------------------------------------------------------|
/// | Structured | Overall score + assessment + word scores + suggestions |
/// | FreeText   | Overall score + assessment only                        |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeedbackMode {
    /// Full word-level breakdown with improvement suggestions.
    Structured,
    /// A short prose assessment with a single overall score.
    FreeText,
}

impl Default for FeedbackMode {
    fn default() -> Self {
        Self::Structured
    }
}

// ---------------------------------------------------------------------------
// FeedbackConfig
// ---------------------------------------------------------------------------

/// Settings for the pronunciation-feedback service call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key — `None` for local providers that require no authentication.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (must accept audio input,
    /// e.g. `"gpt-4o-audio-preview"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).  Lower = more deterministic.
    pub temperature: f32,
    /// Maximum seconds to wait for a feedback response before timing out.
    pub timeout_secs: u64,
    /// How much structure to request from the model.
    pub mode: FeedbackMode,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-audio-preview".into(),
            temperature: 0.3,
            timeout_secs: 30,
            mode: FeedbackMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and the recording timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Maximum recording length in milliseconds; recording stops
    /// automatically when the elapsed time reaches this cap.
    pub max_recording_ms: u64,
    /// Timer tick period in milliseconds.  Drives the elapsed-time counter
    /// (and any progress indicator the presentation layer renders).
    pub tick_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_recording_ms: 15_000,
            tick_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// PracticeConfig
// ---------------------------------------------------------------------------

/// Settings for the practice session itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// Text offered when the user does not type their own.
    pub default_text: String,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            default_text: "The quick brown fox jumps over the lazy dog.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use pronounce_coach::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Audio capture / timer settings.
    pub audio: AudioConfig,
    /// Feedback service settings.
    pub feedback: FeedbackConfig,
    /// Practice session settings.
    pub practice: PracticeConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.audio.max_recording_ms, loaded.audio.max_recording_ms);
        assert_eq!(original.audio.tick_ms, loaded.audio.tick_ms);

        assert_eq!(original.feedback.base_url, loaded.feedback.base_url);
        assert_eq!(original.feedback.api_key, loaded.feedback.api_key);
        assert_eq!(original.feedback.model, loaded.feedback.model);
        assert_eq!(original.feedback.timeout_secs, loaded.feedback.timeout_secs);
        assert_eq!(original.feedback.temperature, loaded.feedback.temperature);
        assert_eq!(original.feedback.mode, loaded.feedback.mode);

        assert_eq!(original.practice.default_text, loaded.practice.default_text);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.audio.max_recording_ms, default.audio.max_recording_ms);
        assert_eq!(config.feedback.model, default.feedback.model);
        assert_eq!(config.practice.default_text, default.practice.default_text);
    }

    /// Verify default values.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.audio.max_recording_ms, 15_000);
        assert_eq!(cfg.audio.tick_ms, 100);
        assert_eq!(cfg.feedback.base_url, "https://api.openai.com");
        assert!(cfg.feedback.api_key.is_none());
        assert_eq!(cfg.feedback.mode, FeedbackMode::Structured);
        assert_eq!(cfg.feedback.timeout_secs, 30);
        assert_eq!(
            cfg.practice.default_text,
            "The quick brown fox jumps over the lazy dog."
        );
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.audio.max_recording_ms = 10_000;
        cfg.audio.tick_ms = 50;
        cfg.feedback.base_url = "http://localhost:11434".into();
        cfg.feedback.api_key = Some("sk-test".into());
        cfg.feedback.model = "qwen2-audio".into();
        cfg.feedback.timeout_secs = 10;
        cfg.feedback.mode = FeedbackMode::FreeText;
        cfg.practice.default_text = "She sells seashells by the seashore.".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.audio.max_recording_ms, 10_000);
        assert_eq!(loaded.audio.tick_ms, 50);
        assert_eq!(loaded.feedback.base_url, "http://localhost:11434");
        assert_eq!(loaded.feedback.api_key, Some("sk-test".into()));
        assert_eq!(loaded.feedback.model, "qwen2-audio");
        assert_eq!(loaded.feedback.timeout_secs, 10);
        assert_eq!(loaded.feedback.mode, FeedbackMode::FreeText);
        assert_eq!(
            loaded.practice.default_text,
            "She sells seashells by the seashore."
        );
    }
}
