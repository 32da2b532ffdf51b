//! Core `FeedbackClient` trait and `ApiFeedbackClient` implementation.
//!
//! `ApiFeedbackClient` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint that accepts `input_audio` content parts.  All connection
//! details come from [`FeedbackConfig`]; nothing is hardcoded.  The call is
//! a single request/response — no streaming, no automatic retries; retrying
//! is a user-initiated new session.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::FeedbackConfig;
use crate::feedback::prompt::PromptBuilder;
use crate::feedback::schema::PronunciationFeedback;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Construction-time configuration failure.
///
/// The client is built once at the composition root; a missing or broken
/// configuration fails there, instead of every later call throwing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("feedback base URL is not configured")]
    MissingBaseUrl,

    #[error("feedback model is not configured")]
    MissingModel,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

// ---------------------------------------------------------------------------
// FeedbackError
// ---------------------------------------------------------------------------

/// Errors that can occur during a feedback request.
///
/// Each variant carries a user-facing message distinct enough to guide retry
/// behaviour: rate-limit → wait and retry, safety → change the input,
/// malformed/transport → plain retry.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Upstream quota or rate-limit exhaustion.
    #[error("The feedback service is busy or rate limited. Please wait a moment and try again.")]
    RateLimited,

    /// The service refused the input on content-safety grounds.
    #[error("The recording or text could not be processed due to safety settings. Please try different input.")]
    SafetyRejected,

    /// The response did not match the expected feedback structure.
    #[error("AI model did not return the expected feedback structure")]
    MalformedOutput,

    /// HTTP transport, connection, or timeout failure.
    #[error("Could not reach the feedback service ({0}). Please try again.")]
    Transport(String),

    /// The caller's input violated the request contract.
    #[error("invalid feedback input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for FeedbackError {
    fn from(e: reqwest::Error) -> Self {
        if e.status().map(|s| s.as_u16()) == Some(429) {
            FeedbackError::RateLimited
        } else if e.is_timeout() {
            FeedbackError::Transport("request timed out".into())
        } else {
            FeedbackError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// FeedbackClient trait
// ---------------------------------------------------------------------------

/// Async trait for the pronunciation-feedback service.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks as
/// `Arc<dyn FeedbackClient>`.
///
/// # Arguments
/// * `practice_text`  – The text the user attempted to pronounce; non-empty.
/// * `audio_data_uri` – The recording as `data:audio/<subtype>;base64,<payload>`.
#[async_trait]
pub trait FeedbackClient: Send + Sync {
    async fn get_feedback(
        &self,
        practice_text: &str,
        audio_data_uri: &str,
    ) -> Result<PronunciationFeedback, FeedbackError>;
}

// ---------------------------------------------------------------------------
// Data-URI helpers
// ---------------------------------------------------------------------------

/// Split a `data:audio/<subtype>;base64,<payload>` string into
/// `(mime, payload)`.
fn split_audio_data_uri(uri: &str) -> Result<(&str, &str), FeedbackError> {
    let invalid =
        || FeedbackError::InvalidInput("audio must be a base64 audio data URI".into());

    let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or_else(invalid)?;
    if !mime.starts_with("audio/") || payload.is_empty() {
        return Err(invalid());
    }
    Ok((mime, payload))
}

/// Strip an optional markdown code fence; models sometimes wrap their JSON
/// output in one despite the instructions.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// ---------------------------------------------------------------------------
// ApiFeedbackClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint with a text +
/// `input_audio` user message and parses the JSON reply into
/// [`PronunciationFeedback`].
///
/// # No hardcoded URLs
/// All connection details (`base_url`, `api_key`, `model`) come exclusively
/// from the [`FeedbackConfig`] passed to [`ApiFeedbackClient::from_config`].
pub struct ApiFeedbackClient {
    client: reqwest::Client,
    config: FeedbackConfig,
    prompt_builder: PromptBuilder,
}

impl ApiFeedbackClient {
    /// Build an `ApiFeedbackClient` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Fails when `base_url` or `model` is empty, or when the HTTP client
    /// cannot be built.  The composition root handles this once.
    pub fn from_config(config: &FeedbackConfig) -> Result<Self, ConfigError> {
        if config.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if config.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::new(config.mode),
        })
    }

    /// Interpret a non-2xx response body.
    fn classify_failure(status: reqwest::StatusCode, body: &str) -> FeedbackError {
        if status.as_u16() == 429 || body.contains("RESOURCE_EXHAUSTED") {
            return FeedbackError::RateLimited;
        }
        if body.contains("content_filter") || body.contains("safety") {
            return FeedbackError::SafetyRejected;
        }
        FeedbackError::Transport(format!("HTTP {status}"))
    }

    /// Extract and validate the feedback object from a successful response.
    fn parse_response(json: &serde_json::Value) -> Result<PronunciationFeedback, FeedbackError> {
        if json["choices"][0]["finish_reason"].as_str() == Some("content_filter") {
            return Err(FeedbackError::SafetyRejected);
        }

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(FeedbackError::MalformedOutput)?;

        let feedback: PronunciationFeedback =
            serde_json::from_str(strip_code_fence(content)).map_err(|e| {
                log::warn!("feedback: response content did not parse: {e}");
                FeedbackError::MalformedOutput
            })?;

        feedback.validate().map_err(|e| {
            log::warn!("feedback: response failed schema validation: {e}");
            FeedbackError::MalformedOutput
        })?;

        Ok(feedback)
    }
}

#[async_trait]
impl FeedbackClient for ApiFeedbackClient {
    /// Send one feedback request for `practice_text` + `audio_data_uri`.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `config.api_key` is `Some(key)` and `key` is non-empty — safe for
    /// local providers that require no authentication.
    async fn get_feedback(
        &self,
        practice_text: &str,
        audio_data_uri: &str,
    ) -> Result<PronunciationFeedback, FeedbackError> {
        let text = practice_text.trim();
        if text.is_empty() {
            return Err(FeedbackError::InvalidInput(
                "practice text must not be empty".into(),
            ));
        }
        let (mime, payload) = split_audio_data_uri(audio_data_uri)?;
        let format = mime.strip_prefix("audio/").unwrap_or(mime);

        let (system_msg, user_msg) = self.prompt_builder.build_chat(text);

        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user", "content": [
                    { "type": "text", "text": user_msg },
                    { "type": "input_audio",
                      "input_audio": { "data": payload, "format": format } }
                ]}
            ],
            "stream":          false,
            "temperature":     self.config.temperature,
            "response_format": { "type": "json_object" }
        });

        let mut req = self.client.post(&url).json(&body);

        // Attach Authorization header only when api_key is a non-empty string.
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        log::debug!("feedback: requesting {} ({} chars of audio)", url, payload.len());
        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, &body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|_| FeedbackError::MalformedOutput)?;

        Self::parse_response(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
