//! Bridge configuration loaded once at startup.
//!
//! Configuration comes from environment variables, with `.env` merged by
//! dotenvy in `main` before loading. Secrets required to finalize calls (the
//! realtime API key, the call-log sink URL and its credentials) are fatal when
//! missing: the process must not accept calls it cannot log.
//!
//! The call-log shared secret is a two-key lookup: `CALL_LOG_SHARED_SECRET`
//! takes precedence, `CALL_LOG_SECRET` is accepted as the legacy name.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::core::audio::{DEFAULT_ENERGY_THRESHOLD, DEFAULT_HANGOVER_MS};

/// Default realtime model identifier.
const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Default voice for agent audio.
const DEFAULT_REALTIME_VOICE: &str = "alloy";

/// Fixed speech-to-text model for input transcription.
const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default chat-completion endpoint for post-call summaries.
const DEFAULT_SUMMARY_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default summarization model identifier.
const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";

/// Configuration loading errors. All of these abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is present but unparseable
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Immutable process-wide configuration, shared by reference with every
/// session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Realtime peer
    pub openai_api_key: String,
    pub realtime_model: String,
    pub realtime_voice: String,
    pub transcription_model: String,

    // Post-call summary endpoint
    pub summary_url: String,
    pub summary_model: String,

    // Call-log sink
    pub call_log_url: String,
    pub call_log_anon_key: String,
    pub call_log_shared_secret: String,
    pub call_log_org_id: Option<String>,

    // Prompt files read at startup
    pub base_prompt_path: String,
    pub summary_prompt_path: String,

    // Local VAD tunables
    pub vad_energy_threshold: i32,
    pub vad_hangover: Duration,
}

impl BridgeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 8080)?,
            openai_api_key: required("OPENAI_API_KEY")?,
            realtime_model: optional("REALTIME_MODEL")
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            realtime_voice: optional("REALTIME_VOICE")
                .unwrap_or_else(|| DEFAULT_REALTIME_VOICE.to_string()),
            transcription_model: optional("TRANSCRIPTION_MODEL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            summary_url: optional("SUMMARY_URL").unwrap_or_else(|| DEFAULT_SUMMARY_URL.to_string()),
            summary_model: optional("SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            call_log_url: required("CALL_LOG_URL")?,
            call_log_anon_key: required("CALL_LOG_ANON_KEY")?,
            call_log_shared_secret: shared_secret()?,
            call_log_org_id: optional("CALL_LOG_ORG_ID"),
            base_prompt_path: optional("BASE_PROMPT_PATH")
                .unwrap_or_else(|| "prompts/agent.txt".to_string()),
            summary_prompt_path: optional("SUMMARY_PROMPT_PATH")
                .unwrap_or_else(|| "prompts/summary.txt".to_string()),
            vad_energy_threshold: parsed("VAD_ENERGY_THRESHOLD", DEFAULT_ENERGY_THRESHOLD)?,
            vad_hangover: Duration::from_millis(parsed("VAD_HANGOVER_MS", DEFAULT_HANGOVER_MS)?),
        })
    }

    /// Get the server bind address as "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// A fully populated configuration for unit and integration tests.
    /// The sink URLs point at a closed local port so accidental network
    /// traffic fails immediately.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            openai_api_key: "test-api-key".to_string(),
            realtime_model: DEFAULT_REALTIME_MODEL.to_string(),
            realtime_voice: DEFAULT_REALTIME_VOICE.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            summary_url: "http://127.0.0.1:1/v1/chat/completions".to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            call_log_url: "http://127.0.0.1:1/rest/v1/call_logs".to_string(),
            call_log_anon_key: "test-anon-key".to_string(),
            call_log_shared_secret: "test-shared-secret".to_string(),
            call_log_org_id: None,
            base_prompt_path: "prompts/agent.txt".to_string(),
            summary_prompt_path: "prompts/summary.txt".to_string(),
            vad_energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            vad_hangover: Duration::from_millis(DEFAULT_HANGOVER_MS),
        }
    }
}

/// Read an optional variable, mapping empty values to `None`.
fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Two-key shared-secret lookup with explicit precedence.
fn shared_secret() -> Result<String, ConfigError> {
    optional("CALL_LOG_SHARED_SECRET")
        .or_else(|| optional("CALL_LOG_SECRET"))
        .ok_or(ConfigError::Missing("CALL_LOG_SHARED_SECRET"))
}
