//! Post-call summary via a chat-completion endpoint.
//!
//! Summaries are best-effort: any transport error, non-2xx status, or empty
//! completion yields `None` and is logged. Finalization continues either way.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::BridgeConfig;

/// Transcripts shorter than this (after trimming) are not worth a model call.
pub const SUMMARY_MIN_TRANSCRIPT_CHARS: usize = 40;

/// Sampling temperature for summaries.
const SUMMARY_TEMPERATURE: f32 = 0.4;

/// Output token cap for summaries.
const SUMMARY_MAX_TOKENS: u32 = 800;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Request a summary of `transcript`. Returns `None` on any failure.
pub async fn request_summary(
    http: &reqwest::Client,
    config: &BridgeConfig,
    system_prompt: &str,
    transcript: &str,
    correlation_id: &str,
) -> Option<String> {
    let user_message = format!("Summarize the following call transcript:\n\n{transcript}");
    let body = ChatRequest {
        model: &config.summary_model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system_prompt,
            },
            ChatMessage {
                role: "user",
                content: &user_message,
            },
        ],
        max_tokens: SUMMARY_MAX_TOKENS,
        temperature: SUMMARY_TEMPERATURE,
    };

    let response = match http
        .post(&config.summary_url)
        .bearer_auth(&config.openai_api_key)
        .json(&body)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(correlation_id, error = %e, "summary request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        warn!(
            correlation_id,
            status = response.status().as_u16(),
            "summary endpoint returned an error status"
        );
        return None;
    }

    let parsed: ChatResponse = match response.json().await {
        Ok(p) => p,
        Err(e) => {
            warn!(correlation_id, error = %e, "summary response was not valid JSON");
            return None;
        }
    };

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    if content.is_none() {
        warn!(correlation_id, "summary endpoint returned no content");
    }
    content
}
