//! Builds the two messages sent to the realtime peer when it becomes ready:
//! the session configuration and the opening-turn directive.
//!
//! The configuration must reach the peer before the directive, and both must
//! precede any forwarded audio; the session enforces that ordering, this
//! module only constructs the payloads.

use serde::{Deserialize, Serialize};

use crate::config::BridgeConfig;
use crate::core::realtime::{
    ClientEvent, InputTranscription, ResponseDirective, SessionSettings, TurnDetection,
};

/// Server VAD tuning sent in every session configuration.
const SERVER_VAD_THRESHOLD: f32 = 0.5;
const SERVER_VAD_PREFIX_PADDING_MS: u32 = 300;
const SERVER_VAD_SILENCE_DURATION_MS: u32 = 300;

/// Placeholder inlined when a follow-up call has no stored artifact.
const MISSING_ARTIFACT: &str = "(not available)";

/// Who initiated the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "INBOUND")]
    Inbound,
    #[default]
    #[serde(rename = "OUTBOUND")]
    Outbound,
}

impl Direction {
    /// Parse the telephony custom parameter; unknown values fall back to
    /// the default.
    pub fn parse(value: &str) -> Self {
        match value {
            "INBOUND" => Direction::Inbound,
            _ => Direction::Outbound,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "INBOUND",
            Direction::Outbound => "OUTBOUND",
        }
    }
}

/// Whether this prospect has been called before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallType {
    #[default]
    First,
    Followup,
}

impl CallType {
    pub fn parse(value: &str) -> Self {
        match value {
            "FOLLOWUP" => CallType::Followup,
            _ => CallType::First,
        }
    }
}

/// Call metadata captured from the telephony `start` event.
#[derive(Debug, Clone, Default)]
pub struct CallMeta {
    pub direction: Direction,
    pub call_type: CallType,
    /// Summary persisted from the previous call, if any
    pub last_summary: Option<String>,
    /// Transcript excerpt persisted from the previous call, if any
    pub last_transcript: Option<String>,
}

/// Build the `session.update` event for a call.
pub fn session_update(config: &BridgeConfig, base_prompt: &str, meta: &CallMeta) -> ClientEvent {
    ClientEvent::SessionUpdate {
        session: SessionSettings {
            modalities: vec!["audio".to_string(), "text".to_string()],
            instructions: compose_instructions(base_prompt, meta),
            voice: config.realtime_voice.clone(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "g711_ulaw".to_string(),
            input_audio_transcription: InputTranscription {
                model: config.transcription_model.clone(),
            },
            turn_detection: TurnDetection::ServerVad {
                threshold: SERVER_VAD_THRESHOLD,
                prefix_padding_ms: SERVER_VAD_PREFIX_PADDING_MS,
                silence_duration_ms: SERVER_VAD_SILENCE_DURATION_MS,
            },
        },
    }
}

/// Build the `response.create` event that opens the conversation.
pub fn opening_directive(meta: &CallMeta) -> ClientEvent {
    let instructions = match (meta.direction, meta.call_type) {
        (Direction::Outbound, CallType::First) => {
            "Open the call: greet the prospect warmly, introduce yourself as Dipsy, \
             say why you are calling, and ask if now is a good moment to talk."
        }
        (Direction::Outbound, CallType::Followup) => {
            "Open the call: greet the prospect by acknowledging that you spoke before, \
             briefly recall the context of the last conversation, and pick up where it left off."
        }
        (Direction::Inbound, CallType::First) => {
            "Answer the call: thank the caller for reaching out, introduce yourself as Dipsy, \
             and ask how you can help them today."
        }
        (Direction::Inbound, CallType::Followup) => {
            "Answer the call: welcome the caller back, acknowledge the previous conversation, \
             and ask what they would like to continue with."
        }
    };

    ClientEvent::ResponseCreate {
        response: ResponseDirective {
            instructions: instructions.to_string(),
        },
    }
}

/// Compose the full instruction prompt: externally supplied base prompt plus
/// a block describing what the agent knows about this prospect.
fn compose_instructions(base_prompt: &str, meta: &CallMeta) -> String {
    format!("{base_prompt}\n\n{}", followup_block(meta))
}

fn followup_block(meta: &CallMeta) -> String {
    match meta.call_type {
        CallType::First => "This is the first conversation with this prospect. You have no \
                            prior call history or memory of them; treat them as a first-time \
                            contact."
            .to_string(),
        CallType::Followup => {
            let summary = meta.last_summary.as_deref().unwrap_or(MISSING_ARTIFACT);
            let transcript = meta.last_transcript.as_deref().unwrap_or(MISSING_ARTIFACT);
            format!(
                "You have spoken with this prospect before. Acknowledge the earlier call \
                 naturally and do not repeat baseline qualification questions that were \
                 already covered.\n\nSummary of the previous call:\n{summary}\n\n\
                 Transcript of the previous call:\n{transcript}"
            )
        }
    }
}
