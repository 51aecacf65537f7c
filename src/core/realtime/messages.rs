//! Wire types for the realtime speech WebSocket protocol.
//!
//! All events are JSON text frames tagged by a `type` field.
//!
//! Client events (sent):
//! - `session.update` - declare audio formats, VAD, transcription, instructions
//! - `input_audio_buffer.append` - append base64 PCM16 16 kHz audio
//! - `response.create` - request an utterance with a one-off instruction
//!
//! Server events (consumed):
//! - `input_audio_buffer.speech_started` / `speech_stopped` - peer VAD
//! - `response.audio.delta` - base64 µ-law 8 kHz audio chunk
//! - `response.output_text.delta` - agent text chunk
//! - `response.completed` - response finished
//! - `conversation.item.input_audio_transcription.completed` - caller transcript
//! - `error` - peer-reported error (non-fatal to the call)
//!
//! Every other server event type deserializes into `Other` and is ignored.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session settings carried by `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Response modalities (audio, text)
    pub modalities: Vec<String>,

    /// Composed system instructions for the agent
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    /// Input audio format ("pcm16", linear 16 kHz)
    pub input_audio_format: String,

    /// Output audio format ("g711_ulaw", 8 kHz)
    pub output_audio_format: String,

    /// Input transcription configuration
    pub input_audio_transcription: InputTranscription,

    /// Server-side turn detection configuration
    pub turn_detection: TurnDetection,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputTranscription {
    /// Speech-to-text model identifier (e.g. "whisper-1")
    pub model: String,
}

/// Server-side VAD configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD with fixed tuning
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        threshold: f32,
        /// Audio retained before detected onset (ms)
        prefix_padding_ms: u32,
        /// Silence ending the turn (ms)
        silence_duration_ms: u32,
    },
}

/// One-off response directive carried by `response.create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDirective {
    /// Instruction for this single response
    pub instructions: String,
}

// =============================================================================
// Client Events (sent to the realtime peer)
// =============================================================================

/// Client events sent over the realtime link.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session settings
        session: SessionSettings,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 16 kHz audio
        audio: String,
    },

    /// Request a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response directive
        response: ResponseDirective,
    },
}

impl ClientEvent {
    /// Build an audio append event from raw PCM bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from the realtime peer)
// =============================================================================

/// Server events received over the realtime link.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Peer VAD detected speech onset
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Peer VAD detected end of speech
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Audio chunk (base64 µ-law 8 kHz)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Base64-encoded µ-law audio delta
        delta: String,
    },

    /// Agent text chunk
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Text delta
        delta: String,
    },

    /// Response finished; buffered agent text is now final
    #[serde(rename = "response.completed")]
    ResponseCompleted,

    /// Caller speech transcription finished
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Transcript text
        transcript: String,
    },

    /// Peer-reported error
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Any event type the bridge does not act on
    #[serde(other)]
    Other,
}

/// Error payload of a peer `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error message
    #[serde(default)]
    pub message: String,
}
