//! Wire types for the telephony media-stream WebSocket.
//!
//! Inbound frames are JSON objects tagged by an `event` field. Field names
//! follow the provider's camelCase wire format (`streamSid`, `callSid`).
//!
//! Outbound frames carry µ-law audio back to the call:
//! `{"event":"media","streamSid":...,"media":{"payload":<base64>}}`.

use serde::{Deserialize, Serialize};

// =============================================================================
// Inbound events
// =============================================================================

/// Events received from the telephony media stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum TelephonyEvent {
    /// Stream opened; carries call identifiers and custom parameters
    #[serde(rename = "start")]
    Start {
        /// Start payload
        start: StartInfo,
    },

    /// One audio frame from the caller
    #[serde(rename = "media")]
    Media {
        /// Media payload
        media: MediaPayload,
    },

    /// Playback marker echo; logged only
    #[serde(rename = "mark")]
    Mark {
        /// Marker payload
        #[serde(default)]
        mark: MarkInfo,
    },

    /// Stream ended
    #[serde(rename = "stop")]
    Stop,

    /// Any event the bridge does not act on
    #[serde(other)]
    Other,
}

/// Payload of a `start` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartInfo {
    /// Provider stream identifier
    #[serde(rename = "streamSid", default)]
    pub stream_sid: String,

    /// Provider call identifier
    #[serde(rename = "callSid", default)]
    pub call_sid: String,

    /// Application parameters attached when the stream was created
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: CustomParameters,
}

/// Custom parameters forwarded by the telephony provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomParameters {
    /// "INBOUND" or "OUTBOUND"; anything else defaults to OUTBOUND
    #[serde(default)]
    pub direction: Option<String>,

    /// "FIRST" or "FOLLOWUP"; anything else defaults to FIRST
    #[serde(default)]
    pub call_type: Option<String>,

    /// Summary persisted from the prospect's previous call
    #[serde(default)]
    pub last_summary: Option<String>,

    /// Transcript excerpt persisted from the prospect's previous call
    #[serde(default)]
    pub last_transcript: Option<String>,
}

/// Payload of a `media` event.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded µ-law 8 kHz audio
    pub payload: String,
}

/// Payload of a `mark` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkInfo {
    /// Marker name
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Outbound frames
// =============================================================================

/// Frames sent back to the telephony media stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutgoingFrame {
    /// One µ-law audio frame for the call
    Media {
        /// Stream this frame belongs to
        #[serde(rename = "streamSid")]
        stream_sid: String,
        /// Audio payload
        media: OutgoingMedia,
    },
}

/// Audio payload of an outbound media frame.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMedia {
    /// Base64-encoded µ-law 8 kHz audio
    pub payload: String,
}

impl OutgoingFrame {
    /// Build a media frame for a stream from an already base64-encoded
    /// µ-law payload.
    pub fn media(stream_sid: &str, payload: String) -> Self {
        OutgoingFrame::Media {
            stream_sid: stream_sid.to_string(),
            media: OutgoingMedia { payload },
        }
    }
}

/// Routing instruction for the telephony sender task.
#[derive(Debug)]
pub enum TelephonyRoute {
    /// Serialized JSON frame to send as a text message
    Frame(String),
    /// Close the WebSocket
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_event_parses_identifiers_and_parameters() {
        let json = r#"{
            "event": "start",
            "start": {
                "streamSid": "MZ123",
                "callSid": "CA456",
                "customParameters": {
                    "direction": "INBOUND",
                    "call_type": "FOLLOWUP",
                    "last_summary": "prior notes"
                }
            }
        }"#;
        match serde_json::from_str::<TelephonyEvent>(json).unwrap() {
            TelephonyEvent::Start { start } => {
                assert_eq!(start.stream_sid, "MZ123");
                assert_eq!(start.call_sid, "CA456");
                assert_eq!(start.custom_parameters.direction.as_deref(), Some("INBOUND"));
                assert_eq!(start.custom_parameters.call_type.as_deref(), Some("FOLLOWUP"));
                assert_eq!(
                    start.custom_parameters.last_summary.as_deref(),
                    Some("prior notes")
                );
                assert!(start.custom_parameters.last_transcript.is_none());
            }
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn start_event_tolerates_missing_fields() {
        let json = r#"{"event":"start","start":{}}"#;
        match serde_json::from_str::<TelephonyEvent>(json).unwrap() {
            TelephonyEvent::Start { start } => {
                assert!(start.stream_sid.is_empty());
                assert!(start.call_sid.is_empty());
            }
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn media_event_parses_payload() {
        let json = r#"{"event":"media","media":{"payload":"//8A"}}"#;
        match serde_json::from_str::<TelephonyEvent>(json).unwrap() {
            TelephonyEvent::Media { media } => assert_eq!(media.payload, "//8A"),
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn unknown_events_fold_into_other() {
        let json = r#"{"event":"dtmf","dtmf":{"digit":"5"}}"#;
        assert!(matches!(
            serde_json::from_str::<TelephonyEvent>(json).unwrap(),
            TelephonyEvent::Other
        ));
    }

    #[test]
    fn stop_event_parses_without_payload() {
        let json = r#"{"event":"stop"}"#;
        assert!(matches!(
            serde_json::from_str::<TelephonyEvent>(json).unwrap(),
            TelephonyEvent::Stop
        ));
    }

    #[test]
    fn outbound_media_frame_matches_wire_shape() {
        let frame = OutgoingFrame::media("MZ123", "AAAA".to_string());
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"event":"media","streamSid":"MZ123","media":{"payload":"AAAA"}}"#
        );
    }
}
