//! Core bridging engine: audio conversion, peer protocols, per-call sessions.

pub mod audio;
pub mod realtime;
pub mod session;
pub mod telephony;

// Re-export commonly used types for convenience
pub use audio::{mulaw_to_pcm16, upsample_8k_to_16k, SpeechGate};
pub use realtime::{ClientEvent, LinkError, LinkHandle, ServerEvent};
pub use session::{CallMeta, CallSession, CallType, Direction, Stage, TranscriptLog};
pub use telephony::{OutgoingFrame, TelephonyEvent, TelephonyRoute};
