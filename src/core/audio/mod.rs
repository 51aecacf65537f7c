//! Audio conversion and voice-activity primitives.
//!
//! Everything here is synchronous and non-blocking; both submodules run
//! inline on the session task's hot path.

pub mod codec;
pub mod vad;

pub use codec::{mulaw_to_pcm16, upsample_8k_to_16k};
pub use vad::{SpeechGate, DEFAULT_ENERGY_THRESHOLD, DEFAULT_HANGOVER_MS};
