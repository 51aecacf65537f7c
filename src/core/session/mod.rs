//! Per-call session: metadata, transcript, configuration, orchestration.

pub mod call;
pub mod configurator;
pub mod transcript;

pub use call::{CallSession, Stage};
pub use configurator::{opening_directive, session_update, CallMeta, CallType, Direction};
pub use transcript::TranscriptLog;
