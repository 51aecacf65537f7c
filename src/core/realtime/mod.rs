//! Realtime speech peer: typed wire protocol and the outbound WebSocket link.

pub mod link;
pub mod messages;

pub use link::{connect, LinkError, LinkHandle, REALTIME_URL};
pub use messages::{
    ApiError, ClientEvent, InputTranscription, ResponseDirective, ServerEvent, SessionSettings,
    TurnDetection,
};
