//! Telephony media-stream wire protocol.

pub mod messages;

pub use messages::{
    CustomParameters, MarkInfo, MediaPayload, OutgoingFrame, OutgoingMedia, StartInfo,
    TelephonyEvent, TelephonyRoute,
};
