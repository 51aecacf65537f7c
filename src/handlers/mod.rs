//! HTTP and WebSocket request handlers.
//!
//! - `api` - health surface
//! - `telephony` - media-stream WebSocket bridging one call

pub mod api;
pub mod telephony;

pub use api::health_check;
pub use telephony::media_stream_handler;
