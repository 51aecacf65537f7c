//! Router assembly.
//!
//! # Endpoints
//!
//! - `GET /` and `GET /health` - health surface for the external monitor
//! - `GET /media-stream` - WebSocket upgrade for the telephony media stream

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_check, media_stream_handler};
use crate::state::AppState;

/// Build the application router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
