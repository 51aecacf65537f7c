//! Inbound telephony media-stream WebSocket handler.
//!
//! Each accepted connection becomes one session task. The task owns the
//! `CallSession` and selects over the two event sources (telephony frames
//! and realtime link events), so every mutation of per-call state happens on
//! this one task. A separate sender task drains the outbound routing channel
//! into the socket, keeping egress writes off the session loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::realtime::ServerEvent;
use crate::core::session::CallSession;
use crate::core::telephony::TelephonyRoute;
use crate::state::AppState;

/// Outbound routing channel capacity. Egress audio arrives at ~50 Hz; this
/// absorbs several seconds before sends would wait.
const ROUTE_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the sender task to flush the close frame.
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Media-stream WebSocket handler.
///
/// Upgrades the HTTP connection and runs the call session until the stream
/// stops or the socket dies.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("media stream connection upgrade requested");
    ws.on_upgrade(move |socket| handle_media_stream(socket, state))
}

/// One input to the session loop.
enum SessionInput {
    Telephony(Option<Result<Message, axum::Error>>),
    Link(Option<ServerEvent>),
}

async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();
    let (route_tx, route_rx) = mpsc::channel::<TelephonyRoute>(ROUTE_CHANNEL_CAPACITY);
    let sender_task = tokio::spawn(run_sender(sender, route_rx));

    let mut session = CallSession::new(state, route_tx);
    info!(correlation_id = %session.correlation_id(), "media stream established");

    loop {
        let input = tokio::select! {
            frame = receiver.next() => SessionInput::Telephony(frame),
            event = next_link_event(session.link_rx_mut()) => SessionInput::Link(event),
        };

        match input {
            SessionInput::Telephony(Some(Ok(Message::Text(text)))) => {
                session.handle_telephony_text(&text).await;
            }
            SessionInput::Telephony(Some(Ok(Message::Close(_)))) => {
                session.handle_telephony_closed().await;
            }
            SessionInput::Telephony(Some(Ok(_))) => {
                // Binary/ping/pong frames carry nothing for the bridge.
            }
            SessionInput::Telephony(Some(Err(e))) => {
                warn!(correlation_id = %session.correlation_id(), error = %e, "telephony socket error");
                session.handle_telephony_closed().await;
            }
            SessionInput::Telephony(None) => {
                session.handle_telephony_closed().await;
            }
            SessionInput::Link(Some(event)) => {
                session.handle_link_event(event).await;
            }
            SessionInput::Link(None) => {
                session.handle_link_closed();
            }
        }

        if session.is_closed() {
            break;
        }
    }

    session.shutdown().await;
    drop(session);
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, sender_task).await.is_err() {
        debug!("telephony sender did not drain in time");
    }
}

/// Resolve the next realtime event, or park forever while no link exists so
/// the telephony branch keeps the loop moving.
async fn next_link_event(rx: Option<&mut mpsc::Receiver<ServerEvent>>) -> Option<ServerEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Drain the routing channel into the telephony socket.
async fn run_sender(
    mut sender: SplitSink<WebSocket, Message>,
    mut route_rx: mpsc::Receiver<TelephonyRoute>,
) {
    while let Some(route) = route_rx.recv().await {
        let closing = matches!(route, TelephonyRoute::Close);
        let result = match route {
            TelephonyRoute::Frame(json) => sender.send(Message::Text(json.into())).await,
            TelephonyRoute::Close => sender.send(Message::Close(None)).await,
        };
        if let Err(e) = result {
            debug!(error = %e, "telephony send failed");
            break;
        }
        if closing {
            break;
        }
    }
}
