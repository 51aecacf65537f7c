//! Outbound WebSocket link to the realtime speech peer.
//!
//! [`connect`] performs the handshake and spawns a single link task that
//! owns the socket. The task pumps two directions at once: client
//! events arrive on an mpsc channel and leave as JSON text frames; inbound
//! frames are parsed into [`ServerEvent`]s and forwarded to the session task.
//!
//! There is no reconnection. When the peer closes or the socket errors, the
//! task drops the event sender and ends; the session observes the closed
//! channel and keeps draining telephony traffic until the call stops.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::messages::{ClientEvent, ServerEvent};

/// Realtime WebSocket endpoint.
pub const REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Capacity of the outbound event channel. Audio appends arrive at ~50 Hz,
/// so this absorbs several seconds of backlog before send() would wait.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the inbound event channel consumed by the session task.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors raised by the realtime link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// WebSocket handshake failed
    #[error("realtime connect failed: {0}")]
    Connect(String),

    /// The link task has ended; the socket is gone
    #[error("realtime link closed")]
    Closed,
}

/// Sending half of a realtime link, held by the session.
///
/// Cheap to clone; all clones feed the same link task.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    tx: mpsc::Sender<ClientEvent>,
}

impl LinkHandle {
    /// Queue an event for transmission. Fails once the link task has ended.
    pub async fn send(&self, event: ClientEvent) -> Result<(), LinkError> {
        self.tx.send(event).await.map_err(|_| LinkError::Closed)
    }

    /// Build a handle/receiver pair that is not backed by a socket.
    ///
    /// Used by tests to stand in for a connected link; the returned receiver
    /// yields every event passed to [`LinkHandle::send`].
    pub fn detached() -> (Self, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }
}

/// Connect to the realtime peer.
///
/// On success returns the sending handle and the stream of parsed server
/// events. The event receiver yields `None` once the link is gone.
pub async fn connect(
    api_key: &str,
    model: &str,
    correlation_id: &str,
) -> Result<(LinkHandle, mpsc::Receiver<ServerEvent>), LinkError> {
    let url = format!("{REALTIME_URL}?model={model}");

    let mut request = url
        .into_client_request()
        .map_err(|e| LinkError::Connect(e.to_string()))?;
    request.headers_mut().insert(
        "Authorization",
        format!("Bearer {api_key}")
            .parse()
            .map_err(|_| LinkError::Connect("invalid authorization header".into()))?,
    );
    request.headers_mut().insert(
        "OpenAI-Beta",
        "realtime=v1"
            .parse()
            .map_err(|_| LinkError::Connect("invalid beta header".into()))?,
    );

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| LinkError::Connect(e.to_string()))?;

    info!(correlation_id, model, "realtime link established");

    let (mut ws_sink, mut ws_source) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(OUTBOUND_CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(EVENT_CHANNEL_CAPACITY);

    let correlation_id = correlation_id.to_string();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    let Some(event) = outbound else {
                        // Session dropped its handle; close our side.
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    };
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!(correlation_id = %correlation_id, error = %e, "failed to serialize client event");
                            continue;
                        }
                    };
                    if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                        warn!(correlation_id = %correlation_id, error = %e, "realtime send failed");
                        break;
                    }
                }

                inbound = ws_source.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerEvent>(&text) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        // Session is gone; nothing left to feed.
                                        break;
                                    }
                                }
                                Err(e) => {
                                    debug!(correlation_id = %correlation_id, error = %e, "unparseable server frame ignored");
                                }
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            if ws_sink.send(Message::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!(correlation_id = %correlation_id, "realtime peer closed the link");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(correlation_id = %correlation_id, error = %e, "realtime link error");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
        // Dropping event_tx signals link closure to the session task.
        debug!(correlation_id = %correlation_id, "realtime link task ended");
    });

    Ok((LinkHandle { tx: outbound_tx }, event_rx))
}
