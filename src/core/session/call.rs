//! Per-call orchestrator.
//!
//! One `CallSession` exists per accepted telephony connection. It owns every
//! piece of mutable per-call state (the speech gate, the transcript, the
//! metadata, the lifecycle stage, the finalized flag) and is only ever
//! touched from its own session task, so none of it needs locking.
//!
//! Lifecycle: `Init` at accept; `Configuring` once the telephony `start`
//! arrives and the realtime link is being opened; `Active` after the session
//! configuration and opening directive have been sent; `Finalizing` on stop
//! or telephony close; `Closed` once both links are released. Finalization
//! runs at most once, guarded by the `finalized` flag, and also runs
//! best-effort when the telephony socket dies without a `stop` frame.
//!
//! A realtime link failure never ends the call by itself: the session keeps
//! draining telephony traffic (dropping ingress audio) until the caller
//! hangs up, then finalizes with whatever transcript was assembled.

use std::sync::Arc;
use std::time::Instant;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::core::audio::{mulaw_to_pcm16, upsample_8k_to_16k, SpeechGate};
use crate::core::realtime::{self, ClientEvent, LinkHandle, ServerEvent};
use crate::core::session::configurator::{
    opening_directive, session_update, CallMeta, CallType, Direction,
};
use crate::core::session::transcript::TranscriptLog;
use crate::core::telephony::{OutgoingFrame, StartInfo, TelephonyEvent, TelephonyRoute};
use crate::finalize::{CallOutcome, Finalizer};
use crate::state::AppState;

/// Session lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Configuring,
    Active,
    Finalizing,
    Closed,
}

/// State and behavior of one bridged call.
pub struct CallSession {
    state: Arc<AppState>,
    route_tx: mpsc::Sender<TelephonyRoute>,

    stage: Stage,
    connection_id: String,
    stream_id: Option<String>,
    call_id: Option<String>,
    correlation_id: String,
    meta: CallMeta,
    started_at: Option<DateTime<Utc>>,

    link: Option<LinkHandle>,
    link_rx: Option<mpsc::Receiver<ServerEvent>>,
    link_ready: bool,

    gate: SpeechGate,
    transcript: TranscriptLog,

    finalized: bool,
    dropped_ingress: u64,
    dropped_egress: u64,
}

impl CallSession {
    pub fn new(state: Arc<AppState>, route_tx: mpsc::Sender<TelephonyRoute>) -> Self {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let gate = SpeechGate::new(
            state.config.vad_energy_threshold,
            state.config.vad_hangover,
        );
        Self {
            state,
            route_tx,
            stage: Stage::Init,
            correlation_id: connection_id.clone(),
            connection_id,
            stream_id: None,
            call_id: None,
            meta: CallMeta::default(),
            started_at: None,
            link: None,
            link_rx: None,
            link_ready: false,
            gate,
            transcript: TranscriptLog::new(),
            finalized: false,
            dropped_ingress: 0,
            dropped_egress: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_closed(&self) -> bool {
        self.stage == Stage::Closed
    }

    /// Stable per-call identifier: the first non-empty of call id, stream id,
    /// connection id. Present on every structured log line for the session.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn transcript_text(&self) -> &str {
        self.transcript.rendered()
    }

    pub fn dropped_ingress(&self) -> u64 {
        self.dropped_ingress
    }

    pub fn dropped_egress(&self) -> u64 {
        self.dropped_egress
    }

    /// Receiver of realtime link events, polled by the session task's select
    /// loop. `None` while no link is attached.
    pub fn link_rx_mut(&mut self) -> Option<&mut mpsc::Receiver<ServerEvent>> {
        self.link_rx.as_mut()
    }

    /// Bind a realtime link to this session. At most one link exists per
    /// session; a second attach replaces a dead one only after
    /// `handle_link_closed` has cleared the first.
    pub fn attach_link(&mut self, handle: LinkHandle, rx: mpsc::Receiver<ServerEvent>) {
        self.link = Some(handle);
        self.link_rx = Some(rx);
    }

    // =========================================================================
    // Telephony inbound
    // =========================================================================

    /// Parse and dispatch one telephony text frame.
    pub async fn handle_telephony_text(&mut self, text: &str) {
        let event: TelephonyEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(correlation_id = %self.correlation_id, error = %e, "malformed telephony frame ignored");
                return;
            }
        };

        match event {
            TelephonyEvent::Start { start } => self.on_start(start).await,
            TelephonyEvent::Media { media } => self.on_media(&media.payload).await,
            TelephonyEvent::Mark { mark } => {
                debug!(correlation_id = %self.correlation_id, name = %mark.name, "mark received");
            }
            TelephonyEvent::Stop => self.on_stop().await,
            TelephonyEvent::Other => {
                debug!(correlation_id = %self.correlation_id, "unrecognized telephony event ignored");
            }
        }
    }

    /// The telephony socket closed or errored without a `stop` frame.
    /// Finalize best-effort with whatever was assembled.
    pub async fn handle_telephony_closed(&mut self) {
        if self.is_closed() {
            return;
        }
        info!(correlation_id = %self.correlation_id, "telephony socket closed, finalizing");
        self.finalize().await;
        self.shutdown().await;
    }

    async fn on_start(&mut self, start: StartInfo) {
        self.stream_id = non_empty(start.stream_sid);
        self.call_id = non_empty(start.call_sid);
        self.correlation_id = self
            .call_id
            .clone()
            .or_else(|| self.stream_id.clone())
            .unwrap_or_else(|| self.connection_id.clone());
        self.started_at = Some(Utc::now());

        let params = start.custom_parameters;
        self.meta = CallMeta {
            direction: params
                .direction
                .as_deref()
                .map(Direction::parse)
                .unwrap_or_default(),
            call_type: params
                .call_type
                .as_deref()
                .map(CallType::parse)
                .unwrap_or_default(),
            last_summary: params.last_summary,
            last_transcript: params.last_transcript,
        };
        self.stage = Stage::Configuring;

        info!(
            correlation_id = %self.correlation_id,
            direction = self.meta.direction.as_str(),
            followup = matches!(self.meta.call_type, CallType::Followup),
            "call started"
        );

        if self.link.is_none() {
            let connected = realtime::connect(
                &self.state.config.openai_api_key,
                &self.state.config.realtime_model,
                &self.correlation_id,
            )
            .await;
            match connected {
                Ok((handle, rx)) => self.attach_link(handle, rx),
                Err(e) => {
                    warn!(correlation_id = %self.correlation_id, error = %e, "realtime link failed to open");
                    return;
                }
            }
        }

        self.configure_link().await;
    }

    /// Send the session configuration followed by the opening directive.
    /// Audio is only forwarded once both have been queued.
    async fn configure_link(&mut self) {
        let Some(link) = self.link.clone() else {
            return;
        };

        let update = session_update(&self.state.config, &self.state.prompts.agent, &self.meta);
        let directive = opening_directive(&self.meta);

        if link.send(update).await.is_err() || link.send(directive).await.is_err() {
            warn!(correlation_id = %self.correlation_id, "realtime link lost during configuration");
            self.handle_link_closed();
            return;
        }

        self.link_ready = true;
        self.stage = Stage::Active;
        info!(correlation_id = %self.correlation_id, "realtime session configured");
    }

    /// Audio ingress: µ-law frame from the caller towards the realtime peer.
    async fn on_media(&mut self, payload: &str) {
        if !self.link_ready || self.link.is_none() {
            self.dropped_ingress += 1;
            trace!(
                correlation_id = %self.correlation_id,
                dropped = self.dropped_ingress,
                "ingress frame dropped, realtime link not ready"
            );
            return;
        }

        let mulaw = match BASE64_STANDARD.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(correlation_id = %self.correlation_id, error = %e, "undecodable media payload dropped");
                return;
            }
        };

        let pcm8k = mulaw_to_pcm16(&mulaw);
        self.gate.observe_frame(&pcm8k, Instant::now());
        let pcm16k = upsample_8k_to_16k(&pcm8k);

        let Some(link) = self.link.clone() else {
            return;
        };
        if link.send(ClientEvent::audio_append(&pcm16k)).await.is_err() {
            self.dropped_ingress += 1;
            self.handle_link_closed();
        }
    }

    async fn on_stop(&mut self) {
        info!(correlation_id = %self.correlation_id, "stop received");
        self.finalize().await;
        self.shutdown().await;
    }

    // =========================================================================
    // Realtime inbound
    // =========================================================================

    /// Dispatch one event from the realtime link.
    pub async fn handle_link_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SpeechStarted => self.gate.peer_speech_started(Instant::now()),
            ServerEvent::SpeechStopped => self.gate.peer_speech_stopped(),
            ServerEvent::AudioDelta { delta } => self.on_audio_delta(delta).await,
            ServerEvent::OutputTextDelta { delta } => self.transcript.push_agent_delta(&delta),
            ServerEvent::ResponseCompleted => self.transcript.commit_agent(),
            ServerEvent::TranscriptionCompleted { transcript } => {
                self.transcript.push_caller(&transcript)
            }
            ServerEvent::Error { error } => {
                // The call can continue audio-only; never terminate on a
                // peer-reported error.
                warn!(
                    correlation_id = %self.correlation_id,
                    error_type = %error.error_type,
                    message = %error.message,
                    "realtime peer reported an error"
                );
            }
            ServerEvent::Other => {
                trace!(correlation_id = %self.correlation_id, "unhandled realtime event");
            }
        }
    }

    /// Audio egress with the barge-in gate: while the human is speaking,
    /// every agent frame is dropped so buffered model audio cannot talk over
    /// the caller at the phone.
    async fn on_audio_delta(&mut self, delta: String) {
        if self.gate.is_speaking() {
            self.dropped_egress += 1;
            debug!(
                correlation_id = %self.correlation_id,
                dropped = self.dropped_egress,
                "agent audio suppressed while caller speaking"
            );
            return;
        }

        let stream_sid = self.stream_id.as_deref().unwrap_or_default();
        let frame = OutgoingFrame::media(stream_sid, delta);
        let json = match serde_json::to_string(&frame) {
            Ok(j) => j,
            Err(e) => {
                warn!(correlation_id = %self.correlation_id, error = %e, "failed to serialize media frame");
                return;
            }
        };
        if self.route_tx.send(TelephonyRoute::Frame(json)).await.is_err() {
            self.dropped_egress += 1;
            debug!(
                correlation_id = %self.correlation_id,
                dropped = self.dropped_egress,
                "egress frame dropped, telephony sender gone"
            );
        }
    }

    /// The realtime link's event channel closed. Not a call-terminating
    /// condition: clear the handle and keep serving telephony until `stop`.
    pub fn handle_link_closed(&mut self) {
        if self.link.is_some() || self.link_rx.is_some() {
            info!(correlation_id = %self.correlation_id, "realtime link closed");
        }
        self.link = None;
        self.link_rx = None;
        self.link_ready = false;
    }

    // =========================================================================
    // Finalization
    // =========================================================================

    /// Run the post-call pipeline exactly once.
    async fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.stage = Stage::Finalizing;

        let outcome = CallOutcome {
            call_id: self.call_id.clone(),
            direction: self.meta.direction,
            transcript: self.transcript.rendered().trim().to_string(),
            started_at: self.started_at,
            correlation_id: self.correlation_id.clone(),
        };

        let finalizer = Finalizer::new(
            self.state.config.clone(),
            self.state.prompts.summary.clone(),
        );
        // Sink failures are logged inside the finalizer; nothing else to do
        // with them here.
        let _ = finalizer.run(outcome).await;
    }

    /// Release both links. The call-log write has already happened by the
    /// time this runs.
    pub async fn shutdown(&mut self) {
        if self.stage != Stage::Closed {
            info!(
                correlation_id = %self.correlation_id,
                dropped_ingress = self.dropped_ingress,
                dropped_egress = self.dropped_egress,
                "session closed"
            );
        }
        self.link = None;
        self.link_rx = None;
        self.link_ready = false;
        let _ = self.route_tx.send(TelephonyRoute::Close).await;
        self.stage = Stage::Closed;
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
