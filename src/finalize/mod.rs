//! End-of-call pipeline: summary, call-log write, cleanup.
//!
//! Ordering is fixed: the summary request (when one is made) precedes the
//! call-log POST, and the POST precedes socket closure; the session only
//! closes its links after `Finalizer::run` returns. Both HTTP steps carry
//! finite timeouts so a wedged endpoint cannot leak sessions.

pub mod call_log;
pub mod summary;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::core::session::Direction;

pub use call_log::{post_call_log, CallLogError, CallLogRecord};
pub use summary::{request_summary, SUMMARY_MIN_TRANSCRIPT_CHARS};

/// Timeout applied to each finalization HTTP request.
const FINALIZE_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything the finalizer needs from a terminated call.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub call_id: Option<String>,
    pub direction: Direction,
    /// Rendered transcript, already trimmed of outer whitespace
    pub transcript: String,
    pub started_at: Option<DateTime<Utc>>,
    pub correlation_id: String,
}

/// Runs the post-call pipeline for one session.
pub struct Finalizer {
    http: reqwest::Client,
    config: BridgeConfig,
    summary_prompt: String,
}

impl Finalizer {
    pub fn new(config: BridgeConfig, summary_prompt: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FINALIZE_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            config,
            summary_prompt,
        }
    }

    /// Summarize and persist one call. Missing preconditions skip the whole
    /// pipeline without error; a summary failure downgrades to a null
    /// summary; only the sink write is surfaced to the caller, and even that
    /// is non-fatal.
    pub async fn run(&self, outcome: CallOutcome) -> Result<(), CallLogError> {
        let correlation_id = outcome.correlation_id.as_str();

        let Some(call_id) = outcome
            .call_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            info!(correlation_id, "finalization skipped: no call identifier");
            return Ok(());
        };

        let transcript = outcome.transcript.trim();
        if transcript.is_empty() {
            info!(correlation_id, "finalization skipped: empty transcript");
            return Ok(());
        }

        let summary = if transcript.len() >= SUMMARY_MIN_TRANSCRIPT_CHARS {
            request_summary(
                &self.http,
                &self.config,
                &self.summary_prompt,
                transcript,
                correlation_id,
            )
            .await
        } else {
            info!(
                correlation_id,
                transcript_chars = transcript.len(),
                "transcript below summary threshold, skipping summary"
            );
            None
        };

        let mut record = CallLogRecord::new(
            outcome.direction.as_str(),
            &self.config.summary_model,
            Utc::now(),
        );
        record.twilio_call_sid = Some(call_id.to_string());
        record.org_id = self.config.call_log_org_id.clone();
        record.transcript = Some(transcript.to_string());
        record.ai_summary = summary;
        record.started_at = outcome.started_at;

        match post_call_log(&self.http, &self.config, &record).await {
            Ok(()) => {
                info!(
                    correlation_id,
                    summarized = record.ai_summary.is_some(),
                    "call log persisted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(correlation_id, error = %e, "call log write failed");
                Err(e)
            }
        }
    }
}
