//! Call-log sink: the external record written once per finalized call.
//!
//! The sink expects every field to be present, with absent values serialized
//! as explicit `null`: none of the `Option` fields carry a skip attribute.
//! Authentication is a bearer anon key plus a shared-secret header.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::BridgeConfig;

/// Header carrying the sink shared secret.
const SHARED_SECRET_HEADER: &str = "x-shared-secret";

/// Default terminal status for bridged calls.
const STATUS_COMPLETED: &str = "COMPLETED";

/// Errors from the call-log sink. Non-fatal to the process; the session
/// logs them and proceeds with cleanup.
#[derive(Debug, Error)]
pub enum CallLogError {
    /// Transport-level failure
    #[error("call-log request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Sink answered with a non-success status
    #[error("call-log sink returned status {0}")]
    Status(u16),
}

/// One call-log record. Fields without a value must still appear as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct CallLogRecord {
    pub twilio_call_sid: Option<String>,
    pub org_id: Option<String>,
    pub prospect_id: Option<String>,
    pub status: String,
    pub direction: String,
    pub to_number: Option<String>,
    pub from_number: Option<String>,
    pub transcript: Option<String>,
    pub ai_summary: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub model: String,
    pub recording_url: Option<String>,
    pub recording_duration_seconds: Option<u64>,
}

impl CallLogRecord {
    /// Record skeleton with the default status and no optional fields set.
    pub fn new(direction: &str, model: &str, ended_at: DateTime<Utc>) -> Self {
        Self {
            twilio_call_sid: None,
            org_id: None,
            prospect_id: None,
            status: STATUS_COMPLETED.to_string(),
            direction: direction.to_string(),
            to_number: None,
            from_number: None,
            transcript: None,
            ai_summary: None,
            started_at: None,
            ended_at,
            model: model.to_string(),
            recording_url: None,
            recording_duration_seconds: None,
        }
    }
}

/// POST a record to the configured sink.
pub async fn post_call_log(
    http: &reqwest::Client,
    config: &BridgeConfig,
    record: &CallLogRecord,
) -> Result<(), CallLogError> {
    let response = http
        .post(&config.call_log_url)
        .bearer_auth(&config.call_log_anon_key)
        .header(SHARED_SECRET_HEADER, &config.call_log_shared_secret)
        .json(record)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(CallLogError::Status(status.as_u16()));
    }
    Ok(())
}
