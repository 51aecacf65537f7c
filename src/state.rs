//! Process-wide shared state.
//!
//! Everything here is immutable after startup and shared by reference with
//! every session; per-call mutable state lives inside each session task.

use std::time::Instant;

use crate::config::BridgeConfig;

/// The two prompt texts loaded from disk at startup.
#[derive(Debug, Clone)]
pub struct Prompts {
    /// System instructions prefix for the voice agent
    pub agent: String,
    /// System prompt for the post-call summarizer
    pub summary: String,
}

/// Application state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    pub config: BridgeConfig,
    pub prompts: Prompts,
    /// Process start, for the health endpoint's uptime
    pub started: Instant,
}

impl AppState {
    pub fn new(config: BridgeConfig, prompts: Prompts) -> Self {
        Self {
            config,
            prompts,
            started: Instant::now(),
        }
    }

    /// State backed by the test configuration.
    pub fn for_tests() -> Self {
        Self::new(
            BridgeConfig::for_tests(),
            Prompts {
                agent: "You are Dipsy, a friendly voice sales agent.".to_string(),
                summary: "Summarize sales calls in a few sentences.".to_string(),
            },
        )
    }
}
