//! Append-only bilingual transcript of one call.
//!
//! Caller lines come from input transcription events and are committed
//! immediately. Agent text streams in as deltas and is held in a buffer until
//! the peer signals response completion; partial agent text is never visible
//! in the rendered transcript.

/// Interleaved transcript plus the uncommitted agent buffer.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    text: String,
    agent_buffer: String,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a caller line. Empty-after-trim text is dropped.
    pub fn push_caller(&mut self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.text.push_str("\nCaller: ");
        self.text.push_str(trimmed);
        self.text.push('\n');
    }

    /// Buffer an agent text delta.
    pub fn push_agent_delta(&mut self, delta: &str) {
        self.agent_buffer.push_str(delta);
    }

    /// Commit the buffered agent text as one line and clear the buffer.
    ///
    /// A completion event with nothing buffered (or whitespace only) is a
    /// no-op apart from clearing the buffer.
    pub fn commit_agent(&mut self) {
        let trimmed = self.agent_buffer.trim();
        if !trimmed.is_empty() {
            self.text.push_str("\nDipsy: ");
            self.text.push_str(trimmed);
            self.text.push('\n');
        }
        self.agent_buffer.clear();
    }

    /// The raw rendered transcript, untrimmed.
    pub fn rendered(&self) -> &str {
        &self.text
    }

    /// Length of the transcript after trimming outer whitespace.
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().len()
    }

    /// Whether the committed transcript is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
