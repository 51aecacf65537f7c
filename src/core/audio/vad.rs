//! Two-source voice activity fusion for the barge-in gate.
//!
//! The gate fuses a cheap local energy estimator with the realtime peer's own
//! speech events into a single "human speaking" predicate. The local estimator
//! reacts within one frame (~20 ms), covering the gap before the peer commits
//! an `input_audio_buffer.speech_started` event; the peer events correct the
//! estimator when line noise sits near the threshold.

use std::time::{Duration, Instant};

/// Default mean-absolute-sample threshold on 8 kHz PCM16 frames.
pub const DEFAULT_ENERGY_THRESHOLD: i32 = 500;

/// Default hangover before a quiet line clears the speaking flag.
pub const DEFAULT_HANGOVER_MS: u64 = 600;

/// Fused voice-activity state for one call.
///
/// Invariant: `speaking == true` implies `last_voice_at` is set.
#[derive(Debug)]
pub struct SpeechGate {
    speaking: bool,
    last_voice_at: Option<Instant>,
    energy_threshold: i32,
    hangover: Duration,
}

impl SpeechGate {
    pub fn new(energy_threshold: i32, hangover: Duration) -> Self {
        Self {
            speaking: false,
            last_voice_at: None,
            energy_threshold,
            hangover,
        }
    }

    /// Whether the human is currently considered to be speaking.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one 8 kHz PCM16 little-endian frame through the energy estimator.
    ///
    /// A frame above the threshold marks speaking and stamps the clock; a
    /// quiet frame clears the flag only after the hangover has elapsed, so a
    /// short pause mid-sentence does not reopen the agent's audio path.
    pub fn observe_frame(&mut self, pcm: &[u8], now: Instant) {
        if mean_abs_sample(pcm) > self.energy_threshold {
            self.speaking = true;
            self.last_voice_at = Some(now);
        } else if self.speaking {
            if let Some(last) = self.last_voice_at {
                if now.duration_since(last) > self.hangover {
                    self.speaking = false;
                }
            }
        }
    }

    /// Peer VAD reported speech onset.
    pub fn peer_speech_started(&mut self, now: Instant) {
        self.speaking = true;
        self.last_voice_at = Some(now);
    }

    /// Peer VAD reported end of speech. Clears unconditionally; the peer has
    /// already decided the turn is over.
    pub fn peer_speech_stopped(&mut self) {
        self.speaking = false;
    }
}

/// Mean absolute sample value of a PCM16 little-endian buffer.
fn mean_abs_sample(pcm: &[u8]) -> i32 {
    let mut sum: i64 = 0;
    let mut count: i64 = 0;
    for sample in pcm.chunks_exact(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        sum += (value as i64).abs();
        count += 1;
    }
    if count == 0 {
        return 0;
    }
    (sum / count) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sample: i16, len: usize) -> Vec<u8> {
        sample.to_le_bytes().iter().copied().cycle().take(len * 2).collect()
    }

    fn gate() -> SpeechGate {
        SpeechGate::new(
            DEFAULT_ENERGY_THRESHOLD,
            Duration::from_millis(DEFAULT_HANGOVER_MS),
        )
    }

    #[test]
    fn loud_frame_sets_speaking() {
        let mut g = gate();
        g.observe_frame(&frame(2000, 160), Instant::now());
        assert!(g.is_speaking());
    }

    #[test]
    fn quiet_frame_alone_does_not_set_speaking() {
        let mut g = gate();
        g.observe_frame(&frame(100, 160), Instant::now());
        assert!(!g.is_speaking());
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut g = gate();
        // Exactly at the threshold does not trip the gate.
        g.observe_frame(&frame(500, 160), Instant::now());
        assert!(!g.is_speaking());
        g.observe_frame(&frame(501, 160), Instant::now());
        assert!(g.is_speaking());
    }

    #[test]
    fn speaking_persists_through_hangover() {
        let mut g = gate();
        let start = Instant::now();
        g.observe_frame(&frame(2000, 160), start);
        // Quiet frame inside the hangover window keeps the flag.
        g.observe_frame(&frame(0, 160), start + Duration::from_millis(300));
        assert!(g.is_speaking());
        // Quiet frame past the hangover clears it.
        g.observe_frame(&frame(0, 160), start + Duration::from_millis(601));
        assert!(!g.is_speaking());
    }

    #[test]
    fn peer_events_override_energy() {
        let mut g = gate();
        g.peer_speech_started(Instant::now());
        assert!(g.is_speaking());
        g.peer_speech_stopped();
        assert!(!g.is_speaking());
    }

    #[test]
    fn peer_stop_clears_even_after_recent_energy() {
        let mut g = gate();
        g.observe_frame(&frame(2000, 160), Instant::now());
        g.peer_speech_stopped();
        assert!(!g.is_speaking());
    }

    #[test]
    fn empty_frame_is_silent() {
        assert_eq!(mean_abs_sample(&[]), 0);
    }
}
