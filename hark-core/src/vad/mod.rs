//! Voice Activity Detection (VAD) abstraction.
//!
//! The `VoiceActivityDetector` trait is the seam between chunk
//! classification and the endpoint detector's stopping rule: swap in
//! `AmplitudeVad` (default) or any future detector without touching the
//! capture loop.

pub mod amplitude;

pub use amplitude::AmplitudeVad;

use crate::buffering::chunk::AudioChunk;

/// Whether a given audio chunk contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    /// The chunk's volume is at or above threshold.
    Voiced,
    /// The chunk is below threshold.
    Silent,
}

impl VadDecision {
    pub fn is_voiced(self) -> bool {
        self == VadDecision::Voiced
    }
}

/// Trait for all VAD implementations.
///
/// Implementors may be stateful; `reset` clears any per-utterance state.
pub trait VoiceActivityDetector: Send + 'static {
    /// Analyse a chunk and return a voiced/silent decision.
    ///
    /// The chunk's `sample_rate` should match whatever rate this detector
    /// was configured for. Resampling is the caller's responsibility.
    fn classify(&mut self, chunk: &AudioChunk) -> VadDecision;

    /// Reset any internal state between utterances.
    fn reset(&mut self);
}
