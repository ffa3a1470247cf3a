//! Amplitude-threshold VAD over mean absolute sample magnitude.
//!
//! A chunk whose mean |sample| reaches the threshold is voiced; everything
//! else is silent. There is no hangover and no noise-floor calibration —
//! endpointing hysteresis lives entirely in the detector's silence-timeout
//! rule, so a single loud transient is enough to (re)start the clock.

use super::{VadDecision, VoiceActivityDetector};
use crate::buffering::chunk::AudioChunk;

/// A stateless mean-amplitude voice activity detector.
#[derive(Debug, Clone)]
pub struct AmplitudeVad {
    /// Mean absolute amplitude threshold in the i16 sample domain.
    /// Typical range: 300–1000 for a consumer microphone.
    threshold: f32,
}

impl AmplitudeVad {
    /// Create a new `AmplitudeVad`.
    ///
    /// # Parameters
    /// - `threshold`: mean |sample| at or above which a chunk is voiced.
    ///   Default: `500.0`.
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Default for AmplitudeVad {
    fn default() -> Self {
        Self::new(500.0)
    }
}

impl VoiceActivityDetector for AmplitudeVad {
    fn classify(&mut self, chunk: &AudioChunk) -> VadDecision {
        if chunk.mean_amplitude() >= self.threshold {
            VadDecision::Voiced
        } else {
            VadDecision::Silent
        }
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_with_volume(volume: i16, len: usize) -> AudioChunk {
        AudioChunk::new(vec![volume; len], 16_000)
    }

    #[test]
    fn quiet_chunk_is_silent() {
        let mut vad = AmplitudeVad::new(500.0);
        assert_eq!(
            vad.classify(&chunk_with_volume(50, 1600)),
            VadDecision::Silent
        );
    }

    #[test]
    fn loud_chunk_is_voiced() {
        let mut vad = AmplitudeVad::new(500.0);
        assert_eq!(
            vad.classify(&chunk_with_volume(600, 1600)),
            VadDecision::Voiced
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut vad = AmplitudeVad::new(500.0);
        assert_eq!(
            vad.classify(&chunk_with_volume(500, 1600)),
            VadDecision::Voiced
        );
    }

    #[test]
    fn negative_samples_count_by_magnitude() {
        let mut vad = AmplitudeVad::new(500.0);
        assert_eq!(
            vad.classify(&chunk_with_volume(-600, 1600)),
            VadDecision::Voiced
        );
    }

    #[test]
    fn empty_chunk_is_silent() {
        let mut vad = AmplitudeVad::default();
        let chunk = AudioChunk::new(vec![], 16_000);
        assert_eq!(vad.classify(&chunk), VadDecision::Silent);
    }

    #[test]
    fn zero_threshold_marks_everything_voiced() {
        let mut vad = AmplitudeVad::new(0.0);
        assert_eq!(
            vad.classify(&chunk_with_volume(0, 1600)),
            VadDecision::Voiced
        );
    }
}
