//! Sample-rate conversion from the device rate to the detector rate.
//!
//! ## Design
//!
//! cpal captures at the device's native rate (commonly 48 kHz); the endpoint
//! detector runs at whatever rate the configuration names (16 kHz by
//! default). `RateConverter` bridges that gap on the capture-loop thread and
//! quantises the result to the signed 16-bit sample domain the detector and
//! the transcription handoff work in.
//!
//! When device rate == detector rate no rubato session is created at all;
//! input passes straight through the i16 conversion.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{HarkError, Result};

/// Input frame count per rubato process call. 20 ms at 48 kHz.
pub const CONVERT_CHUNK: usize = 960;

/// Converts mono f32 capture audio to i16 at a fixed output rate.
pub struct RateConverter {
    /// `None` when device rate == detector rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input blocks between calls.
    input_buf: Vec<f32>,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Errors
    /// Returns `HarkError::AudioDevice` if rubato fails to initialise.
    pub fn new(device_rate: u32, target_rate: u32) -> Result<Self> {
        if device_rate == target_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / device_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            CONVERT_CHUNK,
            1, // mono
        )
        .map_err(|e| HarkError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        tracing::info!(device_rate, target_rate, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            output_buf,
        })
    }

    /// Process incoming f32 samples, returning i16 output at the target
    /// rate (may be empty).
    ///
    /// Samples are accumulated internally until a full `CONVERT_CHUNK`
    /// block is available for rubato. Any remainder is kept for the next
    /// call. In passthrough mode input is converted directly.
    pub fn process(&mut self, samples: &[f32]) -> Vec<i16> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.iter().copied().map(f32_to_i16).collect();
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();

        while self.input_buf.len() >= CONVERT_CHUNK {
            let input_slice = &self.input_buf[..CONVERT_CHUNK];

            match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend(self.output_buf[0][..produced].iter().copied().map(f32_to_i16));
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            self.input_buf.drain(..CONVERT_CHUNK);
        }

        result
    }

    /// Returns `true` when device rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

/// Quantise a normalised f32 sample to i16, clamping out-of-range input.
fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_converts_to_i16() {
        let mut rc = RateConverter::new(16_000, 16_000).unwrap();
        assert!(rc.is_passthrough());
        let out = rc.process(&[0.0, 0.5, -0.5, 1.0, -1.0]);
        assert_eq!(out, vec![0, 16_384, -16_384, 32_767, -32_767]);
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        let mut rc = RateConverter::new(16_000, 16_000).unwrap();
        let out = rc.process(&[2.0, -2.0]);
        assert_eq!(out, vec![32_767, -32_767]);
    }

    #[test]
    fn ratio_48k_to_16k_correct_length() {
        let mut rc = RateConverter::new(48_000, 16_000).unwrap();
        assert!(!rc.is_passthrough());
        // 960 input samples at 48 kHz → ~320 at 16 kHz
        let samples = vec![0.0f32; 960];
        let out = rc.process(&samples);
        assert!(!out.is_empty(), "expected non-empty output");
        let expected = 320usize;
        assert!(
            (out.len() as isize - expected as isize).unsigned_abs() <= 10,
            "output len={} expected≈{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn partial_accumulation_returns_empty() {
        let mut rc = RateConverter::new(48_000, 16_000).unwrap();
        // Fewer than CONVERT_CHUNK samples → nothing output yet
        let out = rc.process(&vec![0.0f32; 500]);
        assert!(
            out.is_empty(),
            "expected empty output for partial block, got {}",
            out.len()
        );
    }

    #[test]
    fn multiple_partial_blocks_accumulate() {
        let mut rc = RateConverter::new(48_000, 16_000).unwrap();
        // Two 500-sample pushes = 1000 total ≥ 960 → should produce output
        let out1 = rc.process(&vec![0.0f32; 500]);
        assert!(out1.is_empty());
        let out2 = rc.process(&vec![0.0f32; 500]);
        assert!(!out2.is_empty(), "second push should trigger processing");
    }
}
