//! `StubTranscriber` — placeholder backend that echoes metadata without a
//! real model.
//!
//! Lets the full capture + transport pipeline run end-to-end on machines
//! with no transcription service installed.

use crate::buffering::utterance::Utterance;
use crate::error::Result;
use crate::transcribe::{Transcriber, TranscriptSegment, Transcription};
use tracing::debug;

/// Echo-style stub backend.
///
/// Emits one segment spanning the whole utterance:
/// `"[stub: <D>s @ <SR> Hz]"`. Empty utterances produce no segments.
pub struct StubTranscriber {
    call_count: u32,
}

impl StubTranscriber {
    pub fn new() -> Self {
        Self { call_count: 0 }
    }
}

impl Default for StubTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber for StubTranscriber {
    fn warm_up(&mut self) -> Result<()> {
        debug!("StubTranscriber::warm_up — no-op");
        Ok(())
    }

    fn transcribe(&mut self, utterance: &Utterance, _beam_size: u32) -> Result<Transcription> {
        if utterance.is_empty() {
            return Ok(Transcription {
                segments: vec![],
                language: None,
            });
        }

        self.call_count += 1;
        let duration = utterance.duration_secs() as f32;

        Ok(Transcription {
            segments: vec![TranscriptSegment {
                start_secs: 0.0,
                end_secs: duration,
                text: format!(
                    "[stub: {:.2}s @ {} Hz]",
                    duration, utterance.sample_rate
                ),
            }],
            language: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_segment_covering_the_utterance() {
        let mut stub = StubTranscriber::new();
        let utterance = Utterance {
            samples: vec![0; 16_000],
            sample_rate: 16_000,
        };
        let result = stub.transcribe(&utterance, 5).unwrap();
        assert_eq!(result.segments.len(), 1);
        assert!((result.segments[0].end_secs - 1.0).abs() < 1e-6);
        assert!(result.segments[0].text.starts_with("[stub:"));
    }

    #[test]
    fn empty_utterance_produces_no_segments() {
        let mut stub = StubTranscriber::new();
        let utterance = Utterance {
            samples: vec![],
            sample_rate: 16_000,
        };
        let result = stub.transcribe(&utterance, 5).unwrap();
        assert!(result.segments.is_empty());
        assert_eq!(result.text(), "");
    }
}
