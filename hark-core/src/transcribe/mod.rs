//! Transcription backend abstraction.
//!
//! The `Transcriber` trait decouples capture from any specific speech
//! model. The model is an external collaborator: this crate never looks
//! inside it, it only hands over a finalised utterance and a beam-search
//! width and takes back timestamped segments.
//!
//! `&mut self` on `transcribe` intentionally expresses that backends may be
//! stateful (connection pools, decoder caches). All mutation is serialised
//! through `TranscriberHandle`'s `parking_lot::Mutex`.

pub mod stub;

#[cfg(feature = "remote")]
pub mod remote;

#[cfg(feature = "remote")]
pub use remote::{RemoteTranscriber, RemoteTranscriberConfig};

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::buffering::utterance::Utterance;
use crate::error::Result;

/// A single recognised span of speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Segment start offset within the utterance, in seconds.
    pub start_secs: f32,
    /// Segment end offset within the utterance, in seconds.
    pub end_secs: f32,
    /// Recognised text.
    pub text: String,
}

/// The full result of one transcription call.
///
/// Segments are chronological and non-overlapping, covering the input
/// duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    pub segments: Vec<TranscriptSegment>,
    /// Detected language, when the backend reports one. Auxiliary
    /// metadata — nothing in this crate consumes it.
    pub language: Option<String>,
}

impl Transcription {
    /// Concatenate all segment texts into one line.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Contract for transcription backends.
pub trait Transcriber: Send + 'static {
    /// One-time warm-up. Called once at host startup; backends use it to
    /// fail fast on misconfiguration (unreachable endpoint, missing model).
    ///
    /// # Errors
    /// Returns an error when the backend cannot possibly serve requests.
    fn warm_up(&mut self) -> Result<()>;

    /// Transcribe one finalised utterance.
    ///
    /// # Parameters
    /// - `utterance`: mono 16-bit PCM audio, consumed read-only.
    /// - `beam_size`: beam-search width forwarded to the model.
    ///
    /// # Errors
    /// Model failures surface as `HarkError::Transcription`; the caller
    /// discards the captured audio and does not retry.
    fn transcribe(&mut self, utterance: &Utterance, beam_size: u32) -> Result<Transcription>;
}

/// Thread-safe reference-counted handle to any `Transcriber` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic and a faster
/// uncontended lock than `std::sync::Mutex`.
#[derive(Clone)]
pub struct TranscriberHandle(pub Arc<Mutex<dyn Transcriber>>);

impl TranscriberHandle {
    /// Wrap any `Transcriber` in a `TranscriberHandle`.
    pub fn new<T: Transcriber>(transcriber: T) -> Self {
        Self(Arc::new(Mutex::new(transcriber)))
    }
}

impl std::fmt::Debug for TranscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriberHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_serialize_with_camel_case_fields() {
        let segment = TranscriptSegment {
            start_secs: 0.0,
            end_secs: 1.25,
            text: "hello there".into(),
        };

        let json = serde_json::to_value(&segment).expect("serialize segment");
        assert_eq!(json["startSecs"], 0.0);
        let end = json["endSecs"].as_f64().expect("endSecs should be a number");
        assert!((end - 1.25).abs() < 1e-6);
        assert_eq!(json["text"], "hello there");

        let round_trip: TranscriptSegment =
            serde_json::from_value(json).expect("deserialize segment");
        assert_eq!(round_trip.text, "hello there");
    }

    #[test]
    fn text_joins_segments_in_order() {
        let transcription = Transcription {
            segments: vec![
                TranscriptSegment {
                    start_secs: 0.0,
                    end_secs: 1.0,
                    text: " first".into(),
                },
                TranscriptSegment {
                    start_secs: 1.0,
                    end_secs: 2.0,
                    text: "second ".into(),
                },
            ],
            language: Some("en".into()),
        };
        assert_eq!(transcription.text(), "first second");
    }

    #[test]
    fn text_skips_empty_segments() {
        let transcription = Transcription {
            segments: vec![
                TranscriptSegment {
                    start_secs: 0.0,
                    end_secs: 0.5,
                    text: "  ".into(),
                },
                TranscriptSegment {
                    start_secs: 0.5,
                    end_secs: 1.0,
                    text: "ok".into(),
                },
            ],
            language: None,
        };
        assert_eq!(transcription.text(), "ok");
    }

    #[test]
    fn empty_transcription_yields_empty_text() {
        let transcription = Transcription {
            segments: vec![],
            language: None,
        };
        assert_eq!(transcription.text(), "");
    }
}
