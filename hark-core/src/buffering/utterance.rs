//! One bounded utterance, assembled from chunks by the endpoint detector.

use super::chunk::AudioChunk;

/// An ordered concatenation of captured chunks representing one utterance.
///
/// Built once when detection completes and then handed to the transcription
/// backend; the detector never mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Mono signed 16-bit samples in capture order.
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Utterance {
    /// Concatenate chunks in capture order.
    ///
    /// `sample_rate` is used verbatim; chunks are expected to share it (the
    /// detector only ever buffers chunks from a single source).
    pub fn from_chunks<I>(sample_rate: u32, chunks: I) -> Self
    where
        I: IntoIterator<Item = AudioChunk>,
    {
        let mut samples = Vec::new();
        for chunk in chunks {
            samples.extend_from_slice(&chunk.samples);
        }
        Self {
            samples,
            sample_rate,
        }
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
