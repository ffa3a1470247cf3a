//! # hark-core
//!
//! Reusable speech capture + endpointing SDK.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → MicSource (cpal → SPSC ring → resample → i16 chunks)
//!                   │  blocking next_chunk()
//!             EndpointDetector (amplitude VAD + silence timeout)
//!                   │  one bounded Utterance
//!             Transcriber::transcribe (external model)
//!                   │
//!             Transcription { segments, language }
//! ```
//!
//! The audio callback is zero-alloc. All heap work happens on the capture
//! loop thread. Capture and transcription are strictly sequential — the
//! model only ever sees a finalised utterance.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod endpoint;
pub mod error;
pub mod transcribe;
pub mod vad;

// Convenience re-exports for downstream crates
pub use audio::{ChunkSource, MicSource};
pub use buffering::{chunk::AudioChunk, utterance::Utterance};
pub use endpoint::{capture_utterance, DetectorState, EndpointConfig, EndpointDetector};
pub use error::HarkError;
pub use transcribe::{Transcriber, TranscriberHandle, TranscriptSegment, Transcription};

#[cfg(feature = "remote")]
pub use transcribe::{RemoteTranscriber, RemoteTranscriberConfig};
