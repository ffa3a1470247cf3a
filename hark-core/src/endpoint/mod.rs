//! Endpoint detection — converting a live chunk stream into one bounded
//! utterance.
//!
//! ## Algorithm (per chunk)
//!
//! ```text
//! 1. Pull one fixed-duration chunk from the source (blocking)
//! 2. VAD classify → Voiced | Silent (mean |sample| vs threshold)
//! 3. Awaiting + Silent  → discard
//!    Awaiting + Voiced  → buffer the triggering chunk, start the utterance
//!    Voiced   + any     → buffer unconditionally
//! 4. Voiced chunks reset the silence clock; once accumulated post-voice
//!    silence reaches the timeout, capture is done
//! 5. Concatenate buffered chunks in capture order into one Utterance
//! ```
//!
//! The stopping rule is deliberately split from capture I/O:
//! [`EndpointDetector::feed`] is a pure state machine over chunks, and
//! [`capture_utterance`] is a thin driver over any [`ChunkSource`]. Tests
//! script chunk sequences without touching audio hardware.

use tracing::{debug, info};

use crate::{
    audio::ChunkSource,
    buffering::{chunk::AudioChunk, utterance::Utterance},
    error::{HarkError, Result},
    vad::{AmplitudeVad, VoiceActivityDetector},
};

/// Configuration for one detection session.
///
/// Threaded explicitly into the detector — there is no module-level tuning
/// state anywhere in the crate.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Sample rate the detector (and its source) run at, in Hz.
    /// Default: 16000.
    pub sample_rate: u32,
    /// Duration of each captured chunk in seconds. Default: 0.1.
    pub chunk_duration_secs: f64,
    /// Mean absolute amplitude (i16 domain) at or above which a chunk is
    /// voiced. Default: 500.0.
    pub amplitude_threshold: f32,
    /// Continuous post-voice silence required to end capture, in seconds.
    /// Default: 1.0.
    pub silence_timeout_secs: f64,
    /// Hard deadline on total observed audio (voiced or not), in seconds.
    /// `None` means capture can wait for speech indefinitely — on an
    /// all-silent input the loop then never terminates, matching the
    /// historical behavior of this detector.
    pub max_utterance_secs: Option<f64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_duration_secs: 0.1,
            amplitude_threshold: 500.0,
            silence_timeout_secs: 1.0,
            max_utterance_secs: None,
        }
    }
}

impl EndpointConfig {
    /// Validate all parameter constraints.
    ///
    /// # Errors
    /// Returns `HarkError::InvalidConfig` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(HarkError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.chunk_duration_secs <= 0.0 {
            return Err(HarkError::InvalidConfig(
                "chunk_duration_secs must be > 0".into(),
            ));
        }
        if self.amplitude_threshold < 0.0 {
            return Err(HarkError::InvalidConfig(
                "amplitude_threshold must be >= 0".into(),
            ));
        }
        if self.silence_timeout_secs <= 0.0 {
            return Err(HarkError::InvalidConfig(
                "silence_timeout_secs must be > 0".into(),
            ));
        }
        if let Some(cap) = self.max_utterance_secs {
            if cap <= 0.0 {
                return Err(HarkError::InvalidConfig(
                    "max_utterance_secs must be > 0 when set".into(),
                ));
            }
        }
        Ok(())
    }

    /// Number of samples in one chunk at the configured rate.
    pub fn samples_per_chunk(&self) -> usize {
        ((self.sample_rate as f64 * self.chunk_duration_secs).round() as usize).max(1)
    }
}

/// Where one detection session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// No chunk has crossed the threshold yet; silent chunks are discarded.
    Awaiting,
    /// Speech has begun; every chunk is buffered.
    Voiced,
    /// The stopping rule fired; no further chunks are accepted.
    Done,
}

/// The endpoint detector state machine.
///
/// Scoped to one utterance: create, `feed` chunks until `Done`, `finish`.
pub struct EndpointDetector {
    vad: Box<dyn VoiceActivityDetector>,
    silence_timeout_secs: f64,
    max_utterance_secs: Option<f64>,
    sample_rate: u32,
    state: DetectorState,
    chunks: Vec<AudioChunk>,
    /// Accumulated duration of consecutive silent chunks since the last
    /// voiced chunk.
    silence_elapsed: f64,
    /// Total duration of all chunks observed, buffered or not.
    observed_secs: f64,
}

impl EndpointDetector {
    /// Build a detector with the default amplitude VAD.
    ///
    /// # Errors
    /// Returns `HarkError::InvalidConfig` when the config fails validation.
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let vad = Box::new(AmplitudeVad::new(config.amplitude_threshold));
        Self::with_vad(config, vad)
    }

    /// Build a detector with a caller-supplied VAD implementation.
    pub fn with_vad(
        config: &EndpointConfig,
        vad: Box<dyn VoiceActivityDetector>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vad,
            silence_timeout_secs: config.silence_timeout_secs,
            max_utterance_secs: config.max_utterance_secs,
            sample_rate: config.sample_rate,
            state: DetectorState::Awaiting,
            chunks: Vec::new(),
            silence_elapsed: 0.0,
            observed_secs: 0.0,
        })
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Observe one chunk and advance the state machine.
    ///
    /// Silence is measured chunk-quantized: the accumulated duration of
    /// consecutive silent chunks since the last voiced one. `elapsed >=
    /// timeout` reproduces the wall-clock rule, which fires during the
    /// chunk whose capture crosses the boundary.
    ///
    /// Chunks fed after `Done` are ignored.
    pub fn feed(&mut self, chunk: AudioChunk) -> DetectorState {
        if self.state == DetectorState::Done {
            return self.state;
        }

        let duration = chunk.duration_secs();
        self.observed_secs += duration;
        let voiced = self.vad.classify(&chunk).is_voiced();

        match self.state {
            DetectorState::Awaiting => {
                if voiced {
                    debug!(volume = chunk.mean_amplitude(), "speech started");
                    self.chunks.push(chunk);
                    self.state = DetectorState::Voiced;
                    self.silence_elapsed = 0.0;
                }
                // Pre-voice silence is discarded.
            }
            DetectorState::Voiced => {
                self.chunks.push(chunk);
                if voiced {
                    self.silence_elapsed = 0.0;
                } else {
                    self.silence_elapsed += duration;
                    if self.silence_elapsed >= self.silence_timeout_secs {
                        self.state = DetectorState::Done;
                    }
                }
            }
            DetectorState::Done => unreachable!("checked above"),
        }

        if self.state != DetectorState::Done {
            if let Some(cap) = self.max_utterance_secs {
                if self.observed_secs >= cap {
                    debug!(observed_secs = self.observed_secs, "capture deadline reached");
                    self.state = DetectorState::Done;
                }
            }
        }

        self.state
    }

    /// Concatenate everything buffered so far into one utterance.
    ///
    /// Empty when the detector never left `Awaiting` (possible only with a
    /// capture deadline).
    pub fn finish(mut self) -> Utterance {
        self.vad.reset();
        Utterance::from_chunks(self.sample_rate, self.chunks)
    }
}

/// Run one full detection session against a chunk source.
///
/// Blocks until the stopping rule fires, pulling one chunk per iteration.
/// The source is the exclusively-owned capture resource for the duration of
/// this call; processing per chunk is negligible next to capture latency,
/// so there is no overlap between the two.
///
/// # Errors
/// - `HarkError::InvalidConfig` before any capture starts.
/// - Any capture failure from the source, propagated unchanged; no retry.
pub fn capture_utterance<S: ChunkSource + ?Sized>(
    source: &mut S,
    config: &EndpointConfig,
) -> Result<Utterance> {
    let mut detector = EndpointDetector::new(config)?;

    loop {
        let chunk = source.next_chunk()?;
        if detector.feed(chunk) == DetectorState::Done {
            break;
        }
    }

    let utterance = detector.finish();
    info!(
        duration_secs = format_args!("{:.2}", utterance.duration_secs()),
        samples = utterance.samples.len(),
        "utterance captured"
    );
    Ok(utterance)
}
