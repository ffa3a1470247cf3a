//! The capture → transcription pipeline behind both transports.

use std::path::Path;

use hark_core::audio::wav;
use hark_core::error::Result;
use hark_core::{
    capture_utterance, EndpointConfig, MicSource, Transcriber, TranscriberHandle, Transcription,
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// One shared speech-to-text service instance.
///
/// `SttService` is `Send + Sync`; transports hold it in an `Arc` and call
/// the blocking methods from `spawn_blocking`.
pub struct SttService {
    detector_config: EndpointConfig,
    transcriber: TranscriberHandle,
    beam_size: u32,
    preferred_device: Option<String>,
    /// The microphone is an exclusively-owned resource — concurrent
    /// transcribe requests serialise here for the capture phase.
    capture_gate: Mutex<()>,
}

impl SttService {
    pub fn new(
        detector_config: EndpointConfig,
        transcriber: TranscriberHandle,
        beam_size: u32,
        preferred_device: Option<String>,
    ) -> Self {
        Self {
            detector_config,
            transcriber,
            beam_size,
            preferred_device,
            capture_gate: Mutex::new(()),
        }
    }

    /// Warm up the transcription backend. Call once at startup.
    pub fn warm_up(&self) -> Result<()> {
        self.transcriber.0.lock().warm_up()
    }

    /// Record one utterance from the microphone and transcribe it.
    ///
    /// Blocking: capture holds the calling thread for the utterance
    /// duration plus the silence timeout, then transcription runs to
    /// completion. Capture and transcription are strictly sequential.
    ///
    /// # Errors
    /// Capture failures and transcription failures are surfaced unchanged;
    /// on transcription failure the captured audio is discarded, the caller
    /// must re-issue the request.
    pub fn transcribe_live(&self) -> Result<Transcription> {
        let utterance = {
            let _mic = self.capture_gate.lock();
            let mut source = MicSource::open_with_preference(
                &self.detector_config,
                self.preferred_device.as_deref(),
            )?;
            capture_utterance(&mut source, &self.detector_config)?
            // Source drops here, releasing the device before inference.
        };

        debug!(
            samples = utterance.samples.len(),
            "capture complete — transcribing"
        );
        let transcription = self
            .transcriber
            .0
            .lock()
            .transcribe(&utterance, self.beam_size)?;
        info!(
            segments = transcription.segments.len(),
            "transcription complete"
        );
        Ok(transcription)
    }

    /// Transcribe an existing WAV file, bypassing capture.
    pub fn transcribe_file(&self, path: &Path) -> Result<Transcription> {
        let utterance = wav::read_utterance(path)?;
        debug!(
            path = ?path,
            samples = utterance.samples.len(),
            "transcribing file"
        );
        self.transcriber
            .0
            .lock()
            .transcribe(&utterance, self.beam_size)
    }
}
