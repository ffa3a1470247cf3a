//! `RemoteTranscriber` — hands utterances to an external transcription
//! service over HTTP.
//!
//! The service is a faster-whisper-style process on the local machine: it
//! receives a WAV file path plus a beam-search width and returns timestamped
//! segments. The utterance is written to a temporary WAV, the path is
//! POSTed as JSON, and the file is removed once the response arrives —
//! success or not.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::wav;
use crate::buffering::utterance::Utterance;
use crate::error::{HarkError, Result};
use crate::transcribe::{Transcriber, TranscriptSegment, Transcription};

/// Configuration for the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteTranscriberConfig {
    /// Full URL of the transcription endpoint.
    pub endpoint_url: String,
    /// Per-request timeout. Transcription of a long utterance on CPU can
    /// take tens of seconds.
    pub timeout: Duration,
}

impl Default for RemoteTranscriberConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://127.0.0.1:5000/api/transcribe".into(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscribeRequest<'a> {
    file_path: &'a str,
    beam_size: u32,
}

#[derive(Deserialize)]
struct WireSegment {
    start: f32,
    end: f32,
    text: String,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WireSegment>,
}

/// HTTP client backend for an external transcription service.
pub struct RemoteTranscriber {
    config: RemoteTranscriberConfig,
    client: reqwest::blocking::Client,
}

impl RemoteTranscriber {
    /// Build the backend and its HTTP client.
    ///
    /// # Errors
    /// Returns `HarkError::Transcription` if the client cannot be built.
    pub fn new(config: RemoteTranscriberConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarkError::Transcription(format!("client build failed: {e}")))?;
        Ok(Self { config, client })
    }

    fn temp_wav_path() -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("hark-utterance-{}-{}.wav", std::process::id(), n))
    }
}

impl Transcriber for RemoteTranscriber {
    fn warm_up(&mut self) -> Result<()> {
        // The model lives in another process; there is nothing to load
        // here. Startup reachability problems surface on the first request.
        debug!(endpoint = %self.config.endpoint_url, "remote transcriber configured");
        Ok(())
    }

    fn transcribe(&mut self, utterance: &Utterance, beam_size: u32) -> Result<Transcription> {
        let wav_path = Self::temp_wav_path();
        wav::write_utterance(&wav_path, utterance)?;

        let request = TranscribeRequest {
            file_path: wav_path.to_str().ok_or_else(|| {
                HarkError::Transcription("temp path is not valid UTF-8".into())
            })?,
            beam_size,
        };

        let outcome = self
            .client
            .post(&self.config.endpoint_url)
            .json(&request)
            .send();

        if let Err(e) = std::fs::remove_file(&wav_path) {
            warn!(path = ?wav_path, error = %e, "failed to remove temp wav");
        }

        let response =
            outcome.map_err(|e| HarkError::Transcription(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(HarkError::Transcription(format!(
                "service returned status {}",
                response.status()
            )));
        }

        let payload: TranscribeResponse = response
            .json()
            .map_err(|e| HarkError::Transcription(format!("malformed response: {e}")))?;

        let segments = payload
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text,
            })
            .collect();

        Ok(Transcription {
            segments,
            language: payload.language,
        })
    }
}
