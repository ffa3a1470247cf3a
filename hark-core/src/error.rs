use thiserror::Error;

/// All errors produced by hark-core.
#[derive(Debug, Error)]
pub enum HarkError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("audio capture ended before an utterance completed")]
    CaptureStopped,

    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("audio file not found: {path}")]
    AudioFileNotFound { path: std::path::PathBuf },

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HarkError>;
