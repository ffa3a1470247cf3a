//! Persistent service settings (JSON file).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use hark_core::{EndpointConfig, RemoteTranscriberConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: String,
    pub http_port: u16,
    pub socket_port: u16,
    /// Detector sample rate in Hz.
    pub sample_rate: u32,
    /// Capture chunk duration in seconds.
    pub chunk_duration_secs: f64,
    /// Mean |sample| threshold (i16 domain) for the voiced classification.
    pub amplitude_threshold: f32,
    /// Post-voice silence required to end capture, in seconds.
    pub silence_timeout_secs: f64,
    /// Optional hard deadline on total capture duration, in seconds.
    pub max_utterance_secs: Option<f64>,
    /// Beam-search width forwarded to the transcription model.
    pub beam_size: u32,
    /// Endpoint of the external transcription service.
    pub transcriber_url: String,
    pub transcriber_timeout_secs: u64,
    pub preferred_input_device: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".into(),
            http_port: 8700,
            socket_port: 8701,
            sample_rate: 16_000,
            chunk_duration_secs: 0.1,
            amplitude_threshold: 500.0,
            silence_timeout_secs: 1.0,
            max_utterance_secs: None,
            beam_size: 5,
            transcriber_url: "http://127.0.0.1:5000/api/transcribe".into(),
            transcriber_timeout_secs: 60,
            preferred_input_device: None,
        }
    }
}

impl ServerSettings {
    /// Clamp out-of-range values instead of failing startup over a
    /// hand-edited file.
    pub fn normalize(&mut self) {
        self.sample_rate = self.sample_rate.clamp(8_000, 192_000);
        self.chunk_duration_secs = self.chunk_duration_secs.clamp(0.01, 1.0);
        self.amplitude_threshold = self.amplitude_threshold.clamp(0.0, i16::MAX as f32);
        self.silence_timeout_secs = self.silence_timeout_secs.clamp(0.1, 30.0);
        self.max_utterance_secs = self.max_utterance_secs.map(|cap| cap.clamp(1.0, 600.0));
        self.beam_size = self.beam_size.clamp(1, 20);
        self.transcriber_timeout_secs = self.transcriber_timeout_secs.clamp(5, 600);
        let url = self.transcriber_url.trim();
        self.transcriber_url = if url.is_empty() {
            Self::default().transcriber_url
        } else {
            url.to_string()
        };
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    pub fn detector_config(&self) -> EndpointConfig {
        EndpointConfig {
            sample_rate: self.sample_rate,
            chunk_duration_secs: self.chunk_duration_secs,
            amplitude_threshold: self.amplitude_threshold,
            silence_timeout_secs: self.silence_timeout_secs,
            max_utterance_secs: self.max_utterance_secs,
        }
    }

    pub fn remote_config(&self) -> RemoteTranscriberConfig {
        RemoteTranscriberConfig {
            endpoint_url: self.transcriber_url.clone(),
            timeout: Duration::from_secs(self.transcriber_timeout_secs),
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Hark")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("hark")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> ServerSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<ServerSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &ServerSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let mut settings = ServerSettings {
            sample_rate: 1,
            chunk_duration_secs: 99.0,
            amplitude_threshold: -5.0,
            silence_timeout_secs: 0.0,
            max_utterance_secs: Some(0.1),
            beam_size: 0,
            transcriber_timeout_secs: 0,
            ..ServerSettings::default()
        };
        settings.normalize();

        assert_eq!(settings.sample_rate, 8_000);
        assert_eq!(settings.chunk_duration_secs, 1.0);
        assert_eq!(settings.amplitude_threshold, 0.0);
        assert_eq!(settings.silence_timeout_secs, 0.1);
        assert_eq!(settings.max_utterance_secs, Some(1.0));
        assert_eq!(settings.beam_size, 1);
        assert_eq!(settings.transcriber_timeout_secs, 5);
    }

    #[test]
    fn normalize_discards_blank_device_and_url() {
        let mut settings = ServerSettings {
            preferred_input_device: Some("  ".into()),
            transcriber_url: "".into(),
            ..ServerSettings::default()
        };
        settings.normalize();
        assert!(settings.preferred_input_device.is_none());
        assert_eq!(
            settings.transcriber_url,
            "http://127.0.0.1:5000/api/transcribe"
        );
    }

    #[test]
    fn settings_round_trip_with_camel_case_keys() {
        let settings = ServerSettings::default();
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["listenAddr"], "127.0.0.1");
        assert_eq!(json["silenceTimeoutSecs"], 1.0);
        assert!(json["maxUtteranceSecs"].is_null());

        let round_trip: ServerSettings = serde_json::from_value(json).unwrap();
        assert_eq!(round_trip.socket_port, settings.socket_port);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let parsed: ServerSettings =
            serde_json::from_str(r#"{ "amplitudeThreshold": 750.0 }"#).unwrap();
        assert_eq!(parsed.amplitude_threshold, 750.0);
        assert_eq!(parsed.sample_rate, 16_000);
    }

    #[test]
    fn load_returns_defaults_for_missing_file() {
        let path = std::env::temp_dir().join(format!(
            "hark-settings-missing-{}.json",
            std::process::id()
        ));
        let settings = load_settings(&path);
        assert_eq!(settings.http_port, 8700);
    }

    #[test]
    fn detector_config_mirrors_settings() {
        let mut settings = ServerSettings::default();
        settings.amplitude_threshold = 650.0;
        settings.max_utterance_secs = Some(120.0);
        let config = settings.detector_config();
        assert_eq!(config.amplitude_threshold, 650.0);
        assert_eq!(config.max_utterance_secs, Some(120.0));
        assert!(config.validate().is_ok());
    }
}
