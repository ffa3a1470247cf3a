use hark_core::transcribe::stub::StubTranscriber;
use hark_core::{
    capture_utterance, AudioChunk, ChunkSource, EndpointConfig, HarkError, Transcriber,
    TranscriberHandle,
};

const RATE: u32 = 16_000;
const CHUNK_SAMPLES: usize = 1_600; // 0.1 s

/// Replays a fixed script of chunk volumes, then fails like a dead device.
struct ScriptedSource {
    volumes: Vec<i16>,
    idx: usize,
}

impl ScriptedSource {
    fn new(volumes: &[i16]) -> Self {
        Self {
            volumes: volumes.to_vec(),
            idx: 0,
        }
    }
}

impl ChunkSource for ScriptedSource {
    fn next_chunk(&mut self) -> hark_core::error::Result<AudioChunk> {
        let Some(&volume) = self.volumes.get(self.idx) else {
            return Err(HarkError::CaptureStopped);
        };
        self.idx += 1;
        Ok(AudioChunk::new(vec![volume; CHUNK_SAMPLES], RATE))
    }
}

fn config() -> EndpointConfig {
    EndpointConfig {
        sample_rate: RATE,
        chunk_duration_secs: 0.1,
        amplitude_threshold: 500.0,
        silence_timeout_secs: 0.5,
        max_utterance_secs: None,
    }
}

#[test]
fn captures_scripted_utterance_end_to_end() {
    let volumes = [50, 50, 600, 50, 50, 50, 50, 50, 50, 50, 50];
    let mut source = ScriptedSource::new(&volumes);

    let utterance = capture_utterance(&mut source, &config()).expect("capture should succeed");

    // Capture starts at the 600 chunk and stops after 0.5 s of silence:
    // six chunks total, and the script is not fully drained.
    assert_eq!(utterance.samples.len(), 6 * CHUNK_SAMPLES);
    assert_eq!(source.idx, 8);
}

#[test]
fn capture_failure_propagates_unchanged() {
    // Source dies while the detector is still waiting for speech.
    let mut source = ScriptedSource::new(&[50, 50, 50]);
    let err = capture_utterance(&mut source, &config()).unwrap_err();
    assert!(matches!(err, HarkError::CaptureStopped));
}

#[test]
fn capture_failure_mid_utterance_discards_audio() {
    // Device dies after speech started but before the timeout fires.
    let mut source = ScriptedSource::new(&[600, 600, 50]);
    let err = capture_utterance(&mut source, &config()).unwrap_err();
    assert!(matches!(err, HarkError::CaptureStopped));
}

#[test]
fn invalid_config_is_rejected_before_capture() {
    let mut source = ScriptedSource::new(&[600]);
    let mut cfg = config();
    cfg.chunk_duration_secs = 0.0;
    let err = capture_utterance(&mut source, &cfg).unwrap_err();
    assert!(matches!(err, HarkError::InvalidConfig(_)));
    assert_eq!(source.idx, 0, "no chunk should have been pulled");
}

#[test]
fn deadline_bounds_all_silent_capture() {
    let mut cfg = config();
    cfg.max_utterance_secs = Some(0.95);
    let mut source = ScriptedSource::new(&[50; 100]);
    let utterance = capture_utterance(&mut source, &cfg).expect("deadline should end capture");
    assert!(utterance.is_empty());
    assert_eq!(source.idx, 10);
}

#[test]
fn captured_utterance_flows_into_transcription() {
    let volumes = [600, 700, 50, 50, 50, 50, 50];
    let mut source = ScriptedSource::new(&volumes);
    let utterance = capture_utterance(&mut source, &config()).unwrap();

    let handle = TranscriberHandle::new(StubTranscriber::new());
    let transcription = handle.0.lock().transcribe(&utterance, 5).unwrap();

    assert_eq!(transcription.segments.len(), 1);
    // Two voiced chunks + five silent timeout chunks = 0.7 s.
    assert!((transcription.segments[0].end_secs - 0.7).abs() < 1e-3);
    assert!(transcription.text().starts_with("[stub:"));
}
