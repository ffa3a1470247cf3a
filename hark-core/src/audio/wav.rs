//! WAV read/write for utterance handoff and file-based requests.

use std::path::Path;

use crate::{
    buffering::utterance::Utterance,
    error::{HarkError, Result},
};

/// Write an utterance as 16-bit mono PCM.
pub fn write_utterance(path: &Path, utterance: &Utterance) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: utterance.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| HarkError::Wav(e.to_string()))?;
    for &sample in &utterance.samples {
        writer
            .write_sample(sample)
            .map_err(|e| HarkError::Wav(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| HarkError::Wav(e.to_string()))?;
    Ok(())
}

/// Read a WAV file into an utterance, downmixing to mono and quantising to
/// 16-bit as needed.
///
/// # Errors
/// `HarkError::AudioFileNotFound` when the path does not exist;
/// `HarkError::Wav` for unreadable or unsupported content.
pub fn read_utterance(path: &Path) -> Result<Utterance> {
    if !path.exists() {
        return Err(HarkError::AudioFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = hound::WavReader::open(path).map_err(|e| HarkError::Wav(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| {
                s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
                    .map_err(|e| HarkError::Wav(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.map_err(|e| HarkError::Wav(e.to_string())))
                    .collect::<Result<Vec<_>>>()?
            } else {
                let shift = spec.bits_per_sample - 16;
                reader
                    .samples::<i32>()
                    .map(|s| {
                        s.map(|v| (v >> shift) as i16)
                            .map_err(|e| HarkError::Wav(e.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    Ok(Utterance {
        samples,
        sample_rate: spec.sample_rate,
    })
}
