//! Audio capture via cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! This module satisfies that contract by writing directly into an SPSC ring
//! buffer producer whose `push_slice` is lock-free and allocation-free.
//! Chunk assembly — rate conversion and the f32 → i16 conversion — happens
//! on the consumer side, where allocation is allowed.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `MicSource` therefore must be created and dropped on the same
//! thread. Hosts accomplish this by opening the source inside
//! `spawn_blocking`, next to the capture loop that consumes it.

pub mod device;
pub mod resample;
pub mod wav;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use crate::{
    buffering::{chunk::AudioChunk, AudioConsumer, Consumer},
    endpoint::EndpointConfig,
    error::{HarkError, Result},
};
use self::resample::RateConverter;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{error, info, warn};

/// Blocking pull interface supplying fixed-duration chunks.
///
/// One `next_chunk` call suspends the caller for roughly one chunk duration
/// — a hardware-bound wait for microphone sources, a scripted delay (or
/// none) for test sources.
pub trait ChunkSource {
    /// Capture and return the next chunk.
    ///
    /// # Errors
    /// Capture failures (device unavailable, stream error, source
    /// exhausted) are returned to the caller; implementations never retry.
    fn next_chunk(&mut self) -> Result<AudioChunk>;
}

/// Sleep between ring-buffer polls while a chunk is still filling.
const POLL_SLEEP_MS: u64 = 5;

/// A microphone-backed [`ChunkSource`].
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
/// Windows/macOS. Create, use and drop this type on the same OS thread.
pub struct MicSource {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
    /// Set by the cpal error callback; surfaces as `AudioStream` on the
    /// next pull.
    failed: Arc<AtomicBool>,
    consumer: AudioConsumer,
    converter: RateConverter,
    /// Resampled i16 samples awaiting chunk assembly.
    pending: Vec<i16>,
    /// Scratch drained from the ring per poll.
    scratch: Vec<f32>,
    samples_per_chunk: usize,
    /// Chunk sample rate (the configured detector rate).
    sample_rate: u32,
}

impl MicSource {
    /// Open the system default microphone.
    ///
    /// # Errors
    /// Returns `HarkError::NoDefaultInputDevice` when no microphone is
    /// available, or `HarkError::AudioStream` if cpal fails to build the
    /// stream.
    pub fn open_default(config: &EndpointConfig) -> Result<Self> {
        Self::open_with_preference(config, None)
    }

    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available device.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        config: &EndpointConfig,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        config.validate()?;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred_name) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });
                    if selected_device.is_none() {
                        warn!(
                            "preferred input device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| HarkError::AudioDevice(e.to_string()))?;
            let fallback = devices.next().ok_or(HarkError::NoDefaultInputDevice)?;
            warn!("no default input device, falling back to first available input");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| HarkError::AudioDevice(e.to_string()))?;

        let device_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(device_rate, channels, "audio config selected");

        let stream_config = StreamConfig {
            channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (mut producer, consumer) = crate::buffering::create_audio_ring();
        let running = Arc::new(AtomicBool::new(true));
        let failed = Arc::new(AtomicBool::new(false));

        let ch = channels as usize;
        let running_cb = Arc::clone(&running);
        let failed_cb = Arc::clone(&failed);

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                let mut mix_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[f32], _info| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        push_frames(&mut producer, data, ch, &mut mix_buf, |s| s);
                    },
                    move |err| {
                        error!("audio stream error: {err}");
                        failed_cb.store(true, Ordering::Relaxed);
                    },
                    None,
                )
            }
            SampleFormat::I16 => {
                let mut mix_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[i16], _info| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        push_frames(&mut producer, data, ch, &mut mix_buf, |s| {
                            s as f32 / 32768.0
                        });
                    },
                    move |err| {
                        error!("audio stream error: {err}");
                        failed_cb.store(true, Ordering::Relaxed);
                    },
                    None,
                )
            }
            SampleFormat::U8 => {
                let mut mix_buf: Vec<f32> = Vec::new();
                device.build_input_stream(
                    &stream_config,
                    move |data: &[u8], _info| {
                        if !running_cb.load(Ordering::Relaxed) {
                            return;
                        }
                        push_frames(&mut producer, data, ch, &mut mix_buf, |s| {
                            (s as f32 - 128.0) / 128.0
                        });
                    },
                    move |err| {
                        error!("audio stream error: {err}");
                        failed_cb.store(true, Ordering::Relaxed);
                    },
                    None,
                )
            }
            fmt => {
                return Err(HarkError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| HarkError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| HarkError::AudioStream(e.to_string()))?;

        let converter = RateConverter::new(device_rate, config.sample_rate)?;

        Ok(Self {
            _stream: stream,
            running,
            failed,
            consumer,
            converter,
            pending: Vec::new(),
            scratch: vec![0f32; resample::CONVERT_CHUNK],
            samples_per_chunk: config.samples_per_chunk(),
            sample_rate: config.sample_rate,
        })
    }

    /// Stub when the `audio-cpal` feature is disabled.
    #[cfg(not(feature = "audio-cpal"))]
    pub fn open_with_preference(
        _config: &EndpointConfig,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(HarkError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Downmix interleaved frames to mono f32 and push them into the ring.
///
/// Runs on the RT callback thread: no allocation beyond the reused
/// `mix_buf`, no locks, no I/O.
#[cfg(feature = "audio-cpal")]
fn push_frames<T: Copy>(
    producer: &mut crate::buffering::AudioProducer,
    data: &[T],
    channels: usize,
    mix_buf: &mut Vec<f32>,
    to_f32: impl Fn(T) -> f32,
) {
    use crate::buffering::Producer;

    let ch = channels.max(1);
    let frames = data.len() / ch;
    mix_buf.resize(frames, 0.0);
    if ch == 1 {
        for (dst, src) in mix_buf.iter_mut().zip(data.iter()) {
            *dst = to_f32(*src);
        }
    } else {
        for (f, dst) in mix_buf.iter_mut().enumerate() {
            let base = f * ch;
            let mut sum = 0f32;
            for c in 0..ch {
                sum += to_f32(data[base + c]);
            }
            *dst = sum / ch as f32;
        }
    }
    let written = producer.push_slice(mix_buf);
    if written < mix_buf.len() {
        warn!(
            "ring buffer full: dropped {} frames",
            mix_buf.len() - written
        );
    }
}

impl ChunkSource for MicSource {
    fn next_chunk(&mut self) -> Result<AudioChunk> {
        loop {
            if self.failed.load(Ordering::Relaxed) {
                return Err(HarkError::AudioStream(
                    "input stream reported an error".into(),
                ));
            }

            let n = self.consumer.pop_slice(&mut self.scratch);
            if n > 0 {
                let converted = self.converter.process(&self.scratch[..n]);
                self.pending.extend_from_slice(&converted);
            }

            if self.pending.len() >= self.samples_per_chunk {
                let samples: Vec<i16> = self.pending.drain(..self.samples_per_chunk).collect();
                return Ok(AudioChunk::new(samples, self.sample_rate));
            }

            std::thread::sleep(Duration::from_millis(POLL_SLEEP_MS));
        }
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.stop();
    }
}
