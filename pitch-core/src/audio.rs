//! # Audio Capture Module
//!
//! Real-time audio capture using CPAL (Cross-Platform Audio Library).
//! Device callbacks deliver arbitrarily sized interleaved chunks; the
//! [`FrameAssembler`] turns them into fixed-size mono frames, which are
//! handed to the analysis side over a crossbeam channel.
//!
//! ## Features
//! - Default input device selection
//! - Mono or multi-channel f32 input, down-mixed to mono
//! - Capture session owned by the caller; dropping it stops the stream

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};
use tracing::{info, trace, warn};

/// Preferred capture sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// Accumulates interleaved samples and emits fixed-size mono frames.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    /// Mono samples not yet emitted.
    buffer: Vec<f32>,
    /// Interleaved samples of an incomplete multi-channel frame.
    partial: Vec<f32>,
}

impl FrameAssembler {
    /// Zero values for either argument are raised to one.
    pub fn new(frame_size: usize, channels: u16) -> Self {
        let frame_size = frame_size.max(1);
        let channels = usize::from(channels.max(1));
        Self {
            frame_size,
            channels,
            buffer: Vec::with_capacity(frame_size * 2),
            partial: Vec::with_capacity(channels),
        }
    }

    /// Mono samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Appends an interleaved chunk, calling `emit` once per completed frame.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        if self.channels == 1 {
            self.buffer.extend_from_slice(data);
        } else {
            let mut data = data;
            if !self.partial.is_empty() {
                let needed = (self.channels - self.partial.len()).min(data.len());
                self.partial.extend_from_slice(&data[..needed]);
                data = &data[needed..];
                if self.partial.len() == self.channels {
                    self.buffer.push(mix_down(&self.partial));
                    self.partial.clear();
                }
            }
            let chunks = data.chunks_exact(self.channels);
            self.partial.extend_from_slice(chunks.remainder());
            self.buffer.extend(chunks.map(mix_down));
        }

        // While we have enough data for a full frame, emit it.
        while self.buffer.len() >= self.frame_size {
            let frame = self.buffer[..self.frame_size].to_vec();
            self.buffer.drain(..self.frame_size);
            emit(frame);
        }
    }

    /// Drops any buffered samples.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.partial.clear();
    }
}

fn mix_down(channels: &[f32]) -> f32 {
    channels.iter().sum::<f32>() / channels.len() as f32
}

/// A running microphone capture.
///
/// Owns the CPAL stream. Frames flow to the sender given to
/// [`CaptureSession::start`] until the session is stopped or dropped.
pub struct CaptureSession {
    stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    device_name: String,
}

impl CaptureSession {
    /// Starts capture from the default input device.
    ///
    /// Frames that cannot be queued because the receiver is behind are
    /// dropped rather than buffered.
    pub fn start(frame_size: usize, sender: Sender<Vec<f32>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!(device = %device_name, "using audio input device");

        let configs = device
            .supported_input_configs()
            .context("querying input configurations")?
            .collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
            .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

        let rate = TARGET_SAMPLE_RATE.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        let config: cpal::StreamConfig = config.into();
        info!(sample_rate, channels, frame_size, "selected input format");

        let mut assembler = FrameAssembler::new(frame_size, channels);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    assembler.push(data, |frame| match sender.try_send(frame) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => trace!("analysis behind, frame dropped"),
                        Err(TrySendError::Disconnected(_)) => {}
                    });
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .context("building input stream")?;

        stream.play().context("starting input stream")?;

        Ok(Self {
            stream,
            sample_rate,
            channels,
            device_name,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pauses the stream and releases the device.
    pub fn stop(self) -> Result<()> {
        self.stream.pause().context("pausing input stream")?;
        info!(device = %self.device_name, "capture stopped");
        Ok(())
    }
}

/// Finds the best supported f32 configuration, preferring mono and then the
/// range closest to the target sample rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let covers = (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate);
            (c.channels() != 1, !covers, min_diff.min(max_diff))
        })
}
