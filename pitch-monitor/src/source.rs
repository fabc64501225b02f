//! # Frame Sources
//!
//! Where analysis frames come from: the live microphone through
//! [`CaptureSession`], or a WAV file replayed through the same framing.

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader};
use pitch_core::audio::FrameAssembler;
use std::path::{Path, PathBuf};
use tracing::info;

/// Input selected on the command line.
#[derive(Debug, Clone)]
pub enum Source {
    Microphone,
    Wav(PathBuf),
}

impl Source {
    pub fn from_arg(wav: Option<PathBuf>) -> Self {
        wav.map_or(Source::Microphone, Source::Wav)
    }
}

/// A decoded WAV file split into mono analysis frames.
#[derive(Debug)]
pub struct WavFrames {
    pub sample_rate: u32,
    pub frames: Vec<Vec<f32>>,
}

/// Decodes `path` and splits it into mono frames of `frame_size` samples.
/// A trailing partial frame is discarded.
pub fn read_wav_frames(path: &Path, frame_size: usize) -> Result<WavFrames> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    info!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "replaying WAV file"
    );

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("decoding float samples")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .context("decoding integer samples")?
        }
    };

    let mut assembler = FrameAssembler::new(frame_size, spec.channels);
    let mut frames = Vec::with_capacity(samples.len() / frame_size.max(1) + 1);
    assembler.push(&samples, |frame| frames.push(frame));

    Ok(WavFrames {
        sample_rate: spec.sample_rate,
        frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_tone(path: &Path, channels: u16, len: usize) {
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..len {
            let value = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin();
            for _ in 0..channels {
                writer.write_sample((value * 16384.0) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn mono_file_is_framed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 1, 5000);

        let wav = read_wav_frames(&path, 2048).unwrap();
        assert_eq!(wav.sample_rate, 44100);
        assert_eq!(wav.frames.len(), 2);
        assert!(wav.frames.iter().all(|f| f.len() == 2048));
        let peak = wav.frames[0].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn stereo_file_is_mixed_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_tone(&path, 2, 4096);

        let wav = read_wav_frames(&path, 1024).unwrap();
        assert_eq!(wav.frames.len(), 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_wav_frames(&dir.path().join("absent.wav"), 2048).is_err());
    }

    #[test]
    fn source_defaults_to_microphone() {
        assert!(matches!(Source::from_arg(None), Source::Microphone));
        assert!(matches!(
            Source::from_arg(Some(PathBuf::from("a.wav"))),
            Source::Wav(_)
        ));
    }
}
