//! # Frame Analysis Module
//!
//! Runs one captured frame through the full pipeline: voicing gate, period
//! estimation, the caller-side frequency range gate and note quantization.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{DEFAULT_MAX_FREQUENCY, DEFAULT_MIN_FREQUENCY, DetectorConfig};
use crate::error::ConfigResult;
use crate::gate;
use crate::pitch::PitchEstimator;
use crate::tuning::NoteMapper;
use crate::{Detection, FrameReport};

/// Inclusive band of fundamentals worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl Default for FrequencyRange {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FREQUENCY, DEFAULT_MAX_FREQUENCY)
    }
}

impl FrequencyRange {
    pub fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn contains(&self, frequency_hz: f32) -> bool {
        (self.min_hz..=self.max_hz).contains(&frequency_hz)
    }

    /// Passes `estimate` through only when it lies inside the range.
    pub fn accept(&self, estimate: Option<f32>) -> Option<f32> {
        estimate.filter(|&f| self.contains(f))
    }
}

/// Per-session analysis pipeline.
///
/// Owns the estimator's scratch memory; holds no other state between
/// frames.
#[derive(Debug)]
pub struct Analyzer {
    estimator: PitchEstimator,
    mapper: NoteMapper,
    range: FrequencyRange,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_valid_config(&DetectorConfig::default())
    }
}

impl Analyzer {
    /// Builds the pipeline after checking `config` for sizes, thresholds and
    /// a frequency range that could never produce a detection.
    pub fn new(config: &DetectorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: &DetectorConfig) -> Self {
        Self {
            estimator: PitchEstimator::from_config(config),
            mapper: NoteMapper::new(config.reference_pitch),
            range: FrequencyRange::new(config.min_frequency, config.max_frequency),
        }
    }

    pub fn mapper(&self) -> &NoteMapper {
        &self.mapper
    }

    pub fn range(&self) -> &FrequencyRange {
        &self.range
    }

    /// Detects the pitch of one frame.
    pub fn detect(&mut self, frame: &[f32], sample_rate: u32) -> Detection {
        let estimate = self.estimator.estimate(frame, sample_rate);
        match self.range.accept(estimate) {
            Some(frequency_hz) => Detection::Voiced {
                frequency_hz,
                note: self.mapper.map_to_note(frequency_hz),
            },
            None => {
                if let Some(frequency_hz) = estimate {
                    trace!(frequency_hz, "estimate outside accepted range");
                }
                Detection::NoVoice
            }
        }
    }

    /// Detects the pitch of one frame and measures its level.
    pub fn process(&mut self, frame: &[f32], sample_rate: u32) -> FrameReport {
        FrameReport {
            detection: self.detect(frame, sample_rate),
            volume: gate::volume_level(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::pitch::PeakFallback;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32) -> Vec<f32> {
        (0..2048)
            .map(|i| 0.4 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn range_boundaries_are_inclusive() {
        let range = FrequencyRange::default();
        assert!(range.contains(50.0));
        assert!(range.contains(2000.0));
        assert!(!range.contains(49.99));
        assert!(!range.contains(2000.01));
        assert!(!range.contains(f32::NAN));
        assert_eq!(range.accept(Some(2000.01)), None);
        assert_eq!(range.accept(Some(440.0)), Some(440.0));
        assert_eq!(range.accept(None), None);
    }

    #[test]
    fn voiced_frame_reports_note() {
        let mut analyzer = Analyzer::default();
        let report = analyzer.process(&sine(440.0, 44100), 44100);
        match report.detection {
            Detection::Voiced { frequency_hz, note } => {
                assert!((frequency_hz - 440.0).abs() < 4.4);
                assert_eq!(note.midi_note, 69);
                assert_eq!(note.label(), "A4");
            }
            Detection::NoVoice => panic!("expected a pitch"),
        }
        assert!(report.volume > 0.0 && report.volume <= 1.0);
    }

    #[test]
    fn silence_reports_no_voice() {
        let mut analyzer = Analyzer::default();
        let report = analyzer.process(&[0.0; 2048], 44100);
        assert_eq!(report.detection, Detection::NoVoice);
        assert_eq!(report.volume, 0.0);
    }

    #[test]
    fn out_of_range_estimate_is_no_voice() {
        let config = DetectorConfig {
            max_frequency: 300.0,
            ..DetectorConfig::default()
        };
        let mut analyzer = Analyzer::new(&config).unwrap();
        assert_eq!(analyzer.detect(&sine(440.0, 44100), 44100), Detection::NoVoice);
    }

    #[test]
    fn rejects_config_that_can_never_detect() {
        let inverted = DetectorConfig {
            min_frequency: 2000.0,
            max_frequency: 50.0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            Analyzer::new(&inverted),
            Err(ConfigError::InvalidRange { .. })
        ));

        let no_frames = DetectorConfig {
            frame_size: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            Analyzer::new(&no_frames),
            Err(ConfigError::ZeroSize("frame_size"))
        ));
    }

    #[test]
    fn accessors_reflect_config() {
        let config = DetectorConfig {
            reference_pitch: 442.0,
            min_frequency: 80.0,
            max_frequency: 1000.0,
            ..DetectorConfig::default()
        };
        let analyzer = Analyzer::new(&config).unwrap();
        assert_eq!(analyzer.range(), &FrequencyRange::new(80.0, 1000.0));
        assert_eq!(analyzer.mapper().reference_hz(), 442.0);
    }

    #[test]
    fn last_lag_fallback_is_caught_by_range_gate() {
        // A full-length DC frame falls back to a ~21.5 Hz period.
        let config = DetectorConfig {
            peak_fallback: PeakFallback::LastLag,
            ..DetectorConfig::default()
        };
        let mut analyzer = Analyzer::new(&config).unwrap();
        assert_eq!(analyzer.detect(&[0.5; 2048], 44100), Detection::NoVoice);
    }
}
