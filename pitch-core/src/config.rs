//! # Detector Configuration
//!
//! All tuning constants of the pipeline live in [`DetectorConfig`]. The
//! defaults reproduce the fixed design parameters; a config file only needs
//! to name the fields it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::gate::DEFAULT_SILENCE_THRESHOLD;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::pitch::{ClipScaling, CorrelationMethod, DEFAULT_CLIP_THRESHOLD, PeakFallback};
use crate::tuning::REFERENCE_A4_HZ;

/// Default number of samples per analysis frame.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Lowest fundamental accepted by the range gate, in Hz.
pub const DEFAULT_MIN_FREQUENCY: f32 = 50.0;

/// Highest fundamental accepted by the range gate, in Hz.
pub const DEFAULT_MAX_FREQUENCY: f32 = 2000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Samples per frame handed to the analyzer.
    pub frame_size: usize,
    /// RMS level below which a frame counts as silence.
    pub silence_threshold: f32,
    /// Amplitude below which a sample counts as near a zero crossing when
    /// trimming the frame edges.
    pub clip_threshold: f32,
    pub clip_scaling: ClipScaling,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Frequency of A4 in Hz.
    pub reference_pitch: f32,
    /// Number of entries kept by the consumer's pitch history.
    pub history_capacity: usize,
    pub correlation: CorrelationMethod,
    pub peak_fallback: PeakFallback,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            clip_threshold: DEFAULT_CLIP_THRESHOLD,
            clip_scaling: ClipScaling::default(),
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            reference_pitch: REFERENCE_A4_HZ,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            correlation: CorrelationMethod::default(),
            peak_fallback: PeakFallback::default(),
        }
    }
}

impl DetectorConfig {
    /// Checks that every value is usable by the pipeline.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.frame_size == 0 {
            return Err(ConfigError::ZeroSize("frame_size"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroSize("history_capacity"));
        }
        for (name, value) in [
            ("silence_threshold", self.silence_threshold),
            ("clip_threshold", self.clip_threshold),
            ("reference_pitch", self.reference_pitch),
            ("min_frequency", self.min_frequency),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !self.max_frequency.is_finite() || self.max_frequency < self.min_frequency {
            return Err(ConfigError::InvalidRange {
                min: self.min_frequency,
                max: self.max_frequency,
            });
        }
        Ok(())
    }

    /// Parses and validates a config from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: DetectorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let config = Self::from_json(&data)?;
        debug!(path = %path.display(), "loaded detector config");
        Ok(config)
    }

    /// Saves the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_size, 2048);
        assert_eq!(config.silence_threshold, 0.01);
        assert_eq!(config.clip_threshold, 0.2);
        assert_eq!(config.min_frequency, 50.0);
        assert_eq!(config.max_frequency, 2000.0);
        assert_eq!(config.reference_pitch, 440.0);
        assert_eq!(config.history_capacity, 200);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DetectorConfig::from_json(r#"{ "reference_pitch": 442.0 }"#).unwrap();
        assert_eq!(config.reference_pitch, 442.0);
        assert_eq!(config.frame_size, DEFAULT_FRAME_SIZE);
        assert_eq!(config.peak_fallback, PeakFallback::Reject);
        assert_eq!(config.clip_scaling, ClipScaling::Peak);
    }

    #[test]
    fn enum_fields_use_snake_case() {
        let config = DetectorConfig::from_json(
            r#"{ "correlation": "fft", "peak_fallback": "last_lag", "clip_scaling": "absolute" }"#,
        )
        .unwrap();
        assert_eq!(config.correlation, CorrelationMethod::Fft);
        assert_eq!(config.peak_fallback, PeakFallback::LastLag);
        assert_eq!(config.clip_scaling, ClipScaling::Absolute);
    }

    #[test]
    fn rejects_inverted_range() {
        let config = DetectorConfig {
            min_frequency: 500.0,
            max_frequency: 100.0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_values() {
        let config = DetectorConfig {
            silence_threshold: 0.0,
            ..DetectorConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "silence_threshold", .. })
        ));

        let config = DetectorConfig {
            reference_pitch: f32::NAN,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_sizes() {
        let err = DetectorConfig::from_json(r#"{ "frame_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSize("frame_size")));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = DetectorConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detector.json");
        let config = DetectorConfig {
            clip_threshold: 0.3,
            correlation: CorrelationMethod::Fft,
            ..DetectorConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(DetectorConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DetectorConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
