//! # Pitch Detection Module
//!
//! Autocorrelation pitch estimation for monophonic signals.
//!
//! The pipeline runs in a fixed order, each stage feeding the next:
//! 1. RMS gate: silent frames never reach the correlator
//! 2. Edge trimming: drop the loud leading/trailing segments up to the first
//!    sample near a zero crossing
//! 3. Autocorrelation of the trimmed buffer
//! 4. Descend-then-climb peak search for the period lag
//! 5. Parabolic interpolation around the peak for sub-sample accuracy
//! 6. `sample_rate / period`

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::trace;

use crate::config::DetectorConfig;
use crate::fft::FftCorrelator;
use crate::gate::SignalGate;

/// Default amplitude below which a sample counts as near a zero crossing.
pub const DEFAULT_CLIP_THRESHOLD: f32 = 0.2;

/// A parabola needs the peak and both of its neighbours.
const MIN_TRIMMED_LEN: usize = 3;

/// How the autocorrelation sums are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Direct O(M²) summation.
    #[default]
    Direct,
    /// Zero-padded FFT, yielding the same linear autocorrelation.
    Fft,
}

/// What to report when the correlation has no peak before the last lag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakFallback {
    /// Treat the frame as having no pitch.
    #[default]
    Reject,
    /// Use the last lag as the period. This yields a low, usually spurious,
    /// frequency that the range gate is expected to catch.
    LastLag,
}

/// How the clip threshold used for edge trimming relates to the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipScaling {
    /// Scale the threshold by the frame's peak magnitude (capped at full
    /// scale), so a quiet tone is trimmed at the same phase as a loud one.
    #[default]
    Peak,
    /// Compare samples against the threshold as given. Frames whose peak is
    /// below it are not trimmed at all, which biases low tones sharp.
    Absolute,
}

/// Integer-lag result of the peak search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakLag {
    pub lag: usize,
    /// False when the maximum sits on the final lag, meaning the correlation
    /// only decayed and never climbed to a secondary peak.
    pub interior: bool,
}

/// Reusable autocorrelation pitch estimator.
///
/// Scratch buffers are kept between calls so steady-state estimation does
/// not allocate. The result depends only on the frame, the sample rate and
/// the configuration.
#[derive(Debug)]
pub struct PitchEstimator {
    gate: SignalGate,
    clip_threshold: f32,
    clip_scaling: ClipScaling,
    method: CorrelationMethod,
    fallback: PeakFallback,
    trimmed: Vec<f64>,
    correlation: Vec<f64>,
    fft: FftCorrelator,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::from_config(&DetectorConfig::default())
    }
}

impl PitchEstimator {
    pub fn from_config(config: &DetectorConfig) -> Self {
        let mut estimator = Self {
            gate: SignalGate::new(config.silence_threshold),
            clip_threshold: config.clip_threshold,
            clip_scaling: config.clip_scaling,
            method: config.correlation,
            fallback: config.peak_fallback,
            trimmed: Vec::new(),
            correlation: Vec::new(),
            fft: FftCorrelator::new(),
        };
        estimator.reserve(config.frame_size);
        estimator
    }

    pub fn with_fallback(mut self, fallback: PeakFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_method(mut self, method: CorrelationMethod) -> Self {
        self.method = method;
        if method == CorrelationMethod::Fft {
            self.fft.reserve(self.trimmed.capacity());
        }
        self
    }

    pub fn with_clip_scaling(mut self, clip_scaling: ClipScaling) -> Self {
        self.clip_scaling = clip_scaling;
        self
    }

    /// Preallocates scratch space for frames of `frame_size` samples.
    pub fn reserve(&mut self, frame_size: usize) {
        self.trimmed.reserve(frame_size);
        self.correlation.reserve(frame_size);
        if self.method == CorrelationMethod::Fft {
            self.fft.reserve(frame_size);
        }
    }

    /// Estimates the fundamental frequency of `frame` in Hz.
    ///
    /// # Returns
    /// * `Some(frequency)` - Period found
    /// * `None` - Silence, a frame too short to interpolate, or no usable peak
    pub fn estimate(&mut self, frame: &[f32], sample_rate: u32) -> Option<f32> {
        if !self.gate.is_voiced(frame) {
            trace!("frame below silence threshold");
            return None;
        }

        let range = trim_edges(frame, self.effective_clip_threshold(frame));
        if range.len() < MIN_TRIMMED_LEN {
            trace!(?range, "trimmed frame too short");
            return None;
        }

        self.trimmed.clear();
        self.trimmed
            .extend(frame[range].iter().map(|&s| f64::from(s)));
        self.correlation.clear();
        self.correlation.resize(self.trimmed.len(), 0.0);

        match self.method {
            CorrelationMethod::Direct => autocorrelate(&self.trimmed, &mut self.correlation),
            CorrelationMethod::Fft => self.fft.autocorrelate(&self.trimmed, &mut self.correlation),
        }

        let peak = find_peak_lag(&self.correlation)?;
        if !peak.interior && self.fallback == PeakFallback::Reject {
            trace!(lag = peak.lag, "no interior correlation peak");
            return None;
        }

        let period = refine_peak(&self.correlation, peak.lag);
        if !(period.is_finite() && period > 0.0) {
            trace!(period, "non-physical period");
            return None;
        }

        let frequency = (f64::from(sample_rate) / period) as f32;
        frequency.is_finite().then_some(frequency)
    }

    fn effective_clip_threshold(&self, frame: &[f32]) -> f32 {
        match self.clip_scaling {
            ClipScaling::Absolute => self.clip_threshold,
            ClipScaling::Peak => {
                let peak = frame.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
                self.clip_threshold * peak.min(1.0)
            }
        }
    }
}

/// Finds the working range of a frame after edge trimming.
///
/// The start is the first index in the first half whose magnitude is below
/// `clip_threshold` (default 0). The end is the first such index scanning
/// back from the last sample through the second half (default `len - 1`).
/// The returned range is empty when the two cross.
pub fn trim_edges(frame: &[f32], clip_threshold: f32) -> Range<usize> {
    let len = frame.len();
    if len == 0 {
        return 0..0;
    }
    let half = len.div_ceil(2);

    let start = frame[..half]
        .iter()
        .position(|s| s.abs() < clip_threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| len - i)
        .find(|&i| frame[i].abs() < clip_threshold)
        .unwrap_or(len - 1);

    start..end.max(start)
}

/// Computes `result[lag] = Σ signal[j] * signal[j + lag]` for every lag
/// below `signal.len()`.
pub fn autocorrelate(signal: &[f64], result: &mut [f64]) {
    let len = signal.len();
    for (lag, r) in result.iter_mut().enumerate().take(len) {
        *r = signal[..len - lag]
            .iter()
            .zip(&signal[lag..])
            .map(|(a, b)| a * b)
            .sum();
    }
}

/// Skips the decay from the zero-lag peak, then returns the first lag holding
/// the maximum of the remaining correlation.
pub fn find_peak_lag(correlation: &[f64]) -> Option<PeakLag> {
    let len = correlation.len();
    let mut start = 0;
    while start + 1 < len && correlation[start] > correlation[start + 1] {
        start += 1;
    }

    let (lag, _) = correlation
        .iter()
        .enumerate()
        .skip(start)
        .fold(None, |best: Option<(usize, f64)>, (i, &value)| match best {
            Some((_, max)) if max >= value => best,
            _ => Some((i, value)),
        })?;

    Some(PeakLag {
        lag,
        interior: lag + 1 < len,
    })
}

/// Refines an integer peak lag with a parabola through the peak and its two
/// neighbours. Lags on either edge are returned unchanged.
pub fn refine_peak(correlation: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag + 1 >= correlation.len() {
        return lag as f64;
    }
    let (x1, x2, x3) = (
        correlation[lag - 1],
        correlation[lag],
        correlation[lag + 1],
    );
    let a = (x1 + x3 - 2.0 * x2) / 2.0;
    let b = (x3 - x1) / 2.0;
    if a != 0.0 {
        lag as f64 - b / (2.0 * a)
    } else {
        lag as f64
    }
}
