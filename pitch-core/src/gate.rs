//! # Signal Gate Module
//!
//! RMS-based voicing gate. Autocorrelation on near-silent input produces
//! unstable period maxima, so every frame passes through here before the
//! estimator looks at it.

/// Default RMS level below which a frame is treated as silence.
pub const DEFAULT_SILENCE_THRESHOLD: f32 = 0.01;

/// Gain applied to the RMS value when deriving the level-meter reading.
const VOLUME_GAIN: f32 = 5.0;

/// Computes the root-mean-square energy of a frame.
///
/// An empty frame has an RMS of zero.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Maps a frame's RMS onto a 0.0..=1.0 level-meter reading.
pub fn volume_level(frame: &[f32]) -> f32 {
    (rms(frame) * VOLUME_GAIN).min(1.0)
}

/// Silence detector with a fixed RMS threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalGate {
    threshold: f32,
}

impl Default for SignalGate {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_THRESHOLD)
    }
}

impl SignalGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Returns `false` when the frame's RMS is below the threshold.
    pub fn is_voiced(&self, frame: &[f32]) -> bool {
        rms(frame) >= self.threshold
    }
}
