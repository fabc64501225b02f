//! # FFT Correlation Module
//!
//! Evaluates the linear autocorrelation through RustFFT: zero-pad to at
//! least twice the signal length so the circular correlation does not wrap,
//! take the power spectrum, and transform back. The output matches
//! [`crate::pitch::autocorrelate`] up to rounding, in O(M log M).

use rustfft::{FftPlanner, num_complex::Complex};
use std::fmt;

/// Holds the planner and complex scratch buffers between frames.
pub struct FftCorrelator {
    planner: FftPlanner<f64>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl fmt::Debug for FftCorrelator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftCorrelator")
            .field("buffer_len", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl Default for FftCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl FftCorrelator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Grows the scratch buffers for signals of up to `signal_len` samples.
    pub fn reserve(&mut self, signal_len: usize) {
        let padded = padded_len(signal_len);
        self.buffer.reserve(padded.saturating_sub(self.buffer.len()));
    }

    /// Writes the autocorrelation of `signal` to `result`. Only lags below
    /// `signal.len()` are written.
    pub fn autocorrelate(&mut self, signal: &[f64], result: &mut [f64]) {
        if signal.is_empty() {
            return;
        }
        let padded = padded_len(signal.len());
        let forward = self.planner.plan_fft_forward(padded);
        let inverse = self.planner.plan_fft_inverse(padded);

        self.buffer.clear();
        self.buffer
            .extend(signal.iter().map(|&re| Complex { re, im: 0.0 }));
        self.buffer.resize(padded, Complex { re: 0.0, im: 0.0 });

        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex { re: 0.0, im: 0.0 });
        }

        forward.process_with_scratch(&mut self.buffer, &mut self.scratch[..scratch_len]);
        self.buffer
            .iter_mut()
            .for_each(|c| *c = Complex { re: c.norm_sqr(), im: 0.0 });
        inverse.process_with_scratch(&mut self.buffer, &mut self.scratch[..scratch_len]);

        // rustfft leaves both directions unnormalized.
        let normalization = 1.0 / padded as f64;
        result
            .iter_mut()
            .zip(&self.buffer[..signal.len()])
            .for_each(|(r, c)| *r = c.re * normalization);
    }
}

fn padded_len(signal_len: usize) -> usize {
    (2 * signal_len).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::autocorrelate;

    #[test]
    fn matches_direct_autocorrelation() {
        let signal: Vec<f64> = (0..300)
            .map(|i| (i as f64 * 0.13).sin() + 0.3 * (i as f64 * 0.71).cos())
            .collect();

        let mut direct = vec![0.0; signal.len()];
        autocorrelate(&signal, &mut direct);

        let mut via_fft = vec![0.0; signal.len()];
        FftCorrelator::new().autocorrelate(&signal, &mut via_fft);

        for (lag, (d, f)) in direct.iter().zip(&via_fft).enumerate() {
            assert!((d - f).abs() < 1e-9, "lag {lag}: {d} vs {f}");
        }
    }

    #[test]
    fn small_signal_is_exact_after_rounding() {
        let signal = [0.0, 1.0, 2.0, 0.0, -1.0, -2.0];
        let mut result = [0.0; 6];
        FftCorrelator::new().autocorrelate(&signal, &mut result);
        result.iter_mut().for_each(|x| *x = (*x * 100.0).round() / 100.0);
        assert_eq!(result, [10.0, 4.0, -2.0, -5.0, -2.0, 0.0]);
    }

    #[test]
    fn reuses_buffers_across_sizes() {
        let mut correlator = FftCorrelator::new();
        let mut long = vec![0.0; 512];
        correlator.autocorrelate(&vec![0.5; 512], &mut long);
        let mut short = [0.0; 3];
        correlator.autocorrelate(&[1.0, 1.0, 1.0], &mut short);
        assert!((short[0] - 3.0).abs() < 1e-12);
        assert!((short[2] - 1.0).abs() < 1e-12);
    }
}
