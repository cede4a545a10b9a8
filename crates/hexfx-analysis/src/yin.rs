//! Pitch detection using the YIN algorithm.
//!
//! ## Algorithm
//!
//! YIN (de Cheveigné & Kawahara, 2002):
//!
//! 1. **Difference function** - d(τ) = Σ(x[j] - x[j+τ])²
//! 2. **Cumulative mean normalized difference** - d'(τ) = d(τ) / ((1/τ)·Σ d(j))
//! 3. **Absolute threshold** - first τ where d'(τ) < threshold, walked to its local minimum
//! 4. **Parabolic interpolation** - sub-sample period
//!
//! The difference function is computed through the identity
//! d(τ) = e(0) + e(τ) - 2·r(τ), with the cross-correlation r(τ) taken from
//! an FFT. Every buffer is sized at construction, so [`YinDetector::detect`]
//! is safe to call from the audio thread.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Absolute threshold on the normalized difference.
pub const DEFAULT_YIN_THRESHOLD: f32 = 0.15;

/// Result of pitch detection for a single frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PitchResult {
    /// Detected frequency in Hz (0.0 if unvoiced)
    pub frequency: f32,
    /// Period in samples (0.0 if unvoiced)
    pub period: f32,
    /// 1 - d'(τ*), clamped to [0, 1]
    pub confidence: f32,
}

impl PitchResult {
    pub fn is_voiced(&self) -> bool {
        self.frequency > 0.0 && self.confidence > 0.0
    }
}

/// YIN pitch detector over fixed-size frames.
pub struct YinDetector {
    sample_rate: f64,
    threshold: f64,
    frame_size: usize,
    window: usize,
    min_period: usize,
    max_period: usize,

    fft_size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,

    // Pre-allocated buffers
    head: Vec<Complex<f64>>,
    full: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    energy: Vec<f64>,
    difference: Vec<f64>,
    cumulative_mean: Vec<f64>,
}

impl std::fmt::Debug for YinDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YinDetector")
            .field("sample_rate", &self.sample_rate)
            .field("frame_size", &self.frame_size)
            .field("min_period", &self.min_period)
            .field("max_period", &self.max_period)
            .finish()
    }
}

impl YinDetector {
    /// Detector for 50-2000 Hz.
    pub fn new(sample_rate: f64, frame_size: usize) -> Self {
        Self::with_range(sample_rate, frame_size, 50.0, 2000.0)
    }

    /// The longest detectable period is capped at half the frame.
    pub fn with_range(sample_rate: f64, frame_size: usize, min_freq: f32, max_freq: f32) -> Self {
        let frame_size = frame_size.max(8);
        let max_period = ((sample_rate / min_freq.max(1.0) as f64) as usize).min(frame_size / 2);
        let min_period = ((sample_rate / max_freq.max(1.0) as f64) as usize)
            .max(2)
            .min(max_period.saturating_sub(1));
        let window = frame_size - max_period;

        let fft_size = frame_size.next_power_of_two();
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            sample_rate,
            threshold: DEFAULT_YIN_THRESHOLD as f64,
            frame_size,
            window,
            min_period,
            max_period,
            fft_size,
            forward,
            inverse,
            head: vec![Complex::default(); fft_size],
            full: vec![Complex::default(); fft_size],
            scratch: vec![Complex::default(); scratch_len],
            energy: vec![0.0; frame_size + 1],
            difference: vec![0.0; max_period + 1],
            cumulative_mean: vec![0.0; max_period + 1],
        }
    }

    /// Set YIN threshold (0.01 - 0.5).
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, 0.5) as f64;
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Detect pitch on the newest `frame_size` samples of `samples`.
    pub fn detect(&mut self, samples: &[f32]) -> PitchResult {
        if samples.len() < self.frame_size || self.max_period <= self.min_period {
            return PitchResult::default();
        }
        let frame = &samples[samples.len() - self.frame_size..];

        self.compute_difference(frame);
        if self.energy[self.frame_size] <= 1.0e-12 {
            return PitchResult::default();
        }
        self.compute_cumulative_mean();

        let Some((period, aperiodicity)) = self.find_best_period() else {
            return PitchResult::default();
        };
        let refined = self.parabolic_interpolation(period);

        PitchResult {
            frequency: (self.sample_rate / refined) as f32,
            period: refined as f32,
            confidence: (1.0 - aperiodicity).clamp(0.0, 1.0) as f32,
        }
    }

    fn compute_difference(&mut self, frame: &[f32]) {
        let w = self.window;

        for (i, slot) in self.full.iter_mut().enumerate() {
            let x = frame.get(i).copied().unwrap_or(0.0) as f64;
            *slot = Complex::new(x, 0.0);
        }
        for (i, slot) in self.head.iter_mut().enumerate() {
            *slot = if i < w { self.full[i] } else { Complex::default() };
        }

        self.energy[0] = 0.0;
        for (i, &x) in frame.iter().enumerate() {
            let x = x as f64;
            self.energy[i + 1] = self.energy[i] + x * x;
        }

        // r(τ) = Σ_{j<W} x[j]·x[j+τ] = IFFT(conj(FFT(head))·FFT(full))[τ]
        self.forward.process_with_scratch(&mut self.head, &mut self.scratch);
        self.forward.process_with_scratch(&mut self.full, &mut self.scratch);
        for (h, f) in self.head.iter_mut().zip(self.full.iter()) {
            *h = h.conj() * f;
        }
        self.inverse.process_with_scratch(&mut self.head, &mut self.scratch);

        let norm = 1.0 / self.fft_size as f64;
        let e0 = self.energy[w];
        self.difference[0] = 0.0;
        for tau in 1..=self.max_period {
            let e_tau = self.energy[tau + w] - self.energy[tau];
            let r = self.head[tau].re * norm;
            self.difference[tau] = (e0 + e_tau - 2.0 * r).max(0.0);
        }
    }

    fn compute_cumulative_mean(&mut self) {
        self.cumulative_mean[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..=self.max_period {
            running_sum += self.difference[tau];
            self.cumulative_mean[tau] = if running_sum > 1e-12 {
                self.difference[tau] * tau as f64 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First local minimum under the threshold. Falls back to the global
    /// minimum when it is still reasonably periodic.
    fn find_best_period(&self) -> Option<(usize, f64)> {
        let cmnd = &self.cumulative_mean;
        let mut tau = self.min_period;
        while tau < self.max_period {
            if cmnd[tau] < self.threshold {
                while tau + 1 < self.max_period && cmnd[tau + 1] < cmnd[tau] {
                    tau += 1;
                }
                return Some((tau, cmnd[tau]));
            }
            tau += 1;
        }

        let (best_tau, best_val) = (self.min_period..=self.max_period)
            .map(|t| (t, cmnd[t]))
            .fold((self.min_period, f64::MAX), |best, cur| {
                if cur.1 < best.1 {
                    cur
                } else {
                    best
                }
            });

        (best_val < 0.5).then_some((best_tau, best_val))
    }

    fn parabolic_interpolation(&self, tau: usize) -> f64 {
        if tau < 1 || tau >= self.max_period {
            return tau as f64;
        }
        let s0 = self.cumulative_mean[tau - 1];
        let s1 = self.cumulative_mean[tau];
        let s2 = self.cumulative_mean[tau + 1];
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        if denominator.abs() > 1e-12 {
            let adjustment = ((s2 - s0) / denominator).clamp(-1.0, 1.0);
            tau as f64 + adjustment
        } else {
            tau as f64
        }
    }
}
