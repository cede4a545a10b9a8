//! Short-time Fourier framing with FIFO-based overlap-add.
//!
//! Samples go in one at a time. Every `hop` samples a frame becomes due; the
//! caller runs [`Stft::analyze`], edits the half spectrum, then calls
//! [`Stft::synthesize`]. Output is delayed by exactly `size` samples.
//!
//! Normalization: the analysis and synthesis windows are both periodic Hann,
//! and the synthesis gain is `hop / (N · Σw²)`, which makes an unmodified
//! spectrum reconstruct the input exactly for any overlap at which Hann²
//! sums to a constant (osamp ≥ 4).

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

pub struct Stft {
    size: usize,
    hop: usize,
    window: Vec<f32>,
    window_sum: f32,
    synthesis_gain: f32,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    in_fifo: Vec<f32>,
    out_fifo: Vec<f32>,
    accumulator: Vec<f32>,
    rover: usize,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("size", &self.size)
            .field("hop", &self.hop)
            .field("rover", &self.rover)
            .finish()
    }
}

impl Stft {
    /// `size` must be a power of two; `overlap` is the oversampling factor.
    pub fn new(size: usize, overlap: usize) -> Self {
        let size = size.max(16).next_power_of_two();
        let hop = size / overlap.clamp(1, size);

        let window: Vec<f32> = (0..size)
            .map(|k| (0.5 - 0.5 * (2.0 * PI * k as f64 / size as f64).cos()) as f32)
            .collect();
        let window_sum: f32 = window.iter().sum();
        let window_sq_sum: f32 = window.iter().map(|w| w * w).sum();

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            size,
            hop,
            window,
            window_sum,
            synthesis_gain: hop as f32 / (size as f32 * window_sq_sum),
            forward,
            inverse,
            spectrum: vec![Complex::default(); size],
            scratch: vec![Complex::default(); scratch_len],
            in_fifo: vec![0.0; size],
            out_fifo: vec![0.0; size],
            accumulator: vec![0.0; 2 * size],
            rover: size - hop,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Σ w[k]. A full-scale bin-centred sine has `|X[k]| = Σw / 2`.
    pub fn window_sum(&self) -> f32 {
        self.window_sum
    }

    pub fn latency(&self) -> usize {
        self.size
    }

    pub fn reset(&mut self) {
        self.in_fifo.fill(0.0);
        self.out_fifo.fill(0.0);
        self.accumulator.fill(0.0);
        self.spectrum.fill(Complex::default());
        self.rover = self.size - self.hop;
    }

    /// Push one sample, return one delayed output sample and whether a
    /// frame is due.
    #[inline]
    pub fn push(&mut self, input: f32) -> (f32, bool) {
        let latency = self.size - self.hop;
        self.in_fifo[self.rover] = input;
        let out = self.out_fifo[self.rover - latency];
        self.rover += 1;
        (out, self.rover >= self.size)
    }

    /// Window and transform the input FIFO. Bins `0..=N/2` are meaningful.
    pub fn analyze(&mut self) -> &mut [Complex<f32>] {
        for ((bin, &x), &w) in self.spectrum.iter_mut().zip(&self.in_fifo).zip(&self.window) {
            *bin = Complex::new(x * w, 0.0);
        }
        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        &mut self.spectrum[..self.size / 2 + 1]
    }

    /// Half spectrum for writing a synthesis frame from scratch.
    pub fn spectrum_mut(&mut self) -> &mut [Complex<f32>] {
        &mut self.spectrum[..self.size / 2 + 1]
    }

    /// Mirror the half spectrum, inverse transform, window, overlap-add and
    /// advance the FIFOs by one hop.
    pub fn synthesize(&mut self) {
        let n = self.size;
        let half = n / 2;
        self.spectrum[0].im = 0.0;
        self.spectrum[half].im = 0.0;
        for k in 1..half {
            self.spectrum[n - k] = self.spectrum[k].conj();
        }
        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let gain = self.synthesis_gain;
        for ((acc, bin), &w) in self
            .accumulator
            .iter_mut()
            .zip(&self.spectrum)
            .zip(&self.window)
        {
            *acc += bin.re * w * gain;
        }

        let hop = self.hop;
        self.out_fifo[..hop].copy_from_slice(&self.accumulator[..hop]);
        self.accumulator.copy_within(hop.., 0);
        let len = self.accumulator.len();
        self.accumulator[len - hop..].fill(0.0);
        self.in_fifo.copy_within(hop.., 0);
        self.rover = n - hop;
    }
}
