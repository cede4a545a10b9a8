//! FIR Hilbert transformer for single-sideband frequency shifting.

use std::f64::consts::PI;

/// Tap count of the default transformer.
pub const HILBERT_TAPS: usize = 65;

/// Blackman-windowed FIR Hilbert transformer.
///
/// [`process`](Self::process) returns the analytic pair `(re, im)` where
/// `re` is the input delayed by [`latency`](Self::latency) samples and `im`
/// is its 90° companion at the same delay.
#[derive(Debug, Clone)]
pub struct HilbertTransform {
    center: usize,
    /// Odd-offset coefficients `h[center ± (2j+1)]`, positive side.
    coeffs: Vec<f32>,
    ring: Vec<f32>,
    mask: usize,
    pos: usize,
}

impl Default for HilbertTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl HilbertTransform {
    pub fn new() -> Self {
        Self::with_taps(HILBERT_TAPS)
    }

    /// `taps` is rounded up to the next `4k + 1` so the center offset stays even.
    /// More taps extend the usable band downward at the cost of latency.
    pub fn with_taps(taps: usize) -> Self {
        let center = (taps.max(5) - 1).div_ceil(4) * 2;
        let length = 2 * center + 1;
        let coeffs = (0..center.div_ceil(2))
            .map(|j| {
                let n = (2 * j + 1) as f64;
                let index = center as f64 + n;
                let window = 0.42 - 0.5 * (2.0 * PI * index / (length - 1) as f64).cos()
                    + 0.08 * (4.0 * PI * index / (length - 1) as f64).cos();
                (2.0 / (PI * n) * window) as f32
            })
            .collect();
        let ring_len = (length + 1).next_power_of_two();
        Self {
            center,
            coeffs,
            ring: vec![0.0; ring_len],
            mask: ring_len - 1,
            pos: 0,
        }
    }

    pub fn latency(&self) -> usize {
        self.center
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.pos = 0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> (f32, f32) {
        let mask = self.mask;
        self.ring[self.pos] = x;
        let center = self.pos.wrapping_sub(self.center) & mask;

        let mut im = 0.0;
        for (j, &h) in self.coeffs.iter().enumerate() {
            let offset = 2 * j + 1;
            let newer = self.ring[(center + offset) & mask];
            let older = self.ring[center.wrapping_sub(offset) & mask];
            im += h * (older - newer);
        }

        let re = self.ring[center];
        self.pos = (self.pos + 1) & mask;
        (re, im)
    }
}

/// Quadrature oscillator plus Hilbert pair: shifts every component by `hz`.
#[derive(Debug, Clone, Default)]
pub struct FrequencyShifter {
    hilbert: HilbertTransform,
    phase: f64,
}

impl FrequencyShifter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taps(taps: usize) -> Self {
        Self {
            hilbert: HilbertTransform::with_taps(taps),
            phase: 0.0,
        }
    }

    pub fn latency(&self) -> usize {
        self.hilbert.latency()
    }

    pub fn reset(&mut self) {
        self.hilbert.reset();
        self.phase = 0.0;
    }

    /// Shift by `shift_hz` (may be negative).
    #[inline]
    pub fn process(&mut self, x: f32, shift_hz: f32, sample_rate: f64) -> f32 {
        let (re, im) = self.hilbert.process(x);
        let (s, c) = (2.0 * PI * self.phase).sin_cos();
        self.phase += shift_hz as f64 / sample_rate;
        self.phase -= self.phase.floor();
        re * c as f32 - im * s as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrature_at_midband() {
        let mut h = HilbertTransform::new();
        let sr = 48000.0f32;
        let freq = 6000.0f32;
        let mut max_err = 0.0f32;
        for n in 0..4800 {
            let x = (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
            let (re, im) = h.process(x);
            if n > 200 {
                // Analytic pair of sin is (sin, -cos).
                let t = (n - h.latency()) as f32;
                let expected = -(2.0 * std::f32::consts::PI * freq * t / sr).cos();
                max_err = max_err.max((im - expected).abs());
                let expected_re = (2.0 * std::f32::consts::PI * freq * t / sr).sin();
                assert!((re - expected_re).abs() < 1e-4);
            }
        }
        assert!(max_err < 0.02, "quadrature error {}", max_err);
    }

    #[test]
    fn test_zero_shift_is_delay() {
        let mut fs = FrequencyShifter::new();
        let mut out = Vec::new();
        for n in 0..200 {
            out.push(fs.process(if n == 0 { 1.0 } else { 0.0 }, 0.0, 48000.0));
        }
        let center = fs.latency();
        assert_eq!(center, HILBERT_TAPS / 2);
        assert!((out[center] - 1.0).abs() < 1e-6);
        assert!(out.iter().enumerate().all(|(i, &y)| i == center || y.abs() < 1e-6));
    }

    #[test]
    fn test_longer_transformer_reaches_lower() {
        // 6 kHz at 192 kHz sits where 1.5 kHz does at 48 kHz.
        let sr = 192000.0f32;
        let freq = 6000.0f32;
        let quadrature_error = |mut h: HilbertTransform| {
            let latency = h.latency();
            let mut max_err = 0.0f32;
            for n in 0..19200 {
                let x = (2.0 * std::f32::consts::PI * freq * n as f32 / sr).sin();
                let (_, im) = h.process(x);
                if n > 2000 {
                    let t = (n - latency) as f32;
                    let expected = -(2.0 * std::f32::consts::PI * freq * t / sr).cos();
                    max_err = max_err.max((im - expected).abs());
                }
            }
            max_err
        };
        let long = HilbertTransform::with_taps(4 * (HILBERT_TAPS - 1) + 1);
        assert_eq!(long.latency(), 4 * (HILBERT_TAPS / 2));
        let long_err = quadrature_error(long);
        assert!(long_err < 0.03, "quadrature error {}", long_err);
        assert!(long_err < quadrature_error(HilbertTransform::new()));
    }
}
