//! State variable filter (TPT/ZDF).
//!
//! Topology-preserving transform form after Andrew Simper: stable under
//! per-sample modulation and near Nyquist.

use std::f32::consts::PI;

/// Simultaneous outputs of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SvfOutput {
    pub low: f32,
    /// Peak gain equals Q.
    pub band: f32,
    pub high: f32,
    /// Band-pass with unity peak gain.
    pub band_norm: f32,
}

#[derive(Debug, Clone)]
pub struct Svf {
    g: f32,
    r: f32,
    h: f32,
    ic1eq: f32,
    ic2eq: f32,
}

impl Default for Svf {
    fn default() -> Self {
        let mut svf = Self {
            g: 0.0,
            r: 0.0,
            h: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        svf.set(1000.0, std::f32::consts::FRAC_1_SQRT_2, 48000.0);
        svf
    }
}

impl Svf {
    pub fn new(cutoff_hz: f32, q: f32, sample_rate: f64) -> Self {
        let mut svf = Self::default();
        svf.set(cutoff_hz, q, sample_rate);
        svf
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Cutoff is clamped to [10 Hz, 0.45·fs], Q to ≥ 0.5.
    #[inline]
    pub fn set(&mut self, cutoff_hz: f32, q: f32, sample_rate: f64) {
        let sr = sample_rate as f32;
        let cutoff = cutoff_hz.clamp(10.0, sr * 0.45);
        let g = (PI * cutoff / sr).tan();
        let r = 1.0 / q.max(0.5);
        self.g = g;
        self.r = r;
        self.h = 1.0 / (1.0 + r * g + g * g);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> SvfOutput {
        let v1 = (self.g * (input - self.ic2eq) + self.ic1eq) * self.h;
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush(2.0 * v2 - self.ic2eq);

        SvfOutput {
            low: v2,
            band: v1,
            high: input - (self.r * v1 + v2),
            band_norm: self.r * v1,
        }
    }
}

#[inline]
fn flush(x: f32) -> f32 {
    if x.abs() < f32::MIN_POSITIVE {
        0.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_peak(svf: &mut Svf, freq: f32, pick: impl Fn(SvfOutput) -> f32) -> f32 {
        let mut peak = 0.0f32;
        for n in 0..9600 {
            let x = (2.0 * PI * freq * n as f32 / 48000.0).sin();
            let y = pick(svf.process(x));
            if n > 4800 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_lowpass_response() {
        let mut svf = Svf::new(1000.0, 0.707, 48000.0);
        assert!(steady_peak(&mut svf, 100.0, |o| o.low) > 0.98);
        svf.reset();
        assert!(steady_peak(&mut svf, 10000.0, |o| o.low) < 0.02);
    }

    #[test]
    fn test_normalized_bandpass_unity_at_center() {
        let mut svf = Svf::new(2000.0, 8.0, 48000.0);
        let peak = steady_peak(&mut svf, 2000.0, |o| o.band_norm);
        assert!((peak - 1.0).abs() < 0.02, "peak {}", peak);
    }

    #[test]
    fn test_low_plus_high_plus_band_reconstructs() {
        let mut svf = Svf::new(500.0, 0.707, 48000.0);
        for n in 0..1000 {
            let x = ((n * 7919) % 101) as f32 / 50.0 - 1.0;
            let o = svf.process(x);
            assert!((o.low + o.high + o.band_norm - x).abs() < 1e-5);
        }
    }
}
