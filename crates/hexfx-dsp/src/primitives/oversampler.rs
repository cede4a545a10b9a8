//! Polyphase FIR oversampling around nonlinear stages.
//!
//! The prototype is a Kaiser-windowed sinc of odd length `F·m + 1`, so the
//! up/down round trip delays the signal by exactly `m` base-rate samples.

use std::f64::consts::PI;

const STOPBAND_DB: f64 = 70.0;
/// Cutoff relative to the base-rate Nyquist.
const CUTOFF: f64 = 0.9;

/// Interpolate by `factor`, run a per-subsample closure, decimate back.
#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: usize,
    half_order: usize,
    taps_per_phase: usize,
    /// Phase-major polyphase taps scaled by `factor`.
    up_taps: Vec<f32>,
    /// Prototype taps for the decimator.
    down_taps: Vec<f32>,
    input: Vec<f32>,
    input_pos: usize,
    high: Vec<f32>,
    high_mask: usize,
    high_pos: usize,
}

impl Oversampler {
    /// `factor` 2 or 4 (or any integer ≥ 1); latency is `half_order` samples.
    pub fn new(factor: usize, half_order: usize) -> Self {
        let factor = factor.max(1);
        let half_order = half_order.max(1);
        let length = factor * half_order + 1;
        let prototype = design_lowpass(length, CUTOFF * 0.5 / factor as f64);

        let taps_per_phase = half_order + 1;
        let mut up_taps = vec![0.0f32; factor * taps_per_phase];
        for (i, &h) in prototype.iter().enumerate() {
            let phase = i % factor;
            let tap = i / factor;
            up_taps[phase * taps_per_phase + tap] = (h * factor as f64) as f32;
        }

        let high_len = (factor * taps_per_phase).next_power_of_two();
        Self {
            factor,
            half_order,
            taps_per_phase,
            up_taps,
            down_taps: prototype.iter().map(|&h| h as f32).collect(),
            input: vec![0.0; taps_per_phase],
            input_pos: 0,
            high: vec![0.0; high_len],
            high_mask: high_len - 1,
            high_pos: 0,
        }
    }

    /// 2× with latency 24.
    pub fn x2() -> Self {
        Self::new(2, 24)
    }

    /// 4× with latency 32.
    pub fn x4() -> Self {
        Self::new(4, 32)
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Round-trip delay in base-rate samples.
    pub fn latency(&self) -> usize {
        self.half_order
    }

    pub fn reset(&mut self) {
        self.input.fill(0.0);
        self.high.fill(0.0);
        self.input_pos = 0;
        self.high_pos = 0;
    }

    /// Process one base-rate sample. `f(subsample, x)` runs `factor` times
    /// at the high rate.
    #[inline]
    pub fn process(&mut self, x: f32, mut f: impl FnMut(usize, f32) -> f32) -> f32 {
        let k_len = self.taps_per_phase;
        self.input_pos = if self.input_pos == 0 { k_len - 1 } else { self.input_pos - 1 };
        self.input[self.input_pos] = x;

        // Decimation point is the first subsample of this base sample.
        let mut decimation_pos = 0;
        for phase in 0..self.factor {
            let taps = &self.up_taps[phase * k_len..(phase + 1) * k_len];
            let mut sum = 0.0;
            for (k, &h) in taps.iter().enumerate() {
                let idx = self.input_pos + k;
                let idx = if idx >= k_len { idx - k_len } else { idx };
                sum += h * self.input[idx];
            }
            let y = f(phase, sum);
            self.high[self.high_pos] = y;
            if phase == 0 {
                decimation_pos = self.high_pos;
            }
            self.high_pos = (self.high_pos + 1) & self.high_mask;
        }

        let mut out = 0.0;
        for (i, &h) in self.down_taps.iter().enumerate() {
            out += h * self.high[decimation_pos.wrapping_sub(i) & self.high_mask];
        }
        out
    }
}

/// Kaiser-windowed sinc low-pass, unity DC gain. `cutoff` in cycles/sample.
pub fn design_lowpass(length: usize, cutoff: f64) -> Vec<f64> {
    let m = (length.max(2) - 1) as f64;
    let beta = kaiser_beta(STOPBAND_DB);
    let i0_beta = bessel_i0(beta);

    let mut taps: Vec<f64> = (0..length)
        .map(|i| {
            let n = i as f64 - m / 2.0;
            let sinc = if n.abs() < 1e-12 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * n).sin() / (PI * n)
            };
            let ratio = (i as f64 - m / 2.0) / (m / 2.0);
            let arg = (1.0 - ratio * ratio).max(0.0);
            sinc * bessel_i0(beta * arg.sqrt()) / i0_beta
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    if sum.abs() > 1e-12 {
        taps.iter_mut().for_each(|t| *t /= sum);
    }
    taps
}

fn kaiser_beta(atten_db: f64) -> f64 {
    if atten_db > 50.0 {
        0.1102 * (atten_db - 8.7)
    } else if atten_db >= 21.0 {
        0.5842 * (atten_db - 21.0).powf(0.4) + 0.07886 * (atten_db - 21.0)
    } else {
        0.0
    }
}

/// Modified Bessel function of the first kind, order 0 (power series).
pub(crate) fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..50 {
        term *= half / k as f64;
        let t2 = term * term;
        sum += t2;
        if t2 < sum * 1e-16 {
            break;
        }
    }
    sum
}
