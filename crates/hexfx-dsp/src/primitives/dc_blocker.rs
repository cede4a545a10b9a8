//! One-pole DC blocking high-pass.

use std::f64::consts::PI;

/// Default corner frequency.
pub const DC_BLOCKER_HZ: f64 = 20.0;

/// `y[n] = x[n] - x[n-1] + R·y[n-1]` with `R = exp(-2π·fc/fs)`.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    r: f32,
    x1: f32,
    y1: f32,
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl DcBlocker {
    pub fn new(sample_rate: f64) -> Self {
        let mut blocker = Self {
            r: 0.0,
            x1: 0.0,
            y1: 0.0,
        };
        blocker.prepare(sample_rate);
        blocker
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.r = (-2.0 * PI * DC_BLOCKER_HZ / sample_rate).exp() as f32;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.r * self.y1;
        self.x1 = x;
        self.y1 = if y.abs() < f32::MIN_POSITIVE { 0.0 } else { y };
        self.y1
    }
}
