//! Delay lines.

use std::f32::consts::PI;

/// Power-of-two circular delay line.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    mask: usize,
    write: usize,
}

impl DelayLine {
    /// Holds at least `max_delay` samples of history.
    pub fn new(max_delay: usize) -> Self {
        let len = (max_delay + 2).next_power_of_two();
        Self {
            buffer: vec![0.0; len],
            mask: len - 1,
            write: 0,
        }
    }

    /// Longest readable delay.
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 2
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write = 0;
    }

    #[inline]
    pub fn push(&mut self, x: f32) {
        self.write = (self.write + 1) & self.mask;
        self.buffer[self.write] = x;
    }

    /// Sample written `delay` pushes ago (0 = newest).
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        self.buffer[self.write.wrapping_sub(delay) & self.mask]
    }

    /// Linear interpolation at a fractional delay.
    #[inline]
    pub fn read_linear(&self, delay: f32) -> f32 {
        let delay = delay.clamp(0.0, self.max_delay() as f32);
        let whole = delay.floor();
        let frac = delay - whole;
        let a = self.read(whole as usize);
        let b = self.read(whole as usize + 1);
        a + (b - a) * frac
    }
}

/// Two-head crossfaded delay whose read pointer moves at `ratio` times the
/// write clock.
///
/// Each head sweeps its delay across `[base, base + window]`. The heads are
/// half a sweep apart and crossfaded with complementary raised-cosine gains
/// that reach zero exactly where a head wraps, so the output never jumps.
#[derive(Debug, Clone)]
pub struct PitchedDelay {
    line: DelayLine,
    base: f32,
    window: f32,
    phase: f32,
}

impl PitchedDelay {
    pub fn new(base_delay: usize, window: usize) -> Self {
        Self {
            line: DelayLine::new(base_delay + window + 2),
            base: base_delay as f32,
            window: window.max(2) as f32,
            phase: 0.0,
        }
    }

    /// Average delay of the output relative to the input.
    pub fn latency(&self) -> usize {
        (self.base + 0.5 * self.window) as usize
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.phase = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f32, ratio: f32) -> f32 {
        self.line.push(x);

        self.phase += (1.0 - ratio) / self.window;
        self.phase -= self.phase.floor();

        let phase_b = {
            let p = self.phase + 0.5;
            if p >= 1.0 {
                p - 1.0
            } else {
                p
            }
        };
        // TODO: windowed-sinc read for the heads; linear smears highs at large ratios.
        let a = self.line.read_linear(self.base + self.phase * self.window);
        let b = self.line.read_linear(self.base + phase_b * self.window);
        let gain_a = 0.5 - 0.5 * (2.0 * PI * self.phase).cos();
        let gain_b = 1.0 - gain_a;
        a * gain_a + b * gain_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_delay() {
        let mut d = DelayLine::new(16);
        for i in 0..20 {
            d.push(i as f32);
        }
        assert_eq!(d.read(0), 19.0);
        assert_eq!(d.read(5), 14.0);
        assert!((d.read_linear(2.5) - 16.5).abs() < 1e-6);
    }

    #[test]
    fn test_unity_ratio_is_constant_delay() {
        let mut p = PitchedDelay::new(100, 200);
        let mut out = Vec::new();
        for n in 0..1000 {
            out.push(p.process(if n == 0 { 1.0 } else { 0.0 }, 1.0));
        }
        // Heads sit at base and base + window/2 with gains 0 and 1.
        assert!((out[200] - 1.0).abs() < 1e-6);
        assert!(out.iter().map(|y| y.abs()).sum::<f32>() - 1.0 < 1e-5);
    }

    #[test]
    fn test_octave_up_frequency() {
        let sr = 48000.0f32;
        // Window of four input periods keeps both heads phase-coherent.
        let mut p = PitchedDelay::new(64, 960);
        let mut out = Vec::new();
        for n in 0..48000 {
            let x = (2.0 * PI * 200.0 * n as f32 / sr).sin();
            out.push(p.process(x, 2.0));
        }
        // Count zero crossings over the last half second.
        let tail = &out[24000..];
        let crossings = tail.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count();
        let freq = crossings as f32 / 0.5;
        assert!((freq - 400.0).abs() < 20.0, "estimated {}", freq);
    }
}
