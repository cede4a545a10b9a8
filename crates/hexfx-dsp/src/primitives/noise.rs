//! Cheap deterministic noise for analog drift models.

/// Xorshift32 white noise in [-1, 1).
#[derive(Debug, Clone)]
pub struct Xorshift {
    seed: u32,
    state: u32,
}

impl Xorshift {
    pub fn new(seed: u32) -> Self {
        let seed = if seed == 0 { 0x9E37_79B9 } else { seed };
        Self { seed, state: seed }
    }

    /// Restart the sequence from the original seed.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        (self.state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

/// Mean-reverting random walk bounded to `±limit`.
#[derive(Debug, Clone)]
pub struct Drift {
    noise: Xorshift,
    value: f32,
    step: f32,
    pull: f32,
    limit: f32,
}

impl Drift {
    /// `step` is the per-sample random increment, `pull` the per-sample
    /// reversion toward zero.
    pub fn new(seed: u32, step: f32, pull: f32, limit: f32) -> Self {
        Self {
            noise: Xorshift::new(seed),
            value: 0.0,
            step,
            pull,
            limit,
        }
    }

    pub fn reset(&mut self) {
        self.noise.reset();
        self.value = 0.0;
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        let v = self.value * (1.0 - self.pull) + self.noise.next_bipolar() * self.step;
        self.value = v.clamp(-self.limit, self.limit);
        self.value
    }
}
