//! Power-of-two ring of recent input addressed by absolute sample index.

/// Input history with absolute indexing.
///
/// Sample `n` (counted from the last reset) stays readable until
/// `capacity` newer samples have been written.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    buffer: Vec<f32>,
    mask: usize,
    written: u64,
}

impl SampleHistory {
    /// Capacity is rounded up to a power of two.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.written = 0;
    }

    /// Number of samples pushed since reset. The next sample gets this index.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.written as usize & self.mask] = sample;
        self.written += 1;
    }

    /// True if `index` has been written and not yet overwritten.
    #[inline]
    pub fn contains(&self, index: u64) -> bool {
        index < self.written && self.written - index <= self.buffer.len() as u64
    }

    /// Sample at absolute `index`, or 0 outside the readable window.
    #[inline]
    pub fn get(&self, index: u64) -> f32 {
        if self.contains(index) {
            self.buffer[index as usize & self.mask]
        } else {
            0.0
        }
    }

    /// Sample at a signed absolute position (negative positions read 0).
    #[inline]
    pub fn get_signed(&self, index: i64) -> f32 {
        if index < 0 {
            0.0
        } else {
            self.get(index as u64)
        }
    }

    /// Linear interpolation at a fractional absolute position.
    #[inline]
    pub fn read_linear(&self, position: f64) -> f32 {
        let base = position.floor();
        let frac = (position - base) as f32;
        let i = base as i64;
        let a = self.get_signed(i);
        let b = self.get_signed(i + 1);
        a + (b - a) * frac
    }

    /// Copy the newest `out.len()` samples, oldest first.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let n = out.len() as u64;
        let start = self.written.saturating_sub(n);
        let missing = (n - (self.written - start)) as usize;
        out[..missing].fill(0.0);
        for (slot, index) in out[missing..].iter_mut().zip(start..self.written) {
            *slot = self.get(index);
        }
    }
}
