//! Pitch-mark (epoch) tracking for pitch-synchronous processing.
//!
//! Marks are absolute sample indices into a [`SampleHistory`], placed one
//! period apart on the largest positive peak within ±25% of the expected
//! position. The period comes from an external detector (YIN); unvoiced
//! input falls back to a fixed default period so marks keep flowing.

use crate::history::SampleHistory;
use crate::median::median_in_place;

const SEARCH_SPAN: f32 = 0.25;
const REFERENCE_INTERVALS: usize = 7;
const SILENCE_PEAK: f32 = 1.0e-6;

/// Running sequence of pitch marks.
#[derive(Debug, Clone)]
pub struct EpochTracker {
    marks: Vec<u64>,
    mask: usize,
    count: u64,
    period: f32,
    default_period: f32,
    min_period: f32,
    max_period: f32,
}

impl EpochTracker {
    pub fn new(capacity: usize, default_period: f32, min_period: f32, max_period: f32) -> Self {
        let capacity = capacity.max(4).next_power_of_two();
        let min_period = min_period.max(2.0);
        let max_period = max_period.max(min_period);
        let default_period = default_period.clamp(min_period, max_period);
        Self {
            marks: vec![0; capacity],
            mask: capacity - 1,
            count: 0,
            period: default_period,
            default_period,
            min_period,
            max_period,
        }
    }

    pub fn reset(&mut self) {
        self.marks.fill(0);
        self.count = 0;
        self.period = self.default_period;
    }

    /// Feed the latest detector period (`None` when unvoiced).
    pub fn set_period(&mut self, period: Option<f32>) {
        self.period = match period {
            Some(p) if p.is_finite() && p > 0.0 => p.clamp(self.min_period, self.max_period),
            _ => self.default_period,
        };
    }

    #[inline]
    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn max_period(&self) -> f32 {
        self.max_period
    }

    /// Total marks placed since reset. Mark indices run `0..count`.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Oldest mark index still stored.
    #[inline]
    pub fn oldest(&self) -> u64 {
        self.count.saturating_sub(self.marks.len() as u64)
    }

    /// Sample position of mark `k`, if still stored.
    #[inline]
    pub fn mark(&self, k: u64) -> Option<u64> {
        (k >= self.oldest() && k < self.count).then(|| self.marks[k as usize & self.mask])
    }

    pub fn latest(&self) -> Option<u64> {
        self.count.checked_sub(1).and_then(|k| self.mark(k))
    }

    /// Index of the newest mark at or before `position`.
    pub fn index_at_or_before(&self, position: u64) -> Option<u64> {
        (self.oldest()..self.count)
            .rev()
            .find(|&k| self.marks[k as usize & self.mask] <= position)
    }

    /// Median spacing of the most recent marks, or the current period when
    /// there are too few of them.
    pub fn reference_period(&self) -> f32 {
        let available = (self.count - self.oldest()).saturating_sub(1) as usize;
        let n = available.min(REFERENCE_INTERVALS);
        if n == 0 {
            return self.period;
        }
        let mut intervals = [0.0f32; REFERENCE_INTERVALS];
        for (i, slot) in intervals[..n].iter_mut().enumerate() {
            let k = self.count - 1 - i as u64;
            let newer = self.marks[k as usize & self.mask];
            let older = self.marks[(k - 1) as usize & self.mask];
            *slot = newer.saturating_sub(older) as f32;
        }
        median_in_place(&mut intervals[..n]).clamp(self.min_period, self.max_period)
    }

    /// Place every mark whose search window is fully inside `history`.
    pub fn update(&mut self, history: &SampleHistory) {
        let written = history.written();
        let mut reseed = false;
        loop {
            let last = if reseed { None } else { self.latest() };
            let (lo, hi, nominal) = match last {
                Some(last) => {
                    let nominal = last + self.period.round() as u64;
                    let lo = last + (self.period * (1.0 - SEARCH_SPAN)).round().max(1.0) as u64;
                    let hi = last + (self.period * (1.0 + SEARCH_SPAN)).round() as u64;
                    (lo, hi, nominal)
                }
                None => {
                    let span = self.period.ceil() as u64;
                    if written < span {
                        return;
                    }
                    (written - span, written - 1, written - 1)
                }
            };

            if hi >= written {
                return;
            }
            if !history.contains(lo) {
                // Fell behind the readable window: restart from the newest period.
                reseed = true;
                continue;
            }
            reseed = false;

            let mut best = nominal;
            let mut best_value = SILENCE_PEAK;
            for index in lo..=hi {
                let value = history.get(index);
                if value > best_value {
                    best_value = value;
                    best = index;
                }
            }
            self.push(best);
        }
    }

    fn push(&mut self, position: u64) {
        self.marks[self.count as usize & self.mask] = position;
        self.count += 1;
    }
}
