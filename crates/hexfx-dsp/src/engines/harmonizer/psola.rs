//! Time-domain pitch-synchronous overlap-add voice.
//!
//! Grains are cut around pitch marks of the (shared) analysis history and
//! laid down every `T_ref / α` samples on the output timeline. The output
//! timeline runs [`super::LATENCY`] samples behind the input, which bounds
//! the longest period this voice can handle (see [`max_period`]).

use hexfx_analysis::{EpochTracker, SampleHistory};
use std::f64::consts::TAU;

const ACCUMULATOR: usize = 8192;
const WSOLA_SPAN: f32 = 0.05;
const GRAIN_PERIODS: f32 = 2.5;
const MAX_EQ_GAIN: f32 = 4.0;
const MIN_EQ_GAIN: f32 = 0.25;

/// Longest reference period that still lets a grain be cut before it is
/// due, given the output delay.
pub fn max_period(delay: usize) -> f32 {
    (delay as f32 - 64.0) / 3.6
}

/// Odd grain length for a reference period.
#[inline]
pub fn grain_length(period: f32) -> usize {
    let len = (GRAIN_PERIODS * period).round().max(3.0) as usize;
    len | 1
}

#[derive(Debug, Clone)]
pub struct PsolaVoice {
    delay: i64,
    accumulator: Vec<f32>,
    grain: Vec<f32>,
    previous: Vec<f32>,
    previous_len: usize,
    /// Next synthesis instant on the output timeline, `None` while idle.
    next_instant: Option<f64>,
    epoch_index: Option<f64>,
}

impl PsolaVoice {
    /// `delay` is the input-to-output latency; `max_grain` the longest grain.
    pub fn new(delay: usize, max_grain: usize) -> Self {
        let max_grain = max_grain | 1;
        Self {
            delay: delay as i64,
            accumulator: vec![0.0; ACCUMULATOR.max((max_grain * 2).next_power_of_two())],
            grain: vec![0.0; max_grain],
            previous: vec![0.0; max_grain],
            previous_len: 0,
            next_instant: None,
            epoch_index: None,
        }
    }

    pub fn reset(&mut self) {
        self.accumulator.fill(0.0);
        self.previous.fill(0.0);
        self.previous_len = 0;
        self.next_instant = None;
        self.epoch_index = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_instant.is_some()
    }

    /// Produce output sample `n` (the index of the newest input sample).
    pub fn tick(
        &mut self,
        n: u64,
        ratio: f64,
        history: &SampleHistory,
        epochs: &EpochTracker,
        period_limit: f32,
    ) -> f32 {
        let now = n as i64;
        let period = epochs.reference_period().min(period_limit).max(2.0);
        let length = grain_length(period).min(self.grain.len());
        let half = (length / 2) as f64;

        let mut instant = self.next_instant.unwrap_or(now as f64 + half);
        while instant - half <= now as f64 {
            let hop = period as f64 / ratio;
            self.emit(instant, now, ratio, period, length, history, epochs);
            instant += hop.max(1.0);
        }
        self.next_instant = Some(instant);

        let mask = self.accumulator.len() - 1;
        let slot = &mut self.accumulator[n as usize & mask];
        let out = *slot;
        *slot = 0.0;
        out
    }

    /// Pick the analysis epoch for a grain due at `instant`.
    fn select_epoch(&mut self, instant: f64, ratio: f64, period: f32, epochs: &EpochTracker) -> i64 {
        let target = instant - self.delay as f64;
        let anchored = |index: &mut Option<f64>| -> i64 {
            let Some(before) = epochs.index_at_or_before(target.max(0.0) as u64) else {
                *index = None;
                return target.round() as i64;
            };
            let mut k = before;
            if let (Some(a), Some(b)) = (epochs.mark(before), epochs.mark(before + 1)) {
                if (b as f64 - target).abs() < (target - a as f64).abs() {
                    k = before + 1;
                }
            }
            *index = Some(k as f64);
            epochs.mark(k).map_or(target.round() as i64, |p| p as i64)
        };

        match self.epoch_index {
            Some(index) => {
                let next = index + 1.0 / ratio;
                self.epoch_index = Some(next);
                match epochs.mark(next.round().max(0.0) as u64) {
                    Some(p) if (p as f64 - target).abs() <= period as f64 => p as i64,
                    _ => anchored(&mut self.epoch_index),
                }
            }
            None => anchored(&mut self.epoch_index),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        instant: f64,
        now: i64,
        ratio: f64,
        period: f32,
        length: usize,
        history: &SampleHistory,
        epochs: &EpochTracker,
    ) {
        let half = (length / 2) as i64;
        let span = (WSOLA_SPAN * period).round() as i64;
        let newest_center = now - half - span;

        let mut center = self.select_epoch(instant, ratio, period, epochs);
        if center > newest_center {
            center = newest_center;
        }

        // Micro-WSOLA against the previous grain.
        let compare = self.previous_len.min(length);
        if compare > 0 && span > 0 {
            let mut best = (f32::MIN, 0i64);
            for offset in -span..=span {
                let start = center + offset - (compare / 2) as i64;
                let mut cross = 0.0f32;
                let mut energy = 0.0f32;
                for j in 0..compare {
                    let x = history.get_signed(start + j as i64) * hann(j, compare);
                    cross += x * self.previous[j + (self.previous_len - compare) / 2];
                    energy += x * x;
                }
                let score = if energy > 1e-12 { cross / energy.sqrt() } else { 0.0 };
                if score > best.0 {
                    best = (score, offset);
                }
            }
            center += best.1;
        }

        // Cut the grain.
        let start = center - half;
        let mut raw_energy = 0.0f32;
        let mut windowed_energy = 0.0f32;
        let mut window_energy = 0.0f32;
        for j in 0..length {
            let x = history.get_signed(start + j as i64);
            let w = hann(j, length);
            self.grain[j] = x * w;
            raw_energy += x * x;
            windowed_energy += x * x * w * w;
            window_energy += w * w;
        }

        // Polarity guard.
        if compare > 0 {
            let offset_now = (length - compare) / 2;
            let offset_prev = (self.previous_len - compare) / 2;
            let dot: f32 = (0..compare)
                .map(|j| self.grain[offset_now + j] * self.previous[offset_prev + j])
                .sum();
            if dot < 0.0 {
                self.grain[..length].iter_mut().for_each(|s| *s = -*s);
            }
        }

        let envelope_rms = (raw_energy / length as f32).sqrt();
        let grain_rms = (windowed_energy / window_energy.max(1e-12)).sqrt();
        let eq = if grain_rms > 1e-9 {
            (envelope_rms / grain_rms).clamp(MIN_EQ_GAIN, MAX_EQ_GAIN)
        } else {
            1.0
        };
        let hop = period as f64 / ratio;
        let ola = (hop / length as f64).sqrt() as f32;
        let gain = eq * ola;

        let mask = self.accumulator.len() - 1;
        let first = instant.round() as i64 - half;
        for (j, &g) in self.grain[..length].iter().enumerate() {
            let position = first + j as i64;
            // Never write into samples that already left.
            if position < now || position - now >= mask as i64 {
                continue;
            }
            self.accumulator[position as usize & mask] += g * gain;
        }

        self.previous[..length].copy_from_slice(&self.grain[..length]);
        self.previous_len = length;
    }
}

/// Hann window without zero endpoints.
#[inline]
fn hann(j: usize, length: usize) -> f32 {
    (0.5 - 0.5 * (TAU * (j + 1) as f64 / (length + 1) as f64).cos()) as f32
}
