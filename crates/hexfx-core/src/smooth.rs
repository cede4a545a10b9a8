//! Smoothed parameter values for zipper-free automation.
//!
//! A [`SmoothParam`] pairs a shared atomic target (written by the control
//! thread) with an audio-thread-owned current value that follows it through a
//! one-pole low-pass:
//!
//! ```text
//! current[n] = target + (current[n-1] - target) * c,   c = exp(-1 / (tau * fs))
//! ```
//!
//! Advancing one sample at a time keeps the trajectory identical regardless
//! of how the host slices blocks.
//!
//! # Example
//!
//! ```
//! use hexfx_core::SmoothParam;
//!
//! let mut gain = SmoothParam::standalone(1.0, 0.010);
//! gain.prepare(48000.0);
//!
//! gain.set_target(0.5);
//! # let mut buffer = [1.0f32; 512];
//! for sample in buffer.iter_mut() {
//!     *sample *= gain.next();
//! }
//! assert!(buffer[511] < 0.75);
//! ```

use crate::lockfree::AtomicFloat;
use crate::parameter::ParamSpec;
use std::sync::Arc;

const FALLBACK_SAMPLE_RATE: f64 = 48000.0;

/// One-pole coefficient for time constant `tau_secs` at `sample_rate`.
///
/// Non-positive time constants give 0 (jump straight to target).
#[inline]
pub fn one_pole_coefficient(tau_secs: f32, sample_rate: f64) -> f32 {
    let samples = tau_secs as f64 * sample_rate;
    if samples <= 0.0 || !samples.is_finite() {
        0.0
    } else {
        (-1.0 / samples).exp() as f32
    }
}

/// Parameter value smoothed toward an atomic target.
#[derive(Debug)]
pub struct SmoothParam {
    target: Arc<AtomicFloat>,
    current: f32,
    coefficient: f32,
    smoothing_secs: f32,
    spec: Option<&'static ParamSpec>,
}

impl SmoothParam {
    pub fn new(target: Arc<AtomicFloat>, smoothing_secs: f32) -> Self {
        let current = target.get_relaxed();
        Self {
            target,
            current,
            coefficient: one_pole_coefficient(smoothing_secs, FALLBACK_SAMPLE_RATE),
            smoothing_secs,
            spec: None,
        }
    }

    /// A smoother that owns its target cell.
    pub fn standalone(initial: f32, smoothing_secs: f32) -> Self {
        Self::new(Arc::new(AtomicFloat::new(initial)), smoothing_secs)
    }

    /// A smoother whose [`value`](Self::value) maps through `spec`.
    pub fn with_spec(target: Arc<AtomicFloat>, spec: &'static ParamSpec) -> Self {
        let mut smoother = Self::new(target, spec.smoothing_secs());
        smoother.spec = Some(spec);
        smoother
    }

    /// Recompute the coefficient for a new sample rate and snap to target.
    pub fn prepare(&mut self, sample_rate: f64) {
        self.coefficient = one_pole_coefficient(self.smoothing_secs, sample_rate);
        self.reset();
    }

    /// Snap the current value to the target.
    pub fn reset(&mut self) {
        self.current = self.target.get_relaxed();
    }

    /// Store a new target. Safe from any thread.
    #[inline]
    pub fn set_target(&self, value: f32) {
        self.target.set_relaxed(value);
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target.get_relaxed()
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    /// Shared handle to the target cell.
    pub fn handle(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.target)
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let target = self.target.get_relaxed();
        let delta = (self.current - target) * self.coefficient;
        self.current = if delta.abs() < f32::MIN_POSITIVE {
            target
        } else {
            target + delta
        };
        self.current
    }

    /// Advance one sample and return the value mapped to physical units.
    #[inline]
    pub fn value(&mut self) -> f32 {
        let normalized = self.next();
        match self.spec {
            Some(spec) => spec.denormalize(normalized),
            None => normalized,
        }
    }

    /// True once the current value has reached the target.
    pub fn is_settled(&self) -> bool {
        self.current == self.target.get_relaxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_settles_on_target() {
        let mut p = SmoothParam::standalone(0.0, 0.010);
        p.prepare(48000.0);
        p.set_target(1.0);

        // 10 time constants
        for _ in 0..4800 {
            p.next();
        }
        assert!((p.current() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_reset_snaps() {
        let mut p = SmoothParam::standalone(0.2, 0.050);
        p.prepare(44100.0);
        p.set_target(0.9);
        p.next();
        assert!(p.current() < 0.9);
        p.reset();
        assert_eq!(p.current(), 0.9);
        assert!(p.is_settled());
    }

    #[test]
    fn test_zero_time_is_instant() {
        let mut p = SmoothParam::standalone(0.0, 0.0);
        p.prepare(48000.0);
        p.set_target(0.7);
        assert_eq!(p.next(), 0.7);
    }

    #[test]
    fn test_spec_mapping() {
        static SPEC: ParamSpec = ParamSpec::linear("Rate", 0.1, 20.0, 5.075);
        let cell = Arc::new(AtomicFloat::new(1.0));
        let mut p = SmoothParam::with_spec(cell, &SPEC);
        p.prepare(48000.0);
        assert!((p.value() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_split_advance_matches_single() {
        let mut a = SmoothParam::standalone(0.0, 0.010);
        let mut b = SmoothParam::standalone(0.0, 0.010);
        a.prepare(48000.0);
        b.prepare(48000.0);
        a.set_target(1.0);
        b.set_target(1.0);

        let whole: Vec<f32> = (0..1024).map(|_| a.next()).collect();
        let mut split = Vec::new();
        for _ in 0..8 {
            for _ in 0..128 {
                split.push(b.next());
            }
        }
        assert_eq!(whole, split);
    }

    proptest! {
        #[test]
        fn prop_distance_bounded_by_decay(
            start in -1.0f32..1.0,
            target in -1.0f32..1.0,
            tau_ms in 1.0f32..50.0,
            n in 1usize..4096,
        ) {
            let mut p = SmoothParam::standalone(start, tau_ms * 0.001);
            p.prepare(48000.0);
            p.set_target(target);
            for _ in 0..n {
                p.next();
            }
            let bound = (start - target).abs() * p.coefficient().powi(n as i32);
            prop_assert!((p.current() - target).abs() <= bound + 1e-6);
        }
    }
}
