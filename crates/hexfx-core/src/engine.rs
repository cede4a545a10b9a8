//! The engine contract shared by every effect in a slot.

use crate::block::AudioBlock;
use crate::denormal::DenormalGuard;
use crate::param::{ParamBank, ParamMap};
use crate::parameter::ParamSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Engine type identifier (0 = bypass stub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineId(pub u16);

impl EngineId {
    pub const BYPASS: Self = Self(0);
    pub const MAX: Self = Self(56);
    /// Number of engine IDs, including the stub.
    pub const COUNT: usize = 57;

    pub fn new(id: u16) -> Result<Self> {
        if id <= Self::MAX.0 {
            Ok(Self(id))
        } else {
            Err(Error::UnknownEngine(id))
        }
    }

    /// Engine selector from a normalized host value.
    pub fn from_normalized(value: f32) -> Self {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        Self((value * Self::MAX.0 as f32).round() as u16)
    }

    pub fn to_normalized(self) -> f32 {
        self.0 as f32 / Self::MAX.0 as f32
    }

    #[inline]
    pub fn is_bypass(self) -> bool {
        self == Self::BYPASS
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broad grouping used by browsers and the registry listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCategory {
    Utility,
    Dynamics,
    Filter,
    Distortion,
    Modulation,
    Pitch,
    Delay,
    Reverb,
    Spatial,
    Spectral,
    Experimental,
}

/// Immutable per-type record.
#[derive(Debug)]
pub struct EngineDescriptor {
    pub id: EngineId,
    pub name: &'static str,
    pub category: EngineCategory,
    pub params: &'static [ParamSpec],
    pub realtime_safe: bool,
    pub latency_samples: usize,
    /// Keep running while the slot is bypassed so tails stay warm.
    pub stateful_on_bypass: bool,
    /// Output may ring forever after the input stops.
    pub infinite_tail: bool,
}

impl EngineDescriptor {
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// Normalized default of every parameter, in index order.
    pub fn defaults(&self) -> impl Iterator<Item = f32> + '_ {
        self.params.iter().map(ParamSpec::default_normalized)
    }

    pub fn default_map(&self) -> ParamMap {
        self.defaults().enumerate().collect()
    }
}

/// Outcome of one [`Engine::render`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Non-finite samples replaced with zero.
    pub scrubbed: usize,
}

impl RenderReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.scrubbed == 0
    }
}

/// A DSP effect that can sit in a slot.
///
/// `prepare` may allocate. `process`, `reset` and `update_parameters` must
/// not allocate, lock, or block.
pub trait Engine: Send {
    fn descriptor(&self) -> &'static EngineDescriptor;

    /// Lock-free parameter cells shared with the control thread.
    fn params(&self) -> &Arc<ParamBank>;

    /// Derive all rate-dependent state, then leave the engine as after `reset`.
    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()>;

    /// Process a block in place. `block.len()` never exceeds the prepared
    /// maximum.
    fn process(&mut self, block: &mut AudioBlock<'_>);

    /// Clear delay lines, filter memory, LFO phases and tracker history.
    fn reset(&mut self);

    /// Write a parameter snapshot into the atomic targets.
    fn update_parameters(&self, params: &ParamMap) {
        self.params().apply_snapshot(params);
    }

    fn latency_samples(&self) -> usize {
        self.descriptor().latency_samples
    }

    /// `process` under a denormal guard, followed by a NaN/Inf scrub.
    fn render(&mut self, block: &mut AudioBlock<'_>) -> RenderReport {
        let _guard = DenormalGuard::new();
        self.process(block);
        RenderReport {
            scrubbed: block.scrub_non_finite(),
        }
    }
}

/// Shared argument check for `Engine::prepare`.
pub fn check_prepare_args(sample_rate: f64, max_block_size: usize) -> Result<()> {
    if !sample_rate.is_finite() || !(8000.0..=384_000.0).contains(&sample_rate) {
        return Err(Error::InvalidSampleRate(sample_rate));
    }
    if max_block_size == 0 || max_block_size > 16384 {
        return Err(Error::InvalidBlockSize(max_block_size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_id_bounds() {
        assert!(EngineId::new(56).is_ok());
        assert_eq!(EngineId::new(57), Err(Error::UnknownEngine(57)));
        assert!(EngineId::BYPASS.is_bypass());
    }

    #[test]
    fn test_engine_id_from_normalized() {
        assert_eq!(EngineId::from_normalized(0.0), EngineId(0));
        assert_eq!(EngineId::from_normalized(1.0), EngineId(56));
        assert_eq!(EngineId::from_normalized(29.0 / 56.0), EngineId(29));
        assert_eq!(EngineId::from_normalized(f32::NAN), EngineId(0));
        assert_eq!(EngineId::from_normalized(3.0), EngineId(56));
    }

    #[test]
    fn test_prepare_args() {
        assert!(check_prepare_args(48000.0, 512).is_ok());
        assert!(check_prepare_args(0.0, 512).is_err());
        assert!(check_prepare_args(48000.0, 0).is_err());
    }

    #[test]
    fn test_descriptor_defaults() {
        static PARAMS: [ParamSpec; 2] = [
            ParamSpec::linear("Gain", 0.0, 1.0, 0.25),
            ParamSpec::toggle("Invert", true),
        ];
        static DESC: EngineDescriptor = EngineDescriptor {
            id: EngineId(54),
            name: "Test",
            category: EngineCategory::Utility,
            params: &PARAMS,
            realtime_safe: true,
            latency_samples: 0,
            stateful_on_bypass: false,
            infinite_tail: false,
        };
        let map = DESC.default_map();
        assert_eq!(DESC.parameter_count(), 2);
        assert_eq!(map.get(0), Some(0.25));
        assert_eq!(map.get(1), Some(1.0));
    }
}
