//! Gain Utility: trim, per-channel polarity and balance.

use hexfx_core::{
    check_prepare_args, db_to_gain, AudioBlock, Engine, EngineCategory, EngineDescriptor,
    EngineId, ParamBank, ParamSpec, Result, SmoothParam,
};
use std::sync::Arc;

pub const GAIN: usize = 0;
pub const INVERT_LEFT: usize = 1;
pub const INVERT_RIGHT: usize = 2;
pub const PAN: usize = 3;

pub static PARAMS: [ParamSpec; 4] = [
    ParamSpec::linear("Gain", -24.0, 24.0, 0.0).with_unit("dB"),
    ParamSpec::toggle("Invert L", false),
    ParamSpec::toggle("Invert R", false),
    ParamSpec::linear("Pan", -1.0, 1.0, 0.0),
];

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(54),
    name: "Gain Utility",
    category: EngineCategory::Utility,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: 0,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Balance law: centre is unity on both sides, each side fades to zero at the
/// opposite extreme.
#[inline]
pub fn balance(pan: f32) -> (f32, f32) {
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}

pub struct GainUtility {
    params: Arc<ParamBank>,
    gain_db: SmoothParam,
    pan: SmoothParam,
}

impl Default for GainUtility {
    fn default() -> Self {
        Self::new()
    }
}

impl GainUtility {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            gain_db: params.smoothed(GAIN),
            pan: params.smoothed(PAN),
            params,
        }
    }
}

impl Engine for GainUtility {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.gain_db.prepare(sample_rate);
        self.pan.prepare(sample_rate);
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let sign_l = if self.params.toggle(INVERT_LEFT) { -1.0 } else { 1.0 };
        let sign_r = if self.params.toggle(INVERT_RIGHT) { -1.0 } else { 1.0 };

        match block.split_mut() {
            (left, Some(right)) => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let gain = db_to_gain(self.gain_db.value());
                    let (bal_l, bal_r) = balance(self.pan.value());
                    *l *= gain * bal_l * sign_l;
                    *r *= gain * bal_r * sign_r;
                }
            }
            (mono, None) => {
                for s in mono.iter_mut() {
                    let gain = db_to_gain(self.gain_db.value());
                    self.pan.next();
                    *s *= gain * sign_l;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.gain_db.reset();
        self.pan.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_transparent() {
        let mut engine = GainUtility::new();
        engine.prepare(48000.0, 64).unwrap();
        let mut l = [0.5f32; 64];
        let mut r = [-0.25f32; 64];
        engine.process(&mut AudioBlock::stereo(&mut l, &mut r));
        assert!(l.iter().all(|&s| (s - 0.5).abs() < 1e-6));
        assert!(r.iter().all(|&s| (s + 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_invert_and_gain() {
        let mut engine = GainUtility::new();
        engine.params().set(GAIN, PARAMS[GAIN].normalize(-6.0));
        engine.params().set(INVERT_RIGHT, 1.0);
        engine.prepare(48000.0, 4800).unwrap();
        let mut l = vec![1.0f32; 4800];
        let mut r = vec![1.0f32; 4800];
        engine.process(&mut AudioBlock::stereo(&mut l, &mut r));
        assert!((l[4799] - 0.501).abs() < 0.01);
        assert!((r[4799] + 0.501).abs() < 0.01);
    }

    #[test]
    fn test_balance_law() {
        assert_eq!(balance(0.0), (1.0, 1.0));
        assert_eq!(balance(1.0), (0.0, 1.0));
        assert_eq!(balance(-0.5), (1.0, 0.5));
    }
}
