//! Mono Maker: collapses the low end to mono below a crossover.
//!
//! Linkwitz-Riley 4th-order split built from two cascaded Butterworth SVF
//! stages per band. The LR4 low and high bands sum to an allpass, so a mono
//! input comes out with flat magnitude.

use crate::primitives::Svf;
use hexfx_core::{
    check_prepare_args, AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId,
    ParamBank, ParamSpec, Result, SmoothParam,
};
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

pub const FREQUENCY: usize = 0;

pub static PARAMS: [ParamSpec; 1] =
    [ParamSpec::logarithmic("Frequency", 20.0, 500.0, 120.0).with_unit("Hz")];

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(55),
    name: "Mono Maker",
    category: EngineCategory::Spatial,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: 0,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Coefficients are refreshed on this sample grid while the cutoff glides.
const COEFF_INTERVAL: u32 = 16;

#[derive(Debug, Clone, Default)]
struct Crossover {
    split: Svf,
    low: Svf,
    high: Svf,
}

impl Crossover {
    fn set(&mut self, cutoff: f32, sample_rate: f64) {
        for svf in [&mut self.split, &mut self.low, &mut self.high] {
            svf.set(cutoff, FRAC_1_SQRT_2, sample_rate);
        }
    }

    fn reset(&mut self) {
        self.split.reset();
        self.low.reset();
        self.high.reset();
    }

    #[inline]
    fn process(&mut self, x: f32) -> (f32, f32) {
        let first = self.split.process(x);
        (self.low.process(first.low).low, self.high.process(first.high).high)
    }
}

pub struct MonoMaker {
    params: Arc<ParamBank>,
    frequency: SmoothParam,
    sample_rate: f64,
    counter: u32,
    bands: [Crossover; 2],
}

impl Default for MonoMaker {
    fn default() -> Self {
        Self::new()
    }
}

impl MonoMaker {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            frequency: params.smoothed(FREQUENCY),
            params,
            sample_rate: 48000.0,
            counter: 0,
            bands: Default::default(),
        }
    }

    fn update_coefficients(&mut self, cutoff: f32) {
        for band in &mut self.bands {
            band.set(cutoff, self.sample_rate);
        }
    }
}

impl Engine for MonoMaker {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        self.frequency.prepare(sample_rate);
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let len = block.len();
        // Nothing to collapse in a mono block.
        let (left, Some(right)) = block.split_mut() else {
            for _ in 0..len {
                self.frequency.next();
            }
            return;
        };

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let cutoff = self.frequency.value();
            if self.counter == 0 {
                self.update_coefficients(cutoff);
            }
            self.counter = (self.counter + 1) % COEFF_INTERVAL;

            let (low_l, high_l) = self.bands[0].process(*l);
            let (low_r, high_r) = self.bands[1].process(*r);
            let mono = 0.5 * (low_l + low_r);
            *l = mono + high_l;
            *r = mono + high_r;
        }
    }

    fn reset(&mut self) {
        self.frequency.reset();
        self.counter = 0;
        for band in &mut self.bands {
            band.reset();
        }
        let cutoff = self.params.physical(FREQUENCY);
        self.update_coefficients(cutoff);
    }
}
