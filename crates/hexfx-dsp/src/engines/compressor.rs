//! Classic Compressor: stereo-linked feed-forward peak compressor.

use hexfx_core::{
    check_prepare_args, db_to_gain, gain_to_db, one_pole_coefficient, AudioBlock, Engine,
    EngineCategory, EngineDescriptor, EngineId, ParamBank, ParamSpec, Result, SmoothParam,
};
use std::sync::Arc;

pub const THRESHOLD: usize = 0;
pub const RATIO: usize = 1;
pub const ATTACK: usize = 2;
pub const RELEASE: usize = 3;
pub const KNEE: usize = 4;
pub const MAKEUP: usize = 5;

pub static PARAMS: [ParamSpec; 6] = [
    ParamSpec::linear("Threshold", -60.0, 0.0, -18.0).with_unit("dB"),
    ParamSpec::linear("Ratio", 1.0, 20.0, 4.0),
    ParamSpec::logarithmic("Attack", 0.1, 100.0, 10.0).with_unit("ms"),
    ParamSpec::logarithmic("Release", 10.0, 1000.0, 100.0).with_unit("ms"),
    ParamSpec::linear("Knee", 0.0, 12.0, 6.0).with_unit("dB"),
    ParamSpec::linear("Makeup", 0.0, 24.0, 0.0).with_unit("dB"),
];

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(2),
    name: "Classic Compressor",
    category: EngineCategory::Dynamics,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: 0,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Static curve: gain reduction in dB (positive) for a detector level.
#[inline]
pub fn gain_reduction_db(input_db: f32, threshold_db: f32, ratio: f32, knee_db: f32) -> f32 {
    let slope = 1.0 - 1.0 / ratio.max(1.0);
    if knee_db <= 0.0 {
        return (input_db - threshold_db).max(0.0) * slope;
    }
    let half_knee = knee_db / 2.0;
    let below = threshold_db - half_knee;
    if input_db <= below {
        0.0
    } else if input_db >= threshold_db + half_knee {
        (input_db - threshold_db) * slope
    } else {
        let x = input_db - below;
        slope * x * x / (2.0 * knee_db)
    }
}

pub struct Compressor {
    params: Arc<ParamBank>,
    threshold: SmoothParam,
    ratio: SmoothParam,
    attack: SmoothParam,
    release: SmoothParam,
    knee: SmoothParam,
    makeup: SmoothParam,

    sample_rate: f64,
    gain_reduction: f32,
    attack_coeff: f32,
    release_coeff: f32,
    last_attack: f32,
    last_release: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            threshold: params.smoothed(THRESHOLD),
            ratio: params.smoothed(RATIO),
            attack: params.smoothed(ATTACK),
            release: params.smoothed(RELEASE),
            knee: params.smoothed(KNEE),
            makeup: params.smoothed(MAKEUP),
            params,
            sample_rate: 48000.0,
            gain_reduction: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            last_attack: -1.0,
            last_release: -1.0,
        }
    }

    /// Current gain reduction in dB.
    pub fn gain_reduction(&self) -> f32 {
        self.gain_reduction
    }

    #[inline]
    fn update_coefficients(&mut self, attack_ms: f32, release_ms: f32) {
        if (attack_ms - self.last_attack).abs() > 1e-5 {
            self.attack_coeff = one_pole_coefficient(attack_ms * 0.001, self.sample_rate);
            self.last_attack = attack_ms;
        }
        if (release_ms - self.last_release).abs() > 1e-5 {
            self.release_coeff = one_pole_coefficient(release_ms * 0.001, self.sample_rate);
            self.last_release = release_ms;
        }
    }
}

impl Engine for Compressor {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        for smoother in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.knee,
            &mut self.makeup,
        ] {
            smoother.prepare(sample_rate);
        }
        self.last_attack = -1.0;
        self.last_release = -1.0;
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        for i in 0..block.len() {
            let threshold = self.threshold.value();
            let ratio = self.ratio.value();
            let attack = self.attack.value();
            let release = self.release.value();
            let knee = self.knee.value();
            let makeup = self.makeup.value();
            self.update_coefficients(attack, release);

            let (l, r) = block.frame(i);
            let level = gain_to_db(l.abs().max(r.abs()));
            let target = gain_reduction_db(level, threshold, ratio, knee);
            let coeff = if target > self.gain_reduction {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain_reduction = target + (self.gain_reduction - target) * coeff;

            let gain = db_to_gain(makeup - self.gain_reduction);
            block.set_frame(i, l * gain, r * gain);
        }
    }

    fn reset(&mut self) {
        for smoother in [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.knee,
            &mut self.makeup,
        ] {
            smoother.reset();
        }
        self.gain_reduction = 0.0;
    }
}
