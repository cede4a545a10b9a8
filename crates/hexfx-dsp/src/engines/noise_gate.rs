//! Noise Gate: broadband gate with hold and a floor.

use hexfx_core::{
    check_prepare_args, db_to_gain, gain_to_db, one_pole_coefficient, AudioBlock, Engine,
    EngineCategory, EngineDescriptor, EngineId, ParamBank, ParamSpec, Result, SmoothParam,
};
use std::sync::Arc;

pub const THRESHOLD: usize = 0;
pub const ATTACK: usize = 1;
pub const HOLD: usize = 2;
pub const RELEASE: usize = 3;
pub const RANGE: usize = 4;

pub static PARAMS: [ParamSpec; 5] = [
    ParamSpec::linear("Threshold", -80.0, 0.0, -50.0).with_unit("dB"),
    ParamSpec::logarithmic("Attack", 0.1, 50.0, 1.0).with_unit("ms"),
    ParamSpec::linear("Hold", 0.0, 500.0, 20.0).with_unit("ms"),
    ParamSpec::logarithmic("Release", 5.0, 1000.0, 100.0).with_unit("ms"),
    ParamSpec::linear("Range", -80.0, 0.0, -80.0).with_unit("dB"),
];

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(4),
    name: "Noise Gate",
    category: EngineCategory::Dynamics,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: 0,
    stateful_on_bypass: false,
    infinite_tail: false,
};

pub struct NoiseGate {
    params: Arc<ParamBank>,
    threshold: SmoothParam,
    attack: SmoothParam,
    hold: SmoothParam,
    release: SmoothParam,
    range: SmoothParam,

    sample_rate: f64,
    gate_level: f32,
    hold_counter: usize,
    attack_coeff: f32,
    release_coeff: f32,
    last_attack: f32,
    last_release: f32,
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseGate {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            threshold: params.smoothed(THRESHOLD),
            attack: params.smoothed(ATTACK),
            hold: params.smoothed(HOLD),
            release: params.smoothed(RELEASE),
            range: params.smoothed(RANGE),
            params,
            sample_rate: 48000.0,
            gate_level: 0.0,
            hold_counter: 0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            last_attack: -1.0,
            last_release: -1.0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.gate_level > 0.5
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

impl Engine for NoiseGate {
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
            &mut self.attack,
            &mut self.hold,
            &mut self.release,
            &mut self.range,
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
            let attack = self.attack.value();
            let hold_ms = self.hold.value();
            let release = self.release.value();
            let floor = db_to_gain(self.range.value());
            self.update_coefficients(attack, release);

            let (l, r) = block.frame(i);
            let level = gain_to_db(l.abs().max(r.abs()));
            if level >= threshold {
                self.hold_counter = (hold_ms as f64 * 0.001 * self.sample_rate) as usize;
                self.gate_level = 1.0 + (self.gate_level - 1.0) * self.attack_coeff;
            } else if self.hold_counter > 0 {
                self.hold_counter -= 1;
            } else {
                self.gate_level *= self.release_coeff;
            }

            let gain = floor + self.gate_level * (1.0 - floor);
            block.set_frame(i, l * gain, r * gain);
        }
    }

    fn reset(&mut self) {
        for smoother in [
            &mut self.threshold,
            &mut self.attack,
            &mut self.hold,
            &mut self.release,
            &mut self.range,
        ] {
            smoother.reset();
        }
        self.gate_level = 0.0;
        self.hold_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(gate: &mut NoiseGate, buf: &mut [f32]) {
        for chunk in buf.chunks_mut(128) {
            gate.process(&mut AudioBlock::mono(chunk));
        }
    }

    #[test]
    fn test_gate_opens_on_signal() {
        let mut gate = NoiseGate::new();
        gate.prepare(48000.0, 128).unwrap();
        let mut buf = vec![0.5f32; 4800];
        run(&mut gate, &mut buf);
        assert!(gate.is_open());
        assert!((buf[4799] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_gate_closes_after_hold() {
        let mut gate = NoiseGate::new();
        gate.prepare(48000.0, 128).unwrap();
        let mut loud = vec![0.5f32; 4800];
        run(&mut gate, &mut loud);

        // 10 ms into the 20 ms hold the gate is still fully open.
        let mut quiet = vec![1e-4f32; 480];
        run(&mut gate, &mut quiet);
        assert!((quiet[479] - 1e-4).abs() < 1e-6);

        let mut tail = vec![1e-4f32; 48000];
        run(&mut gate, &mut tail);
        assert!(!gate.is_open());
        assert!(tail[47999] < 1e-6);
    }
}
