//! Frequency Shifter: single-sideband shift with feedback.

use crate::primitives::{DelayLine, FrequencyShifter as Shifter, HILBERT_TAPS};
use hexfx_core::{
    check_prepare_args, AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId,
    ParamBank, ParamSpec, Result, SmoothParam,
};
use std::sync::Arc;

pub const SHIFT: usize = 0;
pub const FEEDBACK: usize = 1;
pub const MIX: usize = 2;

pub static PARAMS: [ParamSpec; 3] = [
    ParamSpec::linear("Shift", -1000.0, 1000.0, 0.0).with_unit("Hz"),
    ParamSpec::linear("Feedback", 0.0, 0.9, 0.0),
    ParamSpec::linear("Mix", 0.0, 1.0, 1.0),
];

pub const LATENCY: usize = HILBERT_TAPS / 2;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(27),
    name: "Frequency Shifter",
    category: EngineCategory::Modulation,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: LATENCY,
    stateful_on_bypass: false,
    infinite_tail: false,
};

#[derive(Debug, Clone)]
struct Channel {
    shifter: Shifter,
    dry: DelayLine,
    last: f32,
}

impl Channel {
    fn new() -> Self {
        Self {
            shifter: Shifter::new(),
            dry: DelayLine::new(LATENCY),
            last: 0.0,
        }
    }

    fn reset(&mut self) {
        self.shifter.reset();
        self.dry.reset();
        self.last = 0.0;
    }
}

pub struct FrequencyShifter {
    params: Arc<ParamBank>,
    shift: SmoothParam,
    feedback: SmoothParam,
    mix: SmoothParam,
    sample_rate: f64,
    channels: [Channel; 2],
}

impl Default for FrequencyShifter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyShifter {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            shift: params.smoothed(SHIFT),
            feedback: params.smoothed(FEEDBACK),
            mix: params.smoothed(MIX),
            params,
            sample_rate: 48000.0,
            channels: [Channel::new(), Channel::new()],
        }
    }
}

impl Engine for FrequencyShifter {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        self.shift.prepare(sample_rate);
        self.feedback.prepare(sample_rate);
        self.mix.prepare(sample_rate);
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let active = block.num_channels().min(2);
        for i in 0..block.len() {
            let shift = self.shift.value();
            let feedback = self.feedback.value();
            let mix = self.mix.value();

            let (l, r) = block.frame(i);
            let mut frame = [l, r];
            for (ch, sample) in frame.iter_mut().enumerate().take(active) {
                let state = &mut self.channels[ch];
                let input = *sample + (feedback * state.last).tanh();
                let wet = state.shifter.process(input, shift, self.sample_rate);
                state.last = wet;
                state.dry.push(*sample);
                let dry = state.dry.read(LATENCY);
                *sample = dry + (wet - dry) * mix;
            }
            if active == 2 {
                block.set_frame(i, frame[0], frame[1]);
            } else {
                block.channel_mut(0)[i] = frame[0];
            }
        }
    }

    fn reset(&mut self) {
        self.shift.reset();
        self.feedback.reset();
        self.mix.reset();
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_zero_shift_is_pure_delay() {
        let mut engine = FrequencyShifter::new();
        engine.prepare(48000.0, 256).unwrap();
        let input: Vec<f32> = (0..2048)
            .map(|n| 0.5 * (2.0 * PI * 3000.0 * n as f32 / 48000.0).sin())
            .collect();
        let mut buf = input.clone();
        for chunk in buf.chunks_mut(256) {
            engine.process(&mut AudioBlock::mono(chunk));
        }
        for n in 512..2048 {
            assert!((buf[n] - input[n - LATENCY]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_shift_moves_tone() {
        let mut engine = FrequencyShifter::new();
        engine.params().set(SHIFT, PARAMS[SHIFT].normalize(500.0));
        engine.prepare(48000.0, 480).unwrap();
        let mut buf: Vec<f32> = (0..48000)
            .map(|n| 0.5 * (2.0 * PI * 6000.0 * n as f32 / 48000.0).sin())
            .collect();
        for chunk in buf.chunks_mut(480) {
            engine.process(&mut AudioBlock::mono(chunk));
        }
        // Count zero crossings over the last half second: 6.5 kHz expected.
        let tail = &buf[24000..];
        let crossings = tail.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((crossings as i32 - 3250).abs() < 30, "{}", crossings);
    }
}
