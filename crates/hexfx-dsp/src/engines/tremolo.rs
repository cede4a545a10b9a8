//! Classic Tremolo: LFO amplitude modulation with four analog-flavoured modes.
//!
//! Classic AM runs at the base rate. The nonlinear modes (vintage bias,
//! modern crossover, tube) run inside a 2× oversampler; the classic path is
//! delayed by the same amount so every mode reports the same latency.

use crate::primitives::{DcBlocker, DelayLine, Drift, Oversampler, Xorshift};
use hexfx_core::{
    check_prepare_args, AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId,
    ParamBank, ParamSpec, Result, SmoothParam,
};
use std::f64::consts::TAU;
use std::sync::Arc;

pub const RATE: usize = 0;
pub const DEPTH: usize = 1;
pub const SHAPE: usize = 2;
pub const STEREO_PHASE: usize = 3;
pub const VOLUME: usize = 4;
pub const MODE: usize = 5;

pub static PARAMS: [ParamSpec; 6] = [
    ParamSpec::linear("Rate", 0.1, 20.0, 5.075).with_unit("Hz"),
    ParamSpec::linear("Depth", 0.0, 1.0, 0.5),
    ParamSpec::linear("Shape", 0.0, 1.0, 0.0),
    ParamSpec::linear("Stereo Phase", 0.0, 180.0, 0.0).with_unit("deg"),
    ParamSpec::linear("Volume", 0.0, 1.0, 1.0),
    ParamSpec::choice("Mode", 4, 0.0),
];

/// Round-trip delay of the 2× oversampler.
pub const LATENCY: usize = 24;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(29),
    name: "Classic Tremolo",
    category: EngineCategory::Modulation,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: LATENCY,
    stateful_on_bypass: false,
    infinite_tail: false,
};

const AGING_STEP: f32 = 8.0e-5;
const AGING_INTERVAL_SECS: f64 = 6.0;
const THERMAL_LIMIT: f32 = 0.02;
const CLIP_KNEE: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TremoloMode {
    Classic,
    Vintage,
    Modern,
    Tube,
}

impl TremoloMode {
    fn from_index(index: usize) -> Self {
        match index {
            1 => Self::Vintage,
            2 => Self::Modern,
            3 => Self::Tube,
            _ => Self::Classic,
        }
    }
}

/// Sine → triangle → smooth pulse morph, bipolar, all peaking at phase 0.25.
#[inline]
pub fn lfo_waveform(phase: f64, shape: f32) -> f32 {
    let sine = (TAU * phase).sin() as f32;
    let p = phase as f32;
    let triangle = if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    };
    let x = (sine * 4.0).clamp(-1.0, 1.0);
    let pulse = x * (3.0 - x * x) * 0.5;

    if shape < 0.5 {
        let t = shape * 2.0;
        sine + (triangle - sine) * t
    } else {
        let t = (shape - 0.5) * 2.0;
        triangle + (pulse - triangle) * t
    }
}

#[derive(Debug, Clone)]
struct Channel {
    dc_in: DcBlocker,
    dc_out: DcBlocker,
    oversampler: Oversampler,
    align: DelayLine,
}

impl Channel {
    fn new() -> Self {
        Self {
            dc_in: DcBlocker::default(),
            dc_out: DcBlocker::default(),
            oversampler: Oversampler::x2(),
            align: DelayLine::new(LATENCY),
        }
    }

    fn prepare(&mut self, sample_rate: f64) {
        self.dc_in.prepare(sample_rate);
        self.dc_out.prepare(sample_rate);
        self.reset();
    }

    fn reset(&mut self) {
        self.dc_in.reset();
        self.dc_out.reset();
        self.oversampler.reset();
        self.align.reset();
    }
}

pub struct Tremolo {
    params: Arc<ParamBank>,
    rate: SmoothParam,
    depth: SmoothParam,
    shape: SmoothParam,
    stereo_phase: SmoothParam,
    volume: SmoothParam,

    sample_rate: f64,
    phase: f64,
    thermal: Drift,
    aging_noise: Xorshift,
    aging: f32,
    aging_counter: u64,
    aging_interval: u64,
    channels: [Channel; 2],
}

impl Default for Tremolo {
    fn default() -> Self {
        Self::new()
    }
}

impl Tremolo {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            rate: params.smoothed(RATE),
            depth: params.smoothed(DEPTH),
            shape: params.smoothed(SHAPE),
            stereo_phase: params.smoothed(STEREO_PHASE),
            volume: params.smoothed(VOLUME),
            params,
            sample_rate: 48000.0,
            phase: 0.0,
            thermal: Drift::new(0x7E30_1A5E, 5.0e-5, 1.0e-4, THERMAL_LIMIT),
            aging_noise: Xorshift::new(0xA61_4E55),
            aging: 0.0,
            aging_counter: 0,
            aging_interval: (AGING_INTERVAL_SECS * 48000.0) as u64,
            channels: [Channel::new(), Channel::new()],
        }
    }

    /// Component aging in [0, 1].
    pub fn aging(&self) -> f32 {
        self.aging
    }

    #[inline]
    fn advance_aging(&mut self) {
        self.aging_counter += 1;
        if self.aging_counter >= self.aging_interval {
            self.aging_counter = 0;
            self.aging = (self.aging + AGING_STEP).min(1.0);
        }
    }

    /// Nonlinear stage for one oversampled subsample.
    #[inline]
    fn shape_sample(mode: TremoloMode, x: f32, m: f32, depth: f32, aging: f32) -> f32 {
        let u = 0.5 * (m + 1.0);
        match mode {
            TremoloMode::Classic => x * (1.0 - depth * 0.5 * (1.0 - m)),
            TremoloMode::Vintage => {
                let bias = 0.5 + (u - 0.5) * depth;
                x * bias + (x * 0.5).tanh() * (1.0 - bias)
            }
            TremoloMode::Modern => {
                let magnitude = x.abs();
                let crossed = if magnitude < 0.1 { x * magnitude / 0.1 } else { x };
                crossed * (1.0 - depth * 0.5 * (1.0 - m))
            }
            TremoloMode::Tube => {
                let bias = 1.0 - depth * (1.0 - u);
                let drive = ((bias + u * 0.3) * (1.0 + aging * 0.5) * 2.0).max(1.0e-3);
                (x * drive).tanh() / drive.max(1.0)
            }
        }
    }
}

impl Engine for Tremolo {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        self.aging_interval = (AGING_INTERVAL_SECS * sample_rate) as u64;
        for smoother in [
            &mut self.rate,
            &mut self.depth,
            &mut self.shape,
            &mut self.stereo_phase,
            &mut self.volume,
        ] {
            smoother.prepare(sample_rate);
        }
        for ch in &mut self.channels {
            ch.prepare(sample_rate);
        }
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let mode = TremoloMode::from_index(self.params.choice(MODE));
        let stereo = block.is_stereo();
        let inv_sr = 1.0 / self.sample_rate;

        for i in 0..block.len() {
            let rate = self.rate.value();
            let depth_target = self.depth.value();
            let shape = self.shape.value();
            let stereo_deg = self.stereo_phase.value();
            let volume = self.volume.value();

            let thermal = self.thermal.next();
            self.advance_aging();
            let aging = self.aging;

            let rate_eff = rate as f64 * (1.0 + thermal as f64);
            let depth = (depth_target * (1.0 + thermal)).clamp(0.0, 1.0);
            let offset = stereo_deg as f64 / 360.0 * (1.0 + thermal as f64);

            let noise = self.aging_noise.next_bipolar() * aging * (rate / 20.0) * 0.05;
            let phases = [self.phase, (self.phase + offset).fract()];
            let out_gain = volume * (1.0 - aging * 0.05);

            let (l, r) = block.frame(i);
            let mut outs = [l, r];
            let active = if stereo { 2 } else { 1 };

            for (ch, out) in outs.iter_mut().enumerate().take(active) {
                let m = (lfo_waveform(phases[ch], shape) + noise).clamp(-1.0, 1.0);
                let state = &mut self.channels[ch];
                let x = state.dc_in.process(*out);

                let shaped = match mode {
                    TremoloMode::Classic => {
                        // Delayed to match the oversampled modes.
                        state.align.push(Self::shape_sample(mode, x, m, depth, aging));
                        state.align.read(LATENCY)
                    }
                    _ => state
                        .oversampler
                        .process(x, |_, s| Self::shape_sample(mode, s, m, depth, aging)),
                };

                let mut y = shaped * out_gain;
                let magnitude = y.abs();
                if magnitude > CLIP_KNEE {
                    let drive = 1.0 + aging;
                    let over = (magnitude - CLIP_KNEE) * drive / (1.0 - CLIP_KNEE);
                    y = (CLIP_KNEE + (1.0 - CLIP_KNEE) * over.tanh()).copysign(y);
                }
                *out = state.dc_out.process(y);
            }

            if stereo {
                block.set_frame(i, outs[0], outs[1]);
            } else {
                block.channel_mut(0)[i] = outs[0];
            }

            self.phase += rate_eff * inv_sr;
            self.phase -= self.phase.floor();
        }
    }

    fn reset(&mut self) {
        for smoother in [
            &mut self.rate,
            &mut self.depth,
            &mut self.shape,
            &mut self.stereo_phase,
            &mut self.volume,
        ] {
            smoother.reset();
        }
        self.phase = 0.0;
        self.thermal.reset();
        self.aging_noise.reset();
        self.aging = 0.0;
        self.aging_counter = 0;
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}
