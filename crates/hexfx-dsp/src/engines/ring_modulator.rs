//! Platinum Ring Modulator.
//!
//! Signal path per channel:
//!
//! ```text
//!     ┌──────────────────────── 4× ────────────────────────────┐
//! in ─┼► + tanh(fb · feedback) ─► ring multiply ─► SSB shift ─┬─┼► + shimmer ─► DC block ─► out
//!     │        ▲                                              │ │
//!     │        └──── delay ◄── SVF band-pass (resonance) ◄────┘ │
//!     └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The carrier (stretched additive partials, polyBLEP pulse, sub octave) is
//! generated once per oversampled tick and shared by both channels. The
//! feedback loop runs entirely at the high rate. In
//! tracking mode a YIN detector on the mono input drives the carrier
//! frequency through a 50 ms glide.

use crate::primitives::{
    DcBlocker, DelayLine, FrequencyShifter, Oversampler, PitchedDelay, Svf, HILBERT_TAPS,
};
use hexfx_analysis::{SampleHistory, YinDetector};
use hexfx_core::{
    check_prepare_args, one_pole_coefficient, AudioBlock, Engine, EngineCategory,
    EngineDescriptor, EngineId, ParamBank, ParamSpec, Result, SmoothParam,
};
use std::f64::consts::TAU;
use std::sync::Arc;

pub const FREQUENCY: usize = 0;
pub const RING: usize = 1;
pub const SHIFT: usize = 2;
pub const FEEDBACK: usize = 3;
pub const RESONANCE: usize = 4;
pub const HARMONICS: usize = 5;
pub const STRETCH: usize = 6;
pub const PULSE: usize = 7;
pub const PULSE_WIDTH: usize = 8;
pub const SUB: usize = 9;
pub const SHIMMER: usize = 10;
pub const TRACK: usize = 11;
pub const TRACK_RATIO: usize = 12;

pub static PARAMS: [ParamSpec; 13] = [
    ParamSpec::logarithmic("Frequency", 20.0, 5020.0, 440.0).with_unit("Hz"),
    ParamSpec::linear("Ring", 0.0, 1.0, 1.0),
    ParamSpec::linear("Shift", -1000.0, 1000.0, 0.0).with_unit("Hz"),
    ParamSpec::linear("Feedback", 0.0, 0.95, 0.0),
    ParamSpec::linear("Resonance", 0.0, 1.0, 0.0),
    ParamSpec::linear("Harmonics", 0.0, 1.0, 0.0),
    ParamSpec::linear("Stretch", 0.9, 1.1, 1.0),
    ParamSpec::linear("Pulse", 0.0, 1.0, 0.0),
    ParamSpec::linear("Pulse Width", 0.05, 0.95, 0.5),
    ParamSpec::linear("Sub", 0.0, 1.0, 0.0),
    ParamSpec::linear("Shimmer", 0.0, 1.0, 0.0),
    ParamSpec::toggle("Track", false),
    ParamSpec::logarithmic("Track Ratio", 0.25, 4.0, 1.0),
];

const OVERSAMPLING: usize = 4;
/// Hilbert length at the high rate; keeps the same low band edge as the
/// 65-tap design at the base rate.
const SHIFTER_TAPS: usize = OVERSAMPLING * (HILBERT_TAPS - 1) + 1;
/// 4× oversampler round trip plus the Hilbert transformer, in base samples.
pub const LATENCY: usize = 32 + HILBERT_TAPS / 2;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(26),
    name: "Platinum Ring Modulator",
    category: EngineCategory::Modulation,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: LATENCY,
    stateful_on_bypass: true,
    infinite_tail: false,
};

const MAX_PARTIALS: usize = 8;
const FEEDBACK_DELAY_SECS: f64 = 0.020;
const TRACK_FRAME: usize = 2048;
const TRACK_HOP: u32 = 512;
const GLIDE_SECS: f32 = 0.050;
const SHIMMER_WINDOW: usize = 2048;
const SHIMMER_BASE: usize = 64;
const SVF_UPDATE: u32 = 8;

/// Naive-step correction for a discontinuity at phase 0.
#[inline]
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

/// Carrier controls for one base-rate sample.
#[derive(Debug, Clone, Copy)]
struct CarrierShape {
    partials: usize,
    stretch: f64,
    pulse: f32,
    width: f64,
    sub: f32,
}

#[derive(Debug, Clone, Default)]
struct Carrier {
    phases: [f64; MAX_PARTIALS],
    sub_phase: f64,
}

impl Carrier {
    fn reset(&mut self) {
        self.phases = [0.0; MAX_PARTIALS];
        self.sub_phase = 0.0;
    }

    /// One sample at the oversampled rate `rate`.
    #[inline]
    fn next(&mut self, freq: f64, rate: f64, shape: &CarrierShape) -> f32 {
        let nyquist_guard = 0.45 * rate;
        let mut additive = 0.0;
        let mut norm = 0.0;
        let mut partial_freq = freq;
        for h in 0..shape.partials {
            let harmonic = (h + 1) as f64;
            if h > 0 {
                partial_freq = freq * harmonic * shape.stretch.powi(h as i32);
            }
            let phase = &mut self.phases[h];
            if partial_freq < nyquist_guard {
                additive += (TAU * *phase).sin() / harmonic;
                norm += 1.0 / harmonic;
            }
            *phase += partial_freq / rate;
            *phase -= phase.floor();
        }
        let additive = if norm > 0.0 { additive / norm } else { 0.0 };

        let t = self.phases[0];
        let dt = (freq / rate).min(0.5);
        let mut pulse = if t < shape.width { 1.0 } else { -1.0 };
        pulse += poly_blep(t, dt);
        pulse -= poly_blep((t - shape.width).rem_euclid(1.0), dt);

        let sub = (TAU * self.sub_phase).sin();
        self.sub_phase += 0.5 * freq / rate;
        self.sub_phase -= self.sub_phase.floor();

        let body = additive as f32 + (pulse as f32 - additive as f32) * shape.pulse;
        (body + sub as f32 * shape.sub) / (1.0 + shape.sub)
    }
}

#[derive(Debug, Clone)]
struct Channel {
    oversampler: Oversampler,
    shifter: FrequencyShifter,
    feedback: DelayLine,
    resonator: Svf,
    shimmer: PitchedDelay,
    dc: DcBlocker,
}

/// Feedback delay in high-rate samples.
fn feedback_delay_at(sample_rate: f64) -> usize {
    ((FEEDBACK_DELAY_SECS * sample_rate * OVERSAMPLING as f64) as usize).max(1)
}

impl Channel {
    fn new() -> Self {
        Self {
            oversampler: Oversampler::x4(),
            shifter: FrequencyShifter::with_taps(SHIFTER_TAPS),
            feedback: DelayLine::new(feedback_delay_at(48000.0)),
            resonator: Svf::default(),
            shimmer: PitchedDelay::new(SHIMMER_BASE, SHIMMER_WINDOW),
            dc: DcBlocker::default(),
        }
    }

    fn reset(&mut self) {
        self.oversampler.reset();
        self.shifter.reset();
        self.feedback.reset();
        self.resonator.reset();
        self.shimmer.reset();
        self.dc.reset();
    }
}

/// YIN-based carrier tracking on the mono input.
#[derive(Debug)]
struct Tracker {
    history: SampleHistory,
    yin: YinDetector,
    frame: Vec<f32>,
    counter: u32,
    frequency: Option<f32>,
}

impl Tracker {
    fn new(sample_rate: f64) -> Self {
        Self {
            history: SampleHistory::new(TRACK_FRAME),
            yin: YinDetector::new(sample_rate, TRACK_FRAME),
            frame: vec![0.0; TRACK_FRAME],
            counter: 0,
            frequency: None,
        }
    }

    fn reset(&mut self) {
        self.history.reset();
        self.frame.fill(0.0);
        self.counter = 0;
        self.frequency = None;
    }

    #[inline]
    fn push(&mut self, x: f32) {
        self.history.push(x);
        self.counter += 1;
        if self.counter >= TRACK_HOP {
            self.counter = 0;
            self.history.copy_latest(&mut self.frame);
            let pitch = self.yin.detect(&self.frame);
            if pitch.is_voiced() {
                self.frequency = Some(pitch.frequency);
            }
        }
    }
}

pub struct RingModulator {
    params: Arc<ParamBank>,
    frequency: SmoothParam,
    ring: SmoothParam,
    shift: SmoothParam,
    feedback: SmoothParam,
    resonance: SmoothParam,
    harmonics: SmoothParam,
    stretch: SmoothParam,
    pulse: SmoothParam,
    pulse_width: SmoothParam,
    sub: SmoothParam,
    shimmer: SmoothParam,
    track_ratio: SmoothParam,

    sample_rate: f64,
    glide: f32,
    carrier_hz: f32,
    carrier: Carrier,
    tracker: Tracker,
    feedback_delay: usize,
    svf_counter: u32,
    channels: [Channel; 2],
}

impl Default for RingModulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RingModulator {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            frequency: params.smoothed(FREQUENCY),
            ring: params.smoothed(RING),
            shift: params.smoothed(SHIFT),
            feedback: params.smoothed(FEEDBACK),
            resonance: params.smoothed(RESONANCE),
            harmonics: params.smoothed(HARMONICS),
            stretch: params.smoothed(STRETCH),
            pulse: params.smoothed(PULSE),
            pulse_width: params.smoothed(PULSE_WIDTH),
            sub: params.smoothed(SUB),
            shimmer: params.smoothed(SHIMMER),
            track_ratio: params.smoothed(TRACK_RATIO),
            sample_rate: 48000.0,
            glide: one_pole_coefficient(GLIDE_SECS, 48000.0),
            carrier_hz: PARAMS[FREQUENCY].default,
            carrier: Carrier::default(),
            tracker: Tracker::new(48000.0),
            feedback_delay: feedback_delay_at(48000.0),
            svf_counter: 0,
            channels: [Channel::new(), Channel::new()],
            params,
        }
    }

    /// Current carrier frequency after tracking and glide.
    pub fn carrier_frequency(&self) -> f32 {
        self.carrier_hz
    }

    fn smoothers(&mut self) -> [&mut SmoothParam; 12] {
        [
            &mut self.frequency,
            &mut self.ring,
            &mut self.shift,
            &mut self.feedback,
            &mut self.resonance,
            &mut self.harmonics,
            &mut self.stretch,
            &mut self.pulse,
            &mut self.pulse_width,
            &mut self.sub,
            &mut self.shimmer,
            &mut self.track_ratio,
        ]
    }
}

impl Engine for RingModulator {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        self.glide = one_pole_coefficient(GLIDE_SECS, sample_rate);
        self.tracker = Tracker::new(sample_rate);
        self.feedback_delay = feedback_delay_at(sample_rate);
        for smoother in self.smoothers() {
            smoother.prepare(sample_rate);
        }
        for ch in &mut self.channels {
            if ch.feedback.max_delay() < self.feedback_delay {
                ch.feedback = DelayLine::new(self.feedback_delay);
            }
            ch.dc.prepare(sample_rate);
        }
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let tracking = self.params.toggle(TRACK);
        let rate = self.sample_rate * OVERSAMPLING as f64;
        let delay = self.feedback_delay;
        let active = block.num_channels().min(2);

        for i in 0..block.len() {
            let base_hz = self.frequency.value();
            let ring = self.ring.value();
            let shift = self.shift.value();
            let feedback = self.feedback.value();
            let resonance = self.resonance.value();
            let shape = CarrierShape {
                partials: 1 + (self.harmonics.value() * (MAX_PARTIALS - 1) as f32).round() as usize,
                stretch: self.stretch.value() as f64,
                pulse: self.pulse.value(),
                width: self.pulse_width.value() as f64,
                sub: self.sub.value(),
            };
            let shimmer = self.shimmer.value();
            let track_ratio = self.track_ratio.value();

            let (l, r) = block.frame(i);
            let mut frame = [l, r];

            let target = if tracking {
                self.tracker.push(if active == 2 { 0.5 * (l + r) } else { l });
                self.tracker
                    .frequency
                    .map_or(base_hz, |f| (f * track_ratio).clamp(20.0, 5020.0))
            } else {
                base_hz
            };
            self.carrier_hz = target + (self.carrier_hz - target) * self.glide;

            let mut carrier = [0.0f32; OVERSAMPLING];
            for c in &mut carrier {
                *c = self.carrier.next(self.carrier_hz as f64, rate, &shape);
            }

            let update_svf = self.svf_counter == 0;
            self.svf_counter = (self.svf_counter + 1) % SVF_UPDATE;
            let q = 0.5 + 19.5 * resonance;

            for (ch, sample) in frame.iter_mut().enumerate().take(active) {
                let Channel {
                    oversampler,
                    shifter,
                    feedback: line,
                    resonator,
                    shimmer: sparkle,
                    dc,
                } = &mut self.channels[ch];
                if update_svf {
                    resonator.set(self.carrier_hz, q, rate);
                }

                let shifted = oversampler.process(*sample, |j, x| {
                    let tap = line.read(delay);
                    let band = resonator.process(tap).band_norm;
                    let fed = tap * (1.0 - resonance) + band * resonance;
                    let driven = x + (feedback * fed).tanh();
                    let modulated = driven * ((1.0 - ring) + ring * carrier[j]);
                    let y = shifter.process(modulated, shift, rate);
                    line.push(y);
                    y
                });

                let tail = sparkle.process(shifted, 2.0);
                *sample = dc.process(shifted + shimmer * tail);
            }

            if active == 2 {
                block.set_frame(i, frame[0], frame[1]);
            } else {
                block.channel_mut(0)[i] = frame[0];
            }
        }
    }

    fn reset(&mut self) {
        for smoother in self.smoothers() {
            smoother.reset();
        }
        self.carrier.reset();
        self.tracker.reset();
        self.carrier_hz = self.params.physical(FREQUENCY);
        self.svf_counter = 0;
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}
