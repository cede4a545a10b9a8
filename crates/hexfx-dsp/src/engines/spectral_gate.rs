//! Spectral Gate: per-bin downward expander in the STFT domain.
//!
//! Each bin keeps its own envelope follower and open/closed state with 3 dB
//! of hysteresis. Closed bins are attenuated by at least `1/ratio`, deeper
//! the further the envelope sits below threshold. Bins outside the detection
//! band pass at unity. A 3-point median across bins removes isolated
//! open/closed outliers (musical noise).
//!
//! Lookahead is implemented by always delaying the resynthesized spectra by
//! [`LOOKAHEAD_FRAMES`] hops and pairing each delayed frame with gains from
//! a later frame, so the reported latency does not move with the parameter.

use crate::primitives::{DelayLine, Stft};
use hexfx_analysis::median3;
use hexfx_core::{
    check_prepare_args, db_to_gain, gain_to_db, AudioBlock, Engine, EngineCategory,
    EngineDescriptor, EngineId, ParamBank, ParamSpec, Result, SmoothParam,
};
use rustfft::num_complex::Complex;
use std::sync::Arc;

pub const THRESHOLD: usize = 0;
pub const RATIO: usize = 1;
pub const ATTACK: usize = 2;
pub const RELEASE: usize = 3;
pub const FREQ_LOW: usize = 4;
pub const FREQ_HIGH: usize = 5;
pub const LOOKAHEAD: usize = 6;
pub const MIX: usize = 7;

pub static PARAMS: [ParamSpec; 8] = [
    ParamSpec::linear("Threshold", -80.0, 0.0, -30.0).with_unit("dB"),
    ParamSpec::linear("Ratio", 1.0, 20.0, 10.0),
    ParamSpec::logarithmic("Attack", 0.1, 50.0, 5.0).with_unit("ms"),
    ParamSpec::logarithmic("Release", 1.0, 500.0, 100.0).with_unit("ms"),
    ParamSpec::logarithmic("Freq Low", 20.0, 20000.0, 20.0).with_unit("Hz"),
    ParamSpec::logarithmic("Freq High", 20.0, 20000.0, 20000.0).with_unit("Hz"),
    ParamSpec::linear("Lookahead", 0.0, 20.0, 0.0).with_unit("ms"),
    ParamSpec::linear("Mix", 0.0, 1.0, 1.0),
];

pub const FFT_SIZE: usize = 1024;
pub const OVERSAMPLING: usize = 4;
pub const HOP: usize = FFT_SIZE / OVERSAMPLING;
pub const LOOKAHEAD_FRAMES: usize = 4;
/// STFT frame plus the full lookahead reserve.
pub const LATENCY: usize = FFT_SIZE + LOOKAHEAD_FRAMES * HOP;

const HYSTERESIS_DB: f32 = 3.0;
const FLOOR_DB: f32 = -120.0;
const RING: usize = LOOKAHEAD_FRAMES + 1;

/// Reports [`LATENCY`] (2048 samples) for every lookahead setting, 0 ms
/// included.
pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(48),
    name: "Spectral Gate",
    category: EngineCategory::Spectral,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: LATENCY,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Gain of a closed bin: downward expansion below threshold, never above
/// `1/ratio`.
#[inline]
pub fn closed_gain(envelope_db: f32, threshold_db: f32, ratio: f32) -> f32 {
    let ratio = ratio.max(1.0);
    let expansion = (envelope_db - threshold_db).min(0.0) * (1.0 - 1.0 / ratio);
    db_to_gain(expansion.max(FLOOR_DB)).min(1.0 / ratio)
}

/// Per-frame control values, read once per hop.
#[derive(Debug, Clone, Copy)]
struct FrameControl {
    threshold: f32,
    close_below: f32,
    threshold_db: f32,
    ratio: f32,
    attack: f32,
    release: f32,
    low_bin: usize,
    high_bin: usize,
    lookahead: usize,
}

#[derive(Debug)]
struct GateChannel {
    stft: Stft,
    spectra: Vec<Vec<Complex<f32>>>,
    gains: Vec<Vec<f32>>,
    head: usize,
    envelope: Vec<f32>,
    open: Vec<bool>,
    raw_gain: Vec<f32>,
    dry: DelayLine,
}

impl GateChannel {
    fn new() -> Self {
        let stft = Stft::new(FFT_SIZE, OVERSAMPLING);
        let bins = stft.bins();
        Self {
            stft,
            spectra: vec![vec![Complex::default(); bins]; RING],
            gains: vec![vec![1.0; bins]; RING],
            head: 0,
            envelope: vec![0.0; bins],
            open: vec![false; bins],
            raw_gain: vec![1.0; bins],
            dry: DelayLine::new(LATENCY),
        }
    }

    fn reset(&mut self) {
        self.stft.reset();
        for frame in &mut self.spectra {
            frame.fill(Complex::default());
        }
        for frame in &mut self.gains {
            frame.fill(1.0);
        }
        self.head = 0;
        self.envelope.fill(0.0);
        self.open.fill(false);
        self.raw_gain.fill(1.0);
        self.dry.reset();
    }

    #[inline]
    fn tick(&mut self, input: f32, mix: f32, control: impl FnOnce() -> FrameControl) -> f32 {
        self.dry.push(input);
        let (wet, due) = self.stft.push(input);
        if due {
            self.frame(control());
        }
        let dry = self.dry.read(LATENCY);
        dry + (wet - dry) * mix
    }

    fn frame(&mut self, ctl: FrameControl) {
        let scale = 2.0 / self.stft.window_sum();
        self.head = (self.head + 1) % RING;
        let head = self.head;

        let spectrum = self.stft.analyze();
        self.spectra[head].copy_from_slice(spectrum);

        // Detection on the newest frame.
        let bins = self.envelope.len();
        for k in 0..bins {
            let magnitude = self.spectra[head][k].norm() * scale;
            let env = &mut self.envelope[k];
            let coeff = if magnitude > *env { ctl.attack } else { ctl.release };
            *env = magnitude + (*env - magnitude) * coeff;

            if k < ctl.low_bin || k > ctl.high_bin {
                self.raw_gain[k] = 1.0;
                continue;
            }
            let open = &mut self.open[k];
            if *env > ctl.threshold {
                *open = true;
            } else if *env < ctl.close_below {
                *open = false;
            }
            self.raw_gain[k] = if *open {
                1.0
            } else {
                closed_gain(gain_to_db(*env), ctl.threshold_db, ctl.ratio)
            };
        }

        let gains = &mut self.gains[head];
        gains[0] = self.raw_gain[0];
        gains[bins - 1] = self.raw_gain[bins - 1];
        for k in 1..bins - 1 {
            gains[k] = median3(self.raw_gain[k - 1], self.raw_gain[k], self.raw_gain[k + 1]);
        }

        // Resynthesize the oldest frame with gains from `lookahead` frames later.
        let oldest = (head + 1) % RING;
        let gain_frame = (oldest + ctl.lookahead) % RING;
        let out = self.stft.spectrum_mut();
        for ((bin, &src), &g) in out
            .iter_mut()
            .zip(&self.spectra[oldest])
            .zip(&self.gains[gain_frame])
        {
            *bin = src * g;
        }
        self.stft.synthesize();
    }
}

pub struct SpectralGate {
    params: Arc<ParamBank>,
    threshold: SmoothParam,
    ratio: SmoothParam,
    attack: SmoothParam,
    release: SmoothParam,
    freq_low: SmoothParam,
    freq_high: SmoothParam,
    lookahead: SmoothParam,
    mix: SmoothParam,
    sample_rate: f64,
    channels: [GateChannel; 2],
}

impl Default for SpectralGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralGate {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            threshold: params.smoothed(THRESHOLD),
            ratio: params.smoothed(RATIO),
            attack: params.smoothed(ATTACK),
            release: params.smoothed(RELEASE),
            freq_low: params.smoothed(FREQ_LOW),
            freq_high: params.smoothed(FREQ_HIGH),
            lookahead: params.smoothed(LOOKAHEAD),
            mix: params.smoothed(MIX),
            params,
            sample_rate: 48000.0,
            channels: [GateChannel::new(), GateChannel::new()],
        }
    }

    fn smoothers(&mut self) -> [&mut SmoothParam; 7] {
        [
            &mut self.threshold,
            &mut self.ratio,
            &mut self.attack,
            &mut self.release,
            &mut self.freq_low,
            &mut self.freq_high,
            &mut self.lookahead,
        ]
    }
}

/// Physical values of the smoothed controls at one sample.
#[derive(Debug, Clone, Copy)]
struct Controls {
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    freq_low: f32,
    freq_high: f32,
    lookahead_ms: f32,
}

impl Controls {
    fn frame(&self, sample_rate: f64) -> FrameControl {
        let frame_secs = HOP as f64 / sample_rate;
        let coeff = |ms: f32| (-frame_secs / (ms as f64 * 0.001).max(1e-6)).exp() as f32;
        let bin_hz = sample_rate / FFT_SIZE as f64;
        let (lo, hi) = if self.freq_low <= self.freq_high {
            (self.freq_low, self.freq_high)
        } else {
            (self.freq_high, self.freq_low)
        };
        let lookahead = (self.lookahead_ms as f64 * 0.001 * sample_rate / HOP as f64).round();

        FrameControl {
            threshold: db_to_gain(self.threshold_db),
            close_below: db_to_gain(self.threshold_db - HYSTERESIS_DB),
            threshold_db: self.threshold_db,
            ratio: self.ratio,
            attack: coeff(self.attack_ms),
            release: coeff(self.release_ms),
            low_bin: (lo as f64 / bin_hz).ceil() as usize,
            high_bin: (hi as f64 / bin_hz).floor() as usize,
            lookahead: (lookahead as usize).min(LOOKAHEAD_FRAMES),
        }
    }
}

impl Engine for SpectralGate {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        for smoother in self.smoothers() {
            smoother.prepare(sample_rate);
        }
        self.mix.prepare(sample_rate);
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let sample_rate = self.sample_rate;
        let active = block.num_channels().min(2);
        for i in 0..block.len() {
            let controls = Controls {
                threshold_db: self.threshold.value(),
                ratio: self.ratio.value(),
                attack_ms: self.attack.value(),
                release_ms: self.release.value(),
                freq_low: self.freq_low.value(),
                freq_high: self.freq_high.value(),
                lookahead_ms: self.lookahead.value(),
            };
            let mix = self.mix.value();

            let (l, r) = block.frame(i);
            let mut frame = [l, r];
            for (ch, sample) in frame.iter_mut().enumerate().take(active) {
                *sample = self.channels[ch].tick(*sample, mix, || controls.frame(sample_rate));
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
        self.mix.reset();
        for ch in &mut self.channels {
            ch.reset();
        }
    }
}
