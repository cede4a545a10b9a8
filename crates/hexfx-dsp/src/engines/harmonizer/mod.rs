//! Intelligent Harmonizer: up to three pitched voices from a monophonic
//! source.
//!
//! Every voice gets a ratio from the chord/scale/root quantizer and picks a
//! rendering algorithm from the ratio classifier:
//!
//! - unity ratios read the dry delay line,
//! - simple rational ratios use TD-PSOLA (formant preserving),
//! - equal-tempered and otherwise awkward ratios use a resampling voice.
//!
//! All three paths share one latency, so algorithm switches only need a
//! short crossfade. Pitch detection (YIN) and pitch marks run on the mono
//! sum and are shared by every voice.

mod classifier;
mod psola;
mod quantizer;
mod resampler;

pub use classifier::{classify, RatioClass, VoiceAlgorithm};
pub use psola::{grain_length, max_period, PsolaVoice};
pub use quantizer::{
    semitones_to_ratio, snap_to_scale, voice_intervals, CHORDS, SCALES, TRANSPOSE_OCTAVES,
};
pub use resampler::ResampleVoice;

use crate::primitives::{soft_limit, DelayLine};
use hexfx_analysis::{EpochTracker, SampleHistory, YinDetector};
use hexfx_core::{
    check_prepare_args, AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId,
    ParamBank, ParamSpec, Result, SmoothParam,
};
use std::f64::consts::TAU;
use std::sync::Arc;

pub const CHORD: usize = 0;
pub const ROOT: usize = 1;
pub const SCALE: usize = 2;
pub const MASTER_MIX: usize = 3;
pub const VOICE1_VOLUME: usize = 4;
pub const VOICE1_FORMANT: usize = 5;
pub const VOICE2_VOLUME: usize = 6;
pub const VOICE2_FORMANT: usize = 7;
pub const VOICE3_VOLUME: usize = 8;
pub const VOICE3_FORMANT: usize = 9;
pub const TRANSPOSE: usize = 10;

pub static PARAMS: [ParamSpec; 11] = [
    ParamSpec::choice("Chord", CHORDS.len() as u32, 0.0),
    ParamSpec::choice("Root", 12, 0.0),
    ParamSpec::choice("Scale", SCALES.len() as u32, 0.0),
    ParamSpec::linear("Master Mix", 0.0, 1.0, 0.5),
    ParamSpec::linear("Voice 1 Volume", 0.0, 1.0, 1.0),
    ParamSpec::linear("Voice 1 Formant", 0.0, 1.0, 0.5),
    ParamSpec::linear("Voice 2 Volume", 0.0, 1.0, 0.7),
    ParamSpec::linear("Voice 2 Formant", 0.0, 1.0, 0.5),
    ParamSpec::linear("Voice 3 Volume", 0.0, 1.0, 0.5),
    ParamSpec::linear("Voice 3 Formant", 0.0, 1.0, 0.5),
    ParamSpec::choice("Transpose", TRANSPOSE_OCTAVES.len() as u32, 2.0),
];

/// Input-to-output delay shared by all voice algorithms and the dry path.
pub const LATENCY: usize = 2048;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(33),
    name: "Intelligent Harmonizer",
    category: EngineCategory::Pitch,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: LATENCY,
    stateful_on_bypass: false,
    infinite_tail: false,
};

const HISTORY: usize = 8192;
const YIN_FRAME: usize = 2048;
const YIN_HOP: u32 = 256;
const CROSSFADE: u32 = 256;
const MIN_RATIO: f64 = 0.25;
const MAX_RATIO: f64 = 4.0;
const TILT_CROSSOVER_HZ: f64 = 1000.0;
const OUTPUT_KNEE: f32 = 0.95;

/// Spectral tilt standing in for a formant shift: 0.5 is neutral, higher
/// values brighten, lower values darken.
#[derive(Debug, Clone, Default)]
struct FormantTilt {
    coefficient: f32,
    low: f32,
}

impl FormantTilt {
    fn prepare(&mut self, sample_rate: f64) {
        self.coefficient = (1.0 - (-TAU * TILT_CROSSOVER_HZ / sample_rate).exp()) as f32;
        self.low = 0.0;
    }

    #[inline]
    fn process(&mut self, x: f32, formant: f32) -> f32 {
        self.low += self.coefficient * (x - self.low);
        let high = x - self.low;
        let tilt = (formant - 0.5) * 2.0;
        x + 0.5 * tilt * (high - self.low)
    }
}

struct Voice {
    psola: PsolaVoice,
    resampler: ResampleVoice,
    algorithm: VoiceAlgorithm,
    fading_from: Option<VoiceAlgorithm>,
    fade: u32,
    ratio: f64,
    volume: SmoothParam,
    formant: SmoothParam,
    tilt: FormantTilt,
}

impl Voice {
    fn new(params: &ParamBank, volume: usize, formant: usize, period_limit: f32) -> Self {
        Self {
            psola: PsolaVoice::new(LATENCY, grain_length(period_limit)),
            resampler: ResampleVoice::new(LATENCY),
            algorithm: VoiceAlgorithm::Delay,
            fading_from: None,
            fade: 0,
            ratio: 1.0,
            volume: params.smoothed(volume),
            formant: params.smoothed(formant),
            tilt: FormantTilt::default(),
        }
    }

    fn reset(&mut self) {
        self.psola.reset();
        self.resampler.reset();
        self.fading_from = None;
        self.fade = 0;
        self.volume.reset();
        self.formant.reset();
        self.tilt.low = 0.0;
    }

    fn retarget(&mut self, semitones: i32, crossfade: bool) {
        let ratio = semitones_to_ratio(semitones).clamp(MIN_RATIO, MAX_RATIO);
        let algorithm = classify(ratio, Some(semitones)).algorithm();
        if algorithm != self.algorithm {
            self.fading_from = crossfade.then_some(self.algorithm);
            self.fade = 0;
            self.algorithm = algorithm;
        }
        self.ratio = ratio;
    }
}

/// Mono analysis shared by the voices.
struct Analysis {
    history: SampleHistory,
    epochs: EpochTracker,
    yin: YinDetector,
    frame: Vec<f32>,
    counter: u32,
    period_limit: f32,
}

impl Analysis {
    fn new(sample_rate: f64) -> Self {
        let period_limit = max_period(LATENCY);
        let sr = sample_rate as f32;
        Self {
            history: SampleHistory::new(HISTORY),
            epochs: EpochTracker::new(64, sr / 200.0, sr / 2000.0, period_limit),
            yin: YinDetector::with_range(sample_rate, YIN_FRAME, sr / period_limit, 2000.0),
            frame: vec![0.0; YIN_FRAME],
            counter: 0,
            period_limit,
        }
    }

    fn reset(&mut self) {
        self.history.reset();
        self.epochs.reset();
        self.frame.fill(0.0);
        self.counter = 0;
    }

    /// Push one mono sample; returns its absolute index.
    #[inline]
    fn push(&mut self, x: f32) -> u64 {
        self.history.push(x);
        self.counter += 1;
        if self.counter >= YIN_HOP {
            self.counter = 0;
            self.history.copy_latest(&mut self.frame);
            let pitch = self.yin.detect(&self.frame);
            self.epochs.set_period(pitch.is_voiced().then_some(pitch.period));
        }
        self.epochs.update(&self.history);
        self.history.written() - 1
    }
}

pub struct Harmonizer {
    params: Arc<ParamBank>,
    mix: SmoothParam,
    sample_rate: f64,
    analysis: Analysis,
    voices: [Voice; 3],
    dry_mono: DelayLine,
    dry: [DelayLine; 2],
}

impl Default for Harmonizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Harmonizer {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        let limit = max_period(LATENCY);
        let voices = [
            Voice::new(&params, VOICE1_VOLUME, VOICE1_FORMANT, limit),
            Voice::new(&params, VOICE2_VOLUME, VOICE2_FORMANT, limit),
            Voice::new(&params, VOICE3_VOLUME, VOICE3_FORMANT, limit),
        ];
        Self {
            mix: params.smoothed(MASTER_MIX),
            params,
            sample_rate: 48000.0,
            analysis: Analysis::new(48000.0),
            voices,
            dry_mono: DelayLine::new(LATENCY),
            dry: [DelayLine::new(LATENCY), DelayLine::new(LATENCY)],
        }
    }

    /// Current semitone interval of each voice.
    pub fn intervals(&self) -> [i32; 3] {
        voice_intervals(
            self.params.choice(CHORD),
            self.params.choice(ROOT),
            self.params.choice(SCALE),
            self.params.choice(TRANSPOSE),
        )
    }

    /// Algorithm each voice is rendering with.
    pub fn voice_algorithms(&self) -> [VoiceAlgorithm; 3] {
        [
            self.voices[0].algorithm,
            self.voices[1].algorithm,
            self.voices[2].algorithm,
        ]
    }

    fn retarget_voices(&mut self, crossfade: bool) {
        let intervals = self.intervals();
        for (voice, semitones) in self.voices.iter_mut().zip(intervals) {
            voice.retarget(semitones, crossfade);
        }
    }

    #[inline]
    fn render_voice(
        voice: &mut Voice,
        algorithm: VoiceAlgorithm,
        n: u64,
        delayed: f32,
        resampled: f32,
        analysis: &Analysis,
    ) -> f32 {
        match algorithm {
            VoiceAlgorithm::Delay => delayed,
            VoiceAlgorithm::Resample => resampled,
            VoiceAlgorithm::Psola => voice.psola.tick(
                n,
                voice.ratio,
                &analysis.history,
                &analysis.epochs,
                analysis.period_limit,
            ),
        }
    }
}

impl Engine for Harmonizer {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.sample_rate = sample_rate;
        self.analysis = Analysis::new(sample_rate);
        self.mix.prepare(sample_rate);
        for voice in &mut self.voices {
            voice.volume.prepare(sample_rate);
            voice.formant.prepare(sample_rate);
            voice.tilt.prepare(sample_rate);
        }
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        self.retarget_voices(true);
        let stereo = block.is_stereo();

        for i in 0..block.len() {
            let (l, r) = block.frame(i);
            let mono = if stereo { 0.5 * (l + r) } else { l };
            let n = self.analysis.push(mono);

            self.dry_mono.push(mono);
            let delayed = self.dry_mono.read(LATENCY);
            self.dry[0].push(l);
            self.dry[1].push(r);
            let dry_l = self.dry[0].read(LATENCY);
            let dry_r = self.dry[1].read(LATENCY);

            let mut wet = 0.0;
            for voice in &mut self.voices {
                let resampled = voice.resampler.tick(mono, voice.ratio);
                let current = voice.algorithm;
                let mut y =
                    Self::render_voice(voice, current, n, delayed, resampled, &self.analysis);

                if let Some(previous) = voice.fading_from {
                    let old = Self::render_voice(voice, previous, n, delayed, resampled, &self.analysis);
                    let g = voice.fade as f32 / CROSSFADE as f32;
                    y = old + (y - old) * g;
                    voice.fade += 1;
                    if voice.fade >= CROSSFADE {
                        voice.fading_from = None;
                    }
                }
                let psola_in_use =
                    current == VoiceAlgorithm::Psola || voice.fading_from == Some(VoiceAlgorithm::Psola);
                if !psola_in_use && voice.psola.is_active() {
                    voice.psola.reset();
                }

                let volume = voice.volume.value();
                let formant = voice.formant.value();
                wet += volume * voice.tilt.process(y, formant);
            }

            let mix = self.mix.value();
            let out_l = soft_limit(dry_l * (1.0 - mix) + wet * mix, OUTPUT_KNEE);
            let out_r = soft_limit(dry_r * (1.0 - mix) + wet * mix, OUTPUT_KNEE);
            block.set_frame(i, out_l, out_r);
        }
    }

    fn reset(&mut self) {
        self.analysis.reset();
        self.mix.reset();
        for voice in &mut self.voices {
            voice.reset();
        }
        self.dry_mono.reset();
        for line in &mut self.dry {
            line.reset();
        }
        self.retarget_voices(false);
    }
}
