//! Pitch Shifter: phase-vocoder transposition.
//!
//! Classic Bernsee/Laroche-Dolson loop on top of [`Stft`]: per-bin true
//! frequency from the phase advance between frames, bins remapped by the
//! pitch ratio, phases re-accumulated at synthesis. Phase bookkeeping is in
//! `f64`; accumulated phases are wrapped every frame so they never lose
//! precision on long runs.

use crate::primitives::Stft;
use hexfx_core::{
    check_prepare_args, AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId,
    ParamBank, ParamSpec, Result, SmoothParam,
};
use rustfft::num_complex::Complex;
use std::f64::consts::{PI, TAU};
use std::sync::Arc;

pub const PITCH: usize = 0;
pub const FINE: usize = 1;

pub static PARAMS: [ParamSpec; 2] = [
    ParamSpec::linear("Pitch", -12.0, 12.0, 0.0).with_unit("st"),
    ParamSpec::linear("Fine", -100.0, 100.0, 0.0).with_unit("ct"),
];

pub const FFT_SIZE: usize = 2048;
pub const OVERSAMPLING: usize = 4;
pub const MIN_RATIO: f32 = 0.5;
pub const MAX_RATIO: f32 = 2.0;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId(31),
    name: "Pitch Shifter",
    category: EngineCategory::Pitch,
    params: &PARAMS,
    realtime_safe: true,
    latency_samples: FFT_SIZE,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Transposition in semitones (plus cents) to a clamped pitch ratio.
#[inline]
pub fn pitch_ratio(semitones: f32, cents: f32) -> f32 {
    let semis = semitones + cents * 0.01;
    2.0f32.powf(semis / 12.0).clamp(MIN_RATIO, MAX_RATIO)
}

/// Principal value in [−π, π].
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    phase - TAU * (phase / TAU).round()
}

/// One channel of vocoder state.
#[derive(Debug)]
struct Vocoder {
    stft: Stft,
    last_phase: Vec<f64>,
    sum_phase: Vec<f64>,
    analysis_mag: Vec<f32>,
    analysis_freq: Vec<f64>,
    synthesis_mag: Vec<f32>,
    synthesis_freq: Vec<f64>,
}

impl Vocoder {
    fn new() -> Self {
        let stft = Stft::new(FFT_SIZE, OVERSAMPLING);
        let bins = stft.bins();
        Self {
            stft,
            last_phase: vec![0.0; bins],
            sum_phase: vec![0.0; bins],
            analysis_mag: vec![0.0; bins],
            analysis_freq: vec![0.0; bins],
            synthesis_mag: vec![0.0; bins],
            synthesis_freq: vec![0.0; bins],
        }
    }

    fn reset(&mut self) {
        self.stft.reset();
        self.last_phase.fill(0.0);
        self.sum_phase.fill(0.0);
        self.analysis_mag.fill(0.0);
        self.analysis_freq.fill(0.0);
        self.synthesis_mag.fill(0.0);
        self.synthesis_freq.fill(0.0);
    }

    #[inline]
    fn tick(&mut self, input: f32, ratio: f32) -> f32 {
        let (out, due) = self.stft.push(input);
        if due {
            self.frame(ratio as f64);
        }
        out
    }

    fn frame(&mut self, ratio: f64) {
        let osamp = (self.stft.size() / self.stft.hop()) as f64;
        let expected = TAU / osamp;
        let bins = self.stft.bins();

        // Analysis: magnitude and true frequency in bin units.
        let spectrum = self.stft.analyze();
        for (k, bin) in spectrum.iter().enumerate() {
            let phase = bin.im.atan2(bin.re) as f64;
            let delta = wrap_phase(phase - self.last_phase[k] - k as f64 * expected);
            self.last_phase[k] = phase;
            self.analysis_mag[k] = bin.norm();
            self.analysis_freq[k] = k as f64 + delta * osamp / TAU;
        }

        // Remap.
        self.synthesis_mag.fill(0.0);
        self.synthesis_freq.fill(0.0);
        for k in 0..bins {
            let target = (k as f64 * ratio).round() as usize;
            if target < bins {
                self.synthesis_mag[target] += self.analysis_mag[k];
                self.synthesis_freq[target] = self.analysis_freq[k] * ratio;
            }
        }

        // Synthesis.
        let spectrum = self.stft.spectrum_mut();
        for (k, bin) in spectrum.iter_mut().enumerate() {
            let deviation = self.synthesis_freq[k] - k as f64;
            let advance = deviation * TAU / osamp + k as f64 * expected;
            self.sum_phase[k] = wrap_phase(self.sum_phase[k] + advance);
            *bin = Complex::from_polar(self.synthesis_mag[k], self.sum_phase[k] as f32);
        }
        self.stft.synthesize();
    }
}

pub struct PitchShifter {
    params: Arc<ParamBank>,
    pitch: SmoothParam,
    fine: SmoothParam,
    channels: [Vocoder; 2],
}

impl Default for PitchShifter {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchShifter {
    pub fn new() -> Self {
        let params = Arc::new(ParamBank::new(&PARAMS));
        Self {
            pitch: params.smoothed(PITCH),
            fine: params.smoothed(FINE),
            params,
            channels: [Vocoder::new(), Vocoder::new()],
        }
    }
}

impl Engine for PitchShifter {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        check_prepare_args(sample_rate, max_block_size)?;
        self.pitch.prepare(sample_rate);
        self.fine.prepare(sample_rate);
        self.reset();
        Ok(())
    }

    fn process(&mut self, block: &mut AudioBlock<'_>) {
        let [left_voc, right_voc] = &mut self.channels;
        let (left, right) = block.split_mut();
        match right {
            Some(right) => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let ratio = pitch_ratio(self.pitch.value(), self.fine.value());
                    *l = left_voc.tick(*l, ratio);
                    *r = right_voc.tick(*r, ratio);
                }
            }
            None => {
                for s in left.iter_mut() {
                    let ratio = pitch_ratio(self.pitch.value(), self.fine.value());
                    *s = left_voc.tick(*s, ratio);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.pitch.reset();
        self.fine.reset();
        for voc in &mut self.channels {
            voc.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    /// Peak frequency with parabolic interpolation over a Hann-windowed FFT.
    fn dominant_frequency(signal: &[f32], sample_rate: f64) -> f64 {
        let n = signal.len();
        let mut buf: Vec<Complex<f64>> = signal
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let w = 0.5 - 0.5 * (TAU * i as f64 / n as f64).cos();
                Complex::new(x as f64 * w, 0.0)
            })
            .collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buf);
        let mags: Vec<f64> = buf[..n / 2].iter().map(|c| c.norm().max(1e-20).ln()).collect();
        let k = (1..n / 2 - 1)
            .max_by(|&a, &b| mags[a].total_cmp(&mags[b]))
            .unwrap_or(1);
        let (a, b, c) = (mags[k - 1], mags[k], mags[k + 1]);
        let offset = 0.5 * (a - c) / (a - 2.0 * b + c);
        (k as f64 + offset) * sample_rate / n as f64
    }

    fn shift(semitones: f32, cents: f32, freq: f64) -> Vec<f32> {
        let mut engine = PitchShifter::new();
        engine.params().set(PITCH, PARAMS[PITCH].normalize(semitones));
        engine.params().set(FINE, PARAMS[FINE].normalize(cents));
        engine.prepare(48000.0, 512).unwrap();
        let mut buf: Vec<f32> = (0..65536 + 8192)
            .map(|n| 0.5 * (TAU * freq * n as f64 / 48000.0).sin() as f32)
            .collect();
        for chunk in buf.chunks_mut(512) {
            engine.process(&mut AudioBlock::mono(chunk));
        }
        buf.split_off(8192)
    }

    #[test]
    fn test_ratio_mapping() {
        assert!((pitch_ratio(12.0, 0.0) - 2.0).abs() < 1e-6);
        assert!((pitch_ratio(-12.0, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(pitch_ratio(12.0, 100.0), MAX_RATIO);
        assert!((pitch_ratio(0.0, 0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(3.0 * PI) - PI).abs() < 1e-9 || (wrap_phase(3.0 * PI) + PI).abs() < 1e-9);
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_phase(-TAU - 0.25) + 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_octave_up_and_down() {
        for (semis, expected) in [(12.0, 880.0), (-12.0, 220.0), (0.0, 440.0)] {
            let out = shift(semis, 0.0, 440.0);
            let f = dominant_frequency(&out, 48000.0);
            assert!((f - expected).abs() / expected < 0.005, "{} st -> {} Hz", semis, f);
        }
    }

    #[test]
    fn test_unity_preserves_level() {
        let out = shift(0.0, 0.0, 1000.0);
        let rms = (out.iter().map(|s| s * s).sum::<f32>() / out.len() as f32).sqrt();
        assert!((rms - 0.5 / 2f32.sqrt()).abs() < 0.02, "rms {}", rms);
    }
}
