//! Test helpers and fixtures for hexfx integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (filters, oscillators)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (1e-6): Post-reset silence

#![allow(dead_code)]

pub mod tolerances;

use hexfx::prelude::*;
use hexfx::{Engine, EngineFactory};
use rustfft::{num_complex::Complex, FftPlanner};

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// Every engine built into the crate, stub excluded.
pub fn built_engines() -> Vec<EngineId> {
    EngineFactory::available()
        .filter(|id| !id.is_bypass())
        .collect()
}

/// A prepared engine at the test rate.
pub fn test_engine(id: EngineId, max_block: usize) -> Box<dyn Engine> {
    EngineFactory::create(id, TEST_SAMPLE_RATE, max_block)
        .unwrap_or_else(|e| panic!("engine {id}: {e}"))
}

/// A processor and its handle at the test rate.
pub fn test_processor() -> (ProcessorCore, ProcessorHandle) {
    ProcessorCore::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .max_block_size(TEST_BUFFER_SIZE)
        .build()
        .expect("Failed to create test processor")
}

/// Set a parameter in physical units.
pub fn set_physical(engine: &dyn Engine, index: usize, value: f32) {
    let spec = &engine.descriptor().params[index];
    engine.params().set(index, spec.normalize(value));
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate silence (zero samples).
pub fn generate_silence(num_samples: usize) -> Vec<f32> {
    vec![0.0; num_samples]
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Pink-ish noise: white noise through Paul Kellet's economy filter.
pub fn generate_pink_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    let white = generate_noise(num_samples, seed);
    let (mut b0, mut b1, mut b2) = (0.0f32, 0.0f32, 0.0f32);
    let pink: Vec<f32> = white
        .iter()
        .map(|&w| {
            b0 = 0.99765 * b0 + w * 0.0990460;
            b1 = 0.96300 * b1 + w * 0.2965164;
            b2 = 0.57000 * b2 + w * 1.0526913;
            b0 + b1 + b2 + w * 0.1848
        })
        .collect();
    let scale = 1.0 / peak(&pink).max(1e-9);
    pink.into_iter().map(|s| s * scale).collect()
}

pub fn scale(samples: &[f32], gain: f32) -> Vec<f32> {
    samples.iter().map(|s| s * gain).collect()
}

pub fn add(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

pub fn db_to_amplitude(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Largest sample-to-sample step.
pub fn max_step(samples: &[f32]) -> f32 {
    samples
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0_f32, f32::max)
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

/// Run an engine over a stereo copy of `input` in `block`-sized calls and
/// return the left channel.
pub fn render_engine(engine: &mut dyn Engine, input: &[f32], block: usize) -> Vec<f32> {
    let mut left = input.to_vec();
    let mut right = input.to_vec();
    for (l, r) in left.chunks_mut(block).zip(right.chunks_mut(block)) {
        engine.process(&mut AudioBlock::stereo(l, r));
    }
    left
}

/// Run the processor over a mono signal duplicated to stereo, interleaved.
pub fn render_processor(core: &mut ProcessorCore, input: &[f32], block: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(input.len());
    let mut interleaved = vec![0.0f32; block * 2];
    for chunk in input.chunks(block) {
        let buf = &mut interleaved[..chunk.len() * 2];
        for (frame, &s) in buf.chunks_exact_mut(2).zip(chunk) {
            frame[0] = s;
            frame[1] = s;
        }
        core.process_interleaved(buf, 2);
        out.extend(buf.chunks_exact(2).map(|f| f[0]));
    }
    out
}

/// Hann-windowed magnitude spectrum of `samples` (zero-padded to a power of
/// two). Returns (magnitudes, bin width in Hz).
pub fn magnitude_spectrum(samples: &[f32], sample_rate: f64) -> (Vec<f32>, f32) {
    let size = samples.len().next_power_of_two();
    let n = samples.len() as f32;
    let mut buf: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n).cos();
            Complex::new(s * w, 0.0)
        })
        .collect();
    buf.resize(size, Complex::new(0.0, 0.0));
    FftPlanner::new().plan_fft_forward(size).process(&mut buf);
    let mags = buf[..size / 2].iter().map(|c| c.norm()).collect();
    (mags, (sample_rate / size as f64) as f32)
}

/// Strongest frequency in `[lo, hi]` Hz with parabolic interpolation.
pub fn peak_frequency_in(samples: &[f32], sample_rate: f64, lo: f32, hi: f32) -> f32 {
    let (mags, bin_hz) = magnitude_spectrum(samples, sample_rate);
    let first = ((lo / bin_hz).ceil() as usize).max(1);
    let last = ((hi / bin_hz).floor() as usize).min(mags.len() - 2);
    let k = (first..=last)
        .max_by(|&a, &b| mags[a].total_cmp(&mags[b]))
        .unwrap_or(first);
    let (a, b, c) = (
        mags[k - 1].max(1e-12).ln(),
        mags[k].max(1e-12).ln(),
        mags[k + 1].max(1e-12).ln(),
    );
    let denom = a - 2.0 * b + c;
    let offset = if denom.abs() > 1e-12 { 0.5 * (a - c) / denom } else { 0.0 };
    (k as f32 + offset) * bin_hz
}

/// Strongest frequency of the whole spectrum above 20 Hz.
pub fn dominant_frequency(samples: &[f32], sample_rate: f64) -> f32 {
    peak_frequency_in(samples, sample_rate, 20.0, (sample_rate / 2.0) as f32 - 100.0)
}

/// Energy of the Hann-windowed spectrum between `lo` and `hi` Hz.
pub fn band_energy(samples: &[f32], sample_rate: f64, lo: f32, hi: f32) -> f32 {
    let (mags, bin_hz) = magnitude_spectrum(samples, sample_rate);
    mags.iter()
        .enumerate()
        .filter(|(k, _)| {
            let f = *k as f32 * bin_hz;
            f >= lo && f <= hi
        })
        .map(|(_, m)| m * m)
        .sum()
}

/// Per-window peak envelope.
pub fn peak_envelope(samples: &[f32], window: usize) -> Vec<f32> {
    samples.chunks(window).map(peak).collect()
}

/// Mean frequency of a slowly varying signal sampled at `rate` Hz, from its
/// upward crossings of the mean.
pub fn crossing_frequency(signal: &[f32], rate: f32) -> f32 {
    let mean = signal.iter().sum::<f32>() / signal.len() as f32;
    let mut crossings = Vec::new();
    for (i, w) in signal.windows(2).enumerate() {
        let (a, b) = (w[0] - mean, w[1] - mean);
        if a < 0.0 && b >= 0.0 {
            crossings.push(i as f32 + a / (a - b));
        }
    }
    if crossings.len() < 2 {
        return 0.0;
    }
    let span = crossings[crossings.len() - 1] - crossings[0];
    (crossings.len() - 1) as f32 * rate / span
}
