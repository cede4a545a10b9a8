//! Peak / RMS metering written by the audio thread and polled by the GUI.

use crate::block::AudioBlock;
use crate::lockfree::AtomicFloat;
use crate::smooth::one_pole_coefficient;
use std::sync::Arc;

/// RMS follower time constant.
pub const RMS_TIME_SECS: f32 = 0.3;

/// Lock-free peak and RMS storage. Stale reads are fine.
#[derive(Debug, Default)]
pub struct LevelMeter {
    peak: AtomicFloat,
    rms: AtomicFloat,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn peak(&self) -> f32 {
        self.peak.get()
    }

    #[inline]
    pub fn rms(&self) -> f32 {
        self.rms.get()
    }

    #[inline]
    pub fn publish(&self, peak: f32, rms: f32) {
        self.peak.set(peak);
        self.rms.set(rms);
    }

    pub fn clear(&self) {
        self.publish(0.0, 0.0);
    }
}

/// Audio-side one-pole mean-square follower feeding a shared [`LevelMeter`].
#[derive(Debug)]
pub struct MeterTap {
    meter: Arc<LevelMeter>,
    coefficient: f32,
    mean_square: f32,
}

impl MeterTap {
    pub fn new(meter: Arc<LevelMeter>) -> Self {
        Self {
            meter,
            coefficient: one_pole_coefficient(RMS_TIME_SECS, 48000.0),
            mean_square: 0.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.coefficient = one_pole_coefficient(RMS_TIME_SECS, sample_rate);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.mean_square = 0.0;
        self.meter.clear();
    }

    pub fn meter(&self) -> &Arc<LevelMeter> {
        &self.meter
    }

    /// Update from a block: block peak plus the running RMS.
    pub fn update(&mut self, block: &AudioBlock<'_>) {
        let c = self.coefficient;
        let mut ms = self.mean_square;
        for i in 0..block.len() {
            let (l, r) = block.frame(i);
            let x = 0.5 * (l * l + r * r);
            ms = x + (ms - x) * c;
        }
        self.mean_square = if ms.is_finite() && ms >= f32::MIN_POSITIVE { ms } else { 0.0 };
        self.meter.publish(block.peak(), self.mean_square.sqrt());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_tracks_sine() {
        let meter = Arc::new(LevelMeter::new());
        let mut tap = MeterTap::new(Arc::clone(&meter));
        tap.prepare(48000.0);

        let mut buf: Vec<f32> = (0..48000)
            .map(|n| 0.5 * (2.0 * std::f32::consts::PI * 1000.0 * n as f32 / 48000.0).sin())
            .collect();
        for chunk in buf.chunks_mut(512) {
            let block = AudioBlock::mono(chunk);
            tap.update(&block);
        }

        assert!((meter.peak() - 0.5).abs() < 0.01);
        let expected = 0.5 / 2.0f32.sqrt();
        assert!((meter.rms() - expected).abs() < 0.02, "rms {}", meter.rms());
    }

    #[test]
    fn test_reset_clears() {
        let meter = Arc::new(LevelMeter::new());
        meter.publish(1.0, 1.0);
        let mut tap = MeterTap::new(Arc::clone(&meter));
        tap.reset();
        assert_eq!(meter.peak(), 0.0);
    }
}
