//! The fixed six-slot serial chain with its master section.

mod slot;
pub use slot::{Slot, SlotShared};

use hexfx_core::{
    db_to_gain, AtomicFloat, AudioBlock, CoreConfig, Engine, EngineId, LevelMeter, MeterTap,
    Result, SmoothParam, NUM_SLOTS,
};
use hexfx_dsp::primitives::DelayLine;
use hexfx_dsp::EngineFactory;
use std::sync::Arc;

/// Master gain range in dB, either side of unity.
pub const MASTER_GAIN_RANGE_DB: f32 = 24.0;

/// Map a normalized host value to a master gain in dB (0.5 is unity).
#[inline]
pub fn master_gain_db(normalized: f32) -> f32 {
    (normalized.clamp(0.0, 1.0) * 2.0 - 1.0) * MASTER_GAIN_RANGE_DB
}

/// Master section state visible to the control thread.
#[derive(Debug)]
pub struct MasterShared {
    input_gain: Arc<AtomicFloat>,
    output_gain: Arc<AtomicFloat>,
    mix: Arc<AtomicFloat>,
    input_meter: Arc<LevelMeter>,
    output_meter: Arc<LevelMeter>,
}

impl Default for MasterShared {
    fn default() -> Self {
        Self {
            input_gain: Arc::new(AtomicFloat::new(1.0)),
            output_gain: Arc::new(AtomicFloat::new(1.0)),
            mix: Arc::new(AtomicFloat::new(1.0)),
            input_meter: Arc::new(LevelMeter::new()),
            output_meter: Arc::new(LevelMeter::new()),
        }
    }
}

impl MasterShared {
    /// Input trim in dB, clamped to ±24 dB.
    pub fn set_input_db(&self, db: f32) {
        if db.is_finite() {
            let db = db.clamp(-MASTER_GAIN_RANGE_DB, MASTER_GAIN_RANGE_DB);
            self.input_gain.set_relaxed(db_to_gain(db));
        }
    }

    /// Output trim in dB, clamped to ±24 dB.
    pub fn set_output_db(&self, db: f32) {
        if db.is_finite() {
            let db = db.clamp(-MASTER_GAIN_RANGE_DB, MASTER_GAIN_RANGE_DB);
            self.output_gain.set_relaxed(db_to_gain(db));
        }
    }

    /// Blend between the untouched chain input (0) and the chain output (1).
    pub fn set_mix(&self, mix: f32) {
        if mix.is_finite() {
            self.mix.set_relaxed(mix.clamp(0.0, 1.0));
        }
    }

    pub fn input_gain(&self) -> f32 {
        self.input_gain.get_relaxed()
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain.get_relaxed()
    }

    pub fn mix(&self) -> f32 {
        self.mix.get_relaxed()
    }

    pub fn input_meter(&self) -> &Arc<LevelMeter> {
        &self.input_meter
    }

    pub fn output_meter(&self) -> &Arc<LevelMeter> {
        &self.output_meter
    }
}

/// Six slots in series. Slot `i + 1` hears the output of slot `i`.
pub struct SlotChain {
    slots: [Slot; NUM_SLOTS],
    master: Arc<MasterShared>,
    input_gain: SmoothParam,
    output_gain: SmoothParam,
    master_mix: SmoothParam,
    input_meter: MeterTap,
    output_meter: MeterTap,

    dry_left: Vec<f32>,
    dry_right: Vec<f32>,
    input_left: Vec<f32>,
    input_right: Vec<f32>,
    /// Dry path of the master mix, delayed by the chain latency.
    dry_delay: [DelayLine; 2],
}

/// Longest latency six slots can add.
fn max_chain_latency() -> usize {
    NUM_SLOTS
        * EngineFactory::descriptors()
            .map(|d| d.latency_samples)
            .max()
            .unwrap_or(0)
}

fn scratch_block<'a>(
    left: &'a mut [f32],
    right: &'a mut [f32],
    len: usize,
    stereo: bool,
) -> AudioBlock<'a> {
    if stereo {
        AudioBlock::stereo(&mut left[..len], &mut right[..len])
    } else {
        AudioBlock::mono(&mut left[..len])
    }
}

impl SlotChain {
    /// A chain of pass-through stubs, not yet prepared.
    pub(crate) fn new(config: &CoreConfig, engines: [Box<dyn Engine>; NUM_SLOTS]) -> Self {
        let master = Arc::new(MasterShared::default());
        let smoothing = config.smoothing_secs;
        let slots = engines.map(|engine| {
            let shared = Arc::new(SlotShared::new(engine.as_ref()));
            Slot::new(shared, engine, smoothing)
        });
        Self {
            slots,
            input_gain: SmoothParam::new(Arc::clone(&master.input_gain), smoothing),
            output_gain: SmoothParam::new(Arc::clone(&master.output_gain), smoothing),
            master_mix: SmoothParam::new(Arc::clone(&master.mix), smoothing),
            input_meter: MeterTap::new(Arc::clone(&master.input_meter)),
            output_meter: MeterTap::new(Arc::clone(&master.output_meter)),
            master,
            dry_left: Vec::new(),
            dry_right: Vec::new(),
            input_left: Vec::new(),
            input_right: Vec::new(),
            dry_delay: [DelayLine::new(0), DelayLine::new(0)],
        }
    }

    pub fn master(&self) -> &Arc<MasterShared> {
        &self.master
    }

    pub fn slots(&self) -> &[Slot; NUM_SLOTS] {
        &self.slots
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Allocate scratch and prepare every slot.
    pub(crate) fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        for buf in [
            &mut self.dry_left,
            &mut self.dry_right,
            &mut self.input_left,
            &mut self.input_right,
        ] {
            buf.clear();
            buf.resize(max_block_size, 0.0);
        }
        let max_latency = max_chain_latency();
        self.dry_delay = [DelayLine::new(max_latency), DelayLine::new(max_latency)];
        for slot in &mut self.slots {
            slot.prepare(sample_rate, max_block_size)?;
        }
        for smoother in [
            &mut self.input_gain,
            &mut self.output_gain,
            &mut self.master_mix,
        ] {
            smoother.prepare(sample_rate);
        }
        self.input_meter.prepare(sample_rate);
        self.output_meter.prepare(sample_rate);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        for smoother in [
            &mut self.input_gain,
            &mut self.output_gain,
            &mut self.master_mix,
        ] {
            smoother.reset();
        }
        self.input_meter.reset();
        self.output_meter.reset();
        for line in &mut self.dry_delay {
            line.reset();
        }
    }

    /// Summed latency of every active slot.
    pub fn latency_samples(&self) -> usize {
        self.slots.iter().map(Slot::latency_samples).sum()
    }

    pub fn engine_ids(&self) -> [EngineId; NUM_SLOTS] {
        std::array::from_fn(|i| self.slots[i].engine_id())
    }

    /// Process one block no longer than the prepared maximum.
    pub fn process(&mut self, block: &mut AudioBlock<'_>) {
        let len = block.len();
        if len > self.dry_left.len() {
            debug_assert!(false, "block of {len} exceeds prepared size");
            return;
        }
        let stereo = block.is_stereo();

        scratch_block(&mut self.input_left, &mut self.input_right, len, stereo).copy_from(block);
        self.input_meter.update(block);

        for i in 0..len {
            let g = self.input_gain.next();
            let (l, r) = block.frame(i);
            block.set_frame(i, l * g, r * g);
        }

        for slot in &mut self.slots {
            let mut dry = scratch_block(&mut self.dry_left, &mut self.dry_right, len, stereo);
            slot.process(block, &mut dry);
        }

        // A latency change moves the dry tap at once.
        let delay = self.latency_samples().min(self.dry_delay[0].max_delay());
        let input = scratch_block(&mut self.input_left, &mut self.input_right, len, stereo);
        let [dry_l, dry_r] = &mut self.dry_delay;
        for i in 0..len {
            let g = self.output_gain.next();
            let m = self.master_mix.next();
            let (l, r) = block.frame(i);
            let (il, ir) = input.frame(i);
            dry_l.push(il);
            dry_r.push(ir);
            let (dl, dr) = (dry_l.read(delay), dry_r.read(delay));
            block.set_frame(i, l * g * m + dl * (1.0 - m), r * g * m + dr * (1.0 - m));
        }
        block.scrub_non_finite();
        self.output_meter.update(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexfx_dsp::engines::Bypass;
    use hexfx_dsp::EngineFactory;

    fn stub_chain() -> SlotChain {
        let config = CoreConfig::default();
        let engines: [Box<dyn Engine>; NUM_SLOTS] =
            std::array::from_fn(|_| Box::new(Bypass::new()) as Box<dyn Engine>);
        let mut chain = SlotChain::new(&config, engines);
        chain.prepare(config.sample_rate, config.max_block_size).unwrap();
        chain
    }

    #[test]
    fn test_master_gain_mapping() {
        assert_eq!(master_gain_db(0.5), 0.0);
        assert_eq!(master_gain_db(0.0), -24.0);
        assert_eq!(master_gain_db(1.0), 24.0);
        assert_eq!(master_gain_db(7.0), 24.0);
    }

    #[test]
    fn test_stub_chain_is_transparent() {
        let mut chain = stub_chain();
        let mut left: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let mut right = left.clone();
        let expected = left.clone();
        chain.process(&mut AudioBlock::stereo(&mut left, &mut right));
        assert_eq!(left, expected);
        assert_eq!(right, expected);
        assert_eq!(chain.latency_samples(), 0);
    }

    #[test]
    fn test_master_mix_zero_returns_input() {
        let mut chain = stub_chain();
        chain.master().set_output_db(-24.0);
        chain.master().set_mix(0.0);
        let mut buf = vec![0.25f32; 48000];
        for chunk in buf.chunks_mut(512) {
            chain.process(&mut AudioBlock::mono(chunk));
        }
        assert!((buf[47999] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_master_dry_path_is_latency_aligned() {
        let mut chain = stub_chain();
        let engine = EngineFactory::create(EngineId(31), 48000.0, 512).unwrap();
        chain.slot_mut(0).unwrap().replace_engine(engine);
        let latency = chain.latency_samples();
        chain.master().set_mix(0.0);
        chain.reset();

        let mut buf = vec![0.0f32; 8192];
        buf[100] = 1.0;
        for chunk in buf.chunks_mut(512) {
            chain.process(&mut AudioBlock::mono(chunk));
        }
        assert!((buf[100 + latency] - 1.0).abs() < 1e-6);
        assert!(buf.iter().enumerate().all(|(i, &s)| i == 100 + latency || s == 0.0));
    }

    #[test]
    fn test_slot_latency_follows_bypass() {
        let mut chain = stub_chain();
        let engine = EngineFactory::create(EngineId(31), 48000.0, 512).unwrap();
        let latency = engine.latency_samples();
        let old = chain.slot_mut(2).unwrap().replace_engine(engine);
        assert!(old.descriptor().id.is_bypass());
        assert_eq!(chain.latency_samples(), latency);

        chain.slots()[2].shared().set_bypass(true);
        assert_eq!(chain.latency_samples(), 0);
    }
}
