//! One slot of the chain: an engine plus bypass, wet/dry mix, metering and
//! the persistent error flag.

use arc_swap::ArcSwap;
use hexfx_core::{
    AtomicFlag, AtomicFloat, AtomicIndex, AudioBlock, Engine, EngineId, LevelMeter, MeterTap,
    ParamBank, Result, SmoothParam,
};
use std::sync::Arc;

/// Slot state visible to the control thread.
#[derive(Debug)]
pub struct SlotShared {
    engine_id: AtomicIndex,
    mix: Arc<AtomicFloat>,
    bypass: AtomicFlag,
    error: AtomicFlag,
    meter: Arc<LevelMeter>,
    params: ArcSwap<ParamBank>,
}

impl SlotShared {
    pub(crate) fn new(engine: &dyn Engine) -> Self {
        Self {
            engine_id: AtomicIndex::new(engine.descriptor().id.0 as u32),
            mix: Arc::new(AtomicFloat::new(1.0)),
            bypass: AtomicFlag::new(false),
            error: AtomicFlag::new(false),
            meter: Arc::new(LevelMeter::new()),
            params: ArcSwap::new(Arc::clone(engine.params())),
        }
    }

    /// Engine most recently published to this slot.
    pub fn engine_id(&self) -> EngineId {
        EngineId(self.engine_id.get() as u16)
    }

    pub(crate) fn publish_engine(&self, engine: &dyn Engine) {
        self.engine_id.set(engine.descriptor().id.0 as u32);
        self.params.store(Arc::clone(engine.params()));
    }

    /// Parameter cells of the published engine.
    pub fn params(&self) -> Arc<ParamBank> {
        self.params.load_full()
    }

    pub fn mix(&self) -> f32 {
        self.mix.get_relaxed()
    }

    /// Wet/dry target, clamped to [0, 1]. Non-finite values are ignored.
    pub fn set_mix(&self, mix: f32) {
        if mix.is_finite() {
            self.mix.set_relaxed(mix.clamp(0.0, 1.0));
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass.get()
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.set(bypass);
    }

    /// True once the slot produced non-finite output; stays set until
    /// acknowledged.
    pub fn has_error(&self) -> bool {
        self.error.get()
    }

    pub(crate) fn clear_error(&self) -> bool {
        self.error.swap(false)
    }

    pub fn meter(&self) -> &Arc<LevelMeter> {
        &self.meter
    }
}

/// Audio-side slot.
pub struct Slot {
    shared: Arc<SlotShared>,
    engine: Box<dyn Engine>,
    mix: SmoothParam,
    meter: MeterTap,
    /// Linear bypass crossfade: 1 engaged, 0 bypassed.
    engaged: f32,
    engage_step: f32,
    fade_secs: f32,
}

impl Slot {
    pub(crate) fn new(shared: Arc<SlotShared>, engine: Box<dyn Engine>, smoothing_secs: f32) -> Self {
        Self {
            mix: SmoothParam::new(Arc::clone(&shared.mix), smoothing_secs),
            meter: MeterTap::new(Arc::clone(&shared.meter)),
            engaged: if shared.is_bypassed() { 0.0 } else { 1.0 },
            engage_step: 1.0,
            fade_secs: smoothing_secs,
            shared,
            engine,
        }
    }

    pub fn shared(&self) -> &Arc<SlotShared> {
        &self.shared
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn engine_id(&self) -> EngineId {
        self.engine.descriptor().id
    }

    pub(crate) fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        self.engine.prepare(sample_rate, max_block_size)?;
        self.mix.prepare(sample_rate);
        self.meter.prepare(sample_rate);
        self.engage_step = 1.0 / (self.fade_secs * sample_rate as f32).max(1.0);
        self.engaged = self.engaged_target();
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.engine.reset();
        self.mix.reset();
        self.meter.reset();
        self.engaged = self.engaged_target();
    }

    /// Install a prepared engine and hand back the previous one.
    pub(crate) fn replace_engine(&mut self, engine: Box<dyn Engine>) -> Box<dyn Engine> {
        std::mem::replace(&mut self.engine, engine)
    }

    /// Latency this slot adds to the chain.
    pub fn latency_samples(&self) -> usize {
        if self.engine_id().is_bypass() || self.shared.is_bypassed() {
            0
        } else {
            self.engine.latency_samples()
        }
    }

    fn engaged_target(&self) -> f32 {
        if self.shared.is_bypassed() {
            0.0
        } else {
            1.0
        }
    }

    /// Process `block` in place. `dry` is scratch of the same shape.
    ///
    /// Toggling bypass crossfades between dry and wet over the smoothing
    /// time; the engine keeps running until the fade-out completes.
    pub(crate) fn process(&mut self, block: &mut AudioBlock<'_>, dry: &mut AudioBlock<'_>) {
        let descriptor = self.engine.descriptor();
        let target = self.engaged_target();
        if descriptor.id.is_bypass() {
            self.engaged = target;
            self.skip(block);
            return;
        }

        if target == 0.0 && self.engaged <= 0.0 {
            if descriptor.stateful_on_bypass {
                // Tails stay warm on a scratch copy; a muted slot hears silence.
                if self.mix.target() <= 0.0 {
                    dry.fill(0.0);
                } else {
                    dry.copy_from(block);
                }
                if !self.engine.render(dry).is_clean() {
                    self.shared.error.set(true);
                }
            }
            self.skip(block);
            return;
        }

        dry.copy_from(block);
        if !self.engine.render(block).is_clean() {
            dry.scrub_non_finite();
            block.copy_from(dry);
            self.shared.error.set(true);
        }

        let step = self.engage_step;
        for i in 0..block.len() {
            self.engaged += (target - self.engaged).clamp(-step, step);
            let m = self.mix.next() * self.engaged;
            let (wl, wr) = block.frame(i);
            let (dl, dr) = dry.frame(i);
            block.set_frame(i, wl * m + dl * (1.0 - m), wr * m + dr * (1.0 - m));
        }
        self.meter.update(block);
    }

    fn skip(&mut self, block: &AudioBlock<'_>) {
        for _ in 0..block.len() {
            self.mix.next();
        }
        self.meter.update(block);
    }
}
