//! Control-side handle: engine selection, parameters, presets and status.

use crate::chain::{master_gain_db, MasterShared, SlotShared};
use crate::host_params::HostParam;
use crate::preset::{Preset, PresetBank, SlotPreset};
use crate::processor::{EngineSwap, ProcessorShared, RetiredEngine, StreamFormat};
use crate::status::{MeterReading, SlotStatus, StatusSnapshot};
use crate::{Error, Result};
use hexfx_core::{AtomicFlag, Engine, EngineId, ParamBank, ParamMap, NUM_SLOTS};
use hexfx_dsp::engines::Bypass;
use hexfx_dsp::EngineFactory;
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapCons, HeapProd};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct SwapQueue {
    swaps: HeapProd<EngineSwap>,
    retired: HeapCons<RetiredEngine>,
    /// Retired engines whose grace block has not finished yet.
    waiting: Vec<RetiredEngine>,
    /// Swaps queued and not yet dropped.
    in_flight: usize,
}

/// Control-thread half of the processor. `Send + Sync`; every method may
/// block briefly or allocate.
pub struct ProcessorHandle {
    slots: [Arc<SlotShared>; NUM_SLOTS],
    master: Arc<MasterShared>,
    shared: Arc<ProcessorShared>,
    queue: Mutex<SwapQueue>,
    capacity: usize,
    error_reported: [AtomicFlag; NUM_SLOTS],
}

impl ProcessorHandle {
    pub(crate) fn new(
        slots: [Arc<SlotShared>; NUM_SLOTS],
        master: Arc<MasterShared>,
        shared: Arc<ProcessorShared>,
        swaps: HeapProd<EngineSwap>,
        retired: HeapCons<RetiredEngine>,
        capacity: usize,
    ) -> Self {
        Self {
            slots,
            master,
            shared,
            queue: Mutex::new(SwapQueue {
                swaps,
                retired,
                waiting: Vec::with_capacity(capacity),
                in_flight: 0,
            }),
            capacity,
            error_reported: Default::default(),
        }
    }

    pub fn format(&self) -> StreamFormat {
        *self.shared.format.read()
    }

    pub fn sample_rate(&self) -> f64 {
        self.format().sample_rate
    }

    pub fn master(&self) -> &Arc<MasterShared> {
        &self.master
    }

    pub fn slot(&self, slot: usize) -> Result<&Arc<SlotShared>> {
        self.slots.get(slot).ok_or(Error::InvalidSlot(slot))
    }

    /// Engine most recently selected for `slot`.
    pub fn engine_id(&self, slot: usize) -> Result<EngineId> {
        Ok(self.slot(slot)?.engine_id())
    }

    /// Parameter cells of the engine selected for `slot`.
    pub fn slot_params(&self, slot: usize) -> Result<Arc<ParamBank>> {
        Ok(self.slot(slot)?.params())
    }

    /// Select a new engine for `slot`.
    ///
    /// Construction failures (unknown or unavailable IDs) fall back to the
    /// pass-through stub. Returns the engine actually queued.
    pub fn set_engine(&self, slot: usize, id: EngineId) -> Result<EngineId> {
        let shared = self.slot(slot)?;
        if shared.engine_id() == id {
            return Ok(id);
        }
        let engine = self.build_engine(slot, id, None);
        let installed = engine.descriptor().id;

        let mut queue = self.queue.lock();
        self.reserve(&mut queue, 1)?;
        self.push(&mut queue, slot, engine);
        Ok(installed)
    }

    pub fn set_mix(&self, slot: usize, mix: f32) -> Result<()> {
        self.slot(slot)?.set_mix(mix);
        Ok(())
    }

    pub fn set_bypass(&self, slot: usize, bypass: bool) -> Result<()> {
        self.slot(slot)?.set_bypass(bypass);
        Ok(())
    }

    /// Store a normalized engine parameter. Returns `false` when the engine
    /// has no such parameter or the value is not finite.
    pub fn set_slot_param(&self, slot: usize, index: usize, normalized: f32) -> Result<bool> {
        let applied = self.slot(slot)?.params().set(index, normalized);
        if !applied {
            debug!(slot, index, normalized, "slot parameter ignored");
        }
        Ok(applied)
    }

    /// Replace every parameter of `slot` with a snapshot. Indices the map
    /// omits revert to their defaults; indices the engine lacks are ignored.
    pub fn set_slot_params(&self, slot: usize, params: &ParamMap) -> Result<()> {
        let bank = self.slot(slot)?.params();
        let extra = params.iter().filter(|&(index, _)| index >= bank.len()).count();
        if extra > 0 {
            debug!(slot, extra, "extra snapshot parameters ignored");
        }
        bank.apply_snapshot(params);
        Ok(())
    }

    /// Apply a host parameter by string ID.
    pub fn set_host_param(&self, id: &str, normalized: f32) -> Result<()> {
        self.set_param(HostParam::parse(id)?, normalized)
    }

    /// Apply a typed host parameter. Values are clamped to [0, 1]; non-finite
    /// values are ignored.
    pub fn set_param(&self, param: HostParam, normalized: f32) -> Result<()> {
        if !normalized.is_finite() {
            debug!(%param, "non-finite host value ignored");
            return Ok(());
        }
        let value = normalized.clamp(0.0, 1.0);
        match param {
            HostParam::SlotEngine(slot) => {
                self.set_engine(slot, EngineId::from_normalized(value))?;
            }
            HostParam::SlotMix(slot) => self.set_mix(slot, value)?,
            HostParam::SlotBypass(slot) => self.set_bypass(slot, value >= 0.5)?,
            HostParam::SlotParam { slot, index } => {
                self.set_slot_param(slot, index, value)?;
            }
            HostParam::MasterIn => self.master.set_input_db(master_gain_db(value)),
            HostParam::MasterOut => self.master.set_output_db(master_gain_db(value)),
            HostParam::MasterMix => self.master.set_mix(value),
        }
        Ok(())
    }

    /// Load a preset leniently.
    ///
    /// Duplicate or out-of-range slot indices reject the whole preset and
    /// leave the chain untouched. Out-of-range engine IDs become the stub and
    /// parameter values are clamped. Slots the preset omits are cleared.
    pub fn load_preset(&self, preset: &Preset) -> Result<()> {
        preset.validate_structure()?;

        let mut plan: Vec<(usize, Box<dyn Engine>, f32, bool)> = Vec::with_capacity(NUM_SLOTS);
        for slot in 0..NUM_SLOTS {
            let Some(entry) = preset.slot(slot) else {
                plan.push((slot, Box::new(Bypass::new()), 1.0, false));
                continue;
            };
            let id = entry.engine_id().unwrap_or_else(|| {
                warn!(preset = %preset.id, slot, engine = entry.engine, "engine id out of range, using pass-through");
                EngineId::BYPASS
            });
            let mix = if entry.mix.is_finite() {
                if !(0.0..=1.0).contains(&entry.mix) {
                    warn!(preset = %preset.id, slot, mix = entry.mix, "mix clamped");
                }
                entry.mix.clamp(0.0, 1.0)
            } else {
                warn!(preset = %preset.id, slot, "non-finite mix, using 1.0");
                1.0
            };
            let values = preset_values(&entry.parameters, id, slot);
            let engine = self.build_engine(slot, id, Some(&values));
            plan.push((slot, engine, mix, !entry.active));
        }

        let mut queue = self.queue.lock();
        self.reserve(&mut queue, plan.len())?;
        for (slot, engine, mix, bypass) in plan {
            self.slots[slot].set_mix(mix);
            self.slots[slot].set_bypass(bypass);
            self.push(&mut queue, slot, engine);
        }
        info!(preset = %preset.id, name = %preset.name, "preset loaded");
        Ok(())
    }

    /// Parse `json` and load the preset with `id`. On any error the chain is
    /// left as it was.
    pub fn load_preset_json(&self, json: &str, id: &str) -> Result<()> {
        let result = PresetBank::from_json(json).and_then(|bank| {
            let preset = bank.find(id)?;
            self.load_preset(preset)
        });
        if let Err(err) = &result {
            warn!(preset = id, error = %err, "preset rejected");
        }
        result
    }

    /// Capture the current selection as a preset.
    pub fn current_preset(&self, id: impl Into<String>, name: impl Into<String>) -> Preset {
        let mut preset = Preset::new(id, name);
        for (slot, shared) in self.slots.iter().enumerate() {
            let engine = shared.engine_id();
            if engine.is_bypass() {
                continue;
            }
            let params = shared.params();
            let values: Vec<f32> = (0..params.len()).map(|i| params.get(i)).collect();
            let mut entry = SlotPreset::new(slot, engine)
                .with_mix(shared.mix())
                .with_parameters(values);
            entry.active = !shared.is_bypassed();
            preset.slots.push(entry);
        }
        preset
    }

    /// Summed latency of the selected, non-bypassed engines.
    pub fn latency_samples(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| !s.is_bypassed())
            .filter_map(|s| EngineFactory::descriptor(s.engine_id()).ok())
            .map(|d| d.latency_samples)
            .sum()
    }

    /// Meter and error snapshot. Newly raised slot errors are logged once.
    pub fn status(&self) -> StatusSnapshot {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(slot, shared)| {
                let engine_id = shared.engine_id();
                let error = shared.has_error();
                if error && !self.error_reported[slot].swap(true) {
                    warn!(slot, engine = %engine_id, "slot produced non-finite output");
                }
                SlotStatus {
                    slot,
                    engine_id,
                    engine_name: EngineFactory::descriptor(engine_id).map_or("?", |d| d.name),
                    bypass: shared.is_bypassed(),
                    mix: shared.mix(),
                    peak: shared.meter().peak(),
                    rms: shared.meter().rms(),
                    error,
                }
            })
            .collect();

        StatusSnapshot {
            input: MeterReading::from(self.master.input_meter().as_ref()),
            output: MeterReading::from(self.master.output_meter().as_ref()),
            slots,
            latency_samples: self.latency_samples(),
            blocks_processed: self.shared.blocks.load(Ordering::Acquire),
        }
    }

    pub fn status_json(&self) -> Result<String> {
        Ok(self.status().to_json()?)
    }

    /// Clear the persistent error flag of `slot`. Returns whether it was set.
    pub fn acknowledge_error(&self, slot: usize) -> Result<bool> {
        let was_set = self.slot(slot)?.clear_error();
        self.error_reported[slot].set(false);
        Ok(was_set)
    }

    /// Drop engines retired at least one full block ago. Returns how many.
    pub fn collect_garbage(&self) -> usize {
        let mut queue = self.queue.lock();
        self.collect(&mut queue)
    }

    /// Swaps queued or retired but not yet dropped.
    pub fn engines_in_flight(&self) -> usize {
        self.queue.lock().in_flight
    }

    fn collect(&self, queue: &mut SwapQueue) -> usize {
        while let Some(retired) = queue.retired.try_pop() {
            queue.waiting.push(retired);
        }
        let completed = self.shared.blocks.load(Ordering::Acquire);
        let before = queue.waiting.len();
        queue.waiting.retain(|retired| retired.block >= completed);
        let dropped = before - queue.waiting.len();
        queue.in_flight -= dropped;
        if dropped > 0 {
            debug!(dropped, "retired engines released");
        }
        dropped
    }

    fn reserve(&self, queue: &mut SwapQueue, count: usize) -> Result<()> {
        if queue.in_flight + count > self.capacity {
            self.collect(queue);
        }
        if queue.in_flight + count > self.capacity {
            warn!(in_flight = queue.in_flight, count, "engine swap queue full");
            return Err(Error::SwapQueueFull(queue.in_flight));
        }
        Ok(())
    }

    fn push(&self, queue: &mut SwapQueue, slot: usize, engine: Box<dyn Engine>) {
        self.slots[slot].publish_engine(engine.as_ref());
        if queue.swaps.try_push(EngineSwap { slot, engine }).is_ok() {
            queue.in_flight += 1;
        } else {
            // Capacity was reserved, so this only happens if the ring was
            // built smaller than `capacity`.
            warn!(slot, "engine swap dropped");
        }
    }

    /// Construct and prepare an engine, falling back to the stub.
    fn build_engine(&self, slot: usize, id: EngineId, values: Option<&ParamMap>) -> Box<dyn Engine> {
        let format = self.format();
        let built = EngineFactory::instantiate(id).and_then(|mut engine| {
            if let Some(values) = values {
                engine.update_parameters(values);
            }
            engine.prepare(format.sample_rate, format.max_block_size)?;
            Ok(engine)
        });
        match built {
            Ok(engine) => {
                debug!(slot, engine = engine.descriptor().name, "engine created");
                engine
            }
            Err(err) => {
                warn!(slot, engine = %id, error = %err, "falling back to pass-through");
                Box::new(Bypass::new())
            }
        }
    }
}

/// Turn stored preset values into a snapshot for engine `id`. Non-finite
/// values are left out so they fall back to defaults, extra ones are dropped
/// and out-of-range ones are clamped by the parameter bank.
fn preset_values(values: &[f32], id: EngineId, slot: usize) -> ParamMap {
    let count = EngineFactory::descriptor(id).map_or(0, |d| d.parameter_count());
    if values.len() > count {
        debug!(slot, extra = values.len() - count, "extra preset parameters ignored");
    }
    values
        .iter()
        .copied()
        .enumerate()
        .take(count)
        .filter(|&(index, value)| {
            if !value.is_finite() {
                warn!(slot, index, "non-finite preset parameter, using default");
                return false;
            }
            if !(0.0..=1.0).contains(&value) {
                warn!(slot, index, value, "preset parameter clamped");
            }
            true
        })
        .collect()
}
