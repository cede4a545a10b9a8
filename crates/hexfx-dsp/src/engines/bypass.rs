//! Engine 0: the stub that occupies an empty slot.

use hexfx_core::{
    AudioBlock, Engine, EngineCategory, EngineDescriptor, EngineId, ParamBank, Result,
};
use std::sync::Arc;

pub static DESCRIPTOR: EngineDescriptor = EngineDescriptor {
    id: EngineId::BYPASS,
    name: "None",
    category: EngineCategory::Utility,
    params: &[],
    realtime_safe: true,
    latency_samples: 0,
    stateful_on_bypass: false,
    infinite_tail: false,
};

/// Passes audio through untouched. Slots skip it entirely.
pub struct Bypass {
    params: Arc<ParamBank>,
}

impl Default for Bypass {
    fn default() -> Self {
        Self::new()
    }
}

impl Bypass {
    pub fn new() -> Self {
        Self {
            params: Arc::new(ParamBank::new(&[])),
        }
    }
}

impl Engine for Bypass {
    fn descriptor(&self) -> &'static EngineDescriptor {
        &DESCRIPTOR
    }

    fn params(&self) -> &Arc<ParamBank> {
        &self.params
    }

    fn prepare(&mut self, _sample_rate: f64, _max_block_size: usize) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, _block: &mut AudioBlock<'_>) {}

    fn reset(&mut self) {}
}
