//! JSON-serializable status snapshot polled by the GUI.

use hexfx_core::{EngineId, LevelMeter};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeterReading {
    pub peak: f32,
    pub rms: f32,
}

impl From<&LevelMeter> for MeterReading {
    fn from(meter: &LevelMeter) -> Self {
        Self {
            peak: meter.peak(),
            rms: meter.rms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStatus {
    pub slot: usize,
    pub engine_id: EngineId,
    pub engine_name: &'static str,
    pub bypass: bool,
    pub mix: f32,
    pub peak: f32,
    pub rms: f32,
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub input: MeterReading,
    pub output: MeterReading,
    pub slots: Vec<SlotStatus>,
    pub latency_samples: usize,
    pub blocks_processed: u64,
}

impl StatusSnapshot {
    pub fn has_errors(&self) -> bool {
        self.slots.iter().any(|s| s.error)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
