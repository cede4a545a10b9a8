//! # hexfx - six-slot real-time effect processor
//!
//! A fixed chain of six effect slots with per-slot bypass and wet/dry mix,
//! a master section, lock-free engine swapping, presets and status JSON.
//!
//! ## Architecture
//!
//! hexfx is an umbrella crate over:
//! - **hexfx-core** - engine contract, smoothed parameters, atomics, meters
//! - **hexfx-analysis** - YIN pitch detection and pitch-mark tracking
//! - **hexfx-dsp** - DSP primitives, the engines and the engine registry
//!
//! [`ProcessorCore::builder`] returns two halves: [`ProcessorCore`] runs on
//! the audio thread and never blocks, [`ProcessorHandle`] runs on the control
//! thread and builds engines, applies parameters and loads presets.
//!
//! ## Quick Start
//!
//! ```
//! use hexfx::prelude::*;
//!
//! let (mut core, handle) = ProcessorCore::builder()
//!     .sample_rate(48000.0)
//!     .max_block_size(512)
//!     .build()?;
//!
//! handle.set_engine(0, EngineId(29))?;
//! handle.set_host_param("slot1_param2", 1.0)?;
//! handle.set_host_param("master_out", 0.5)?;
//!
//! let mut left = vec![0.5f32; 512];
//! let mut right = vec![0.5f32; 512];
//! core.process(&mut AudioBlock::stereo(&mut left, &mut right));
//!
//! let status = handle.status_json()?;
//! assert!(status.contains("Classic Tremolo"));
//! # Ok::<(), hexfx::Error>(())
//! ```

/// Re-export of hexfx-core for direct access
pub use hexfx_core as core;
pub use hexfx_analysis as analysis;
pub use hexfx_dsp as dsp;

pub use hexfx_core::{
    AudioBlock, CoreConfig, Engine, EngineCategory, EngineDescriptor, EngineId, LevelMeter,
    ParamBank, ParamMap, ParamSpec, SmoothParam, NUM_SLOTS,
};
pub use hexfx_dsp::EngineFactory;

mod error;
pub use error::{Error, PresetError, Result};

pub mod chain;
pub use chain::{MasterShared, SlotChain, SlotShared};

mod processor;
pub use processor::{ProcessorCore, StreamFormat};

mod handle;
pub use handle::ProcessorHandle;

mod builder;
pub use builder::ProcessorBuilder;

pub mod host_params;
pub use host_params::HostParam;

pub mod preset;
pub use preset::{Preset, PresetBank, SlotPreset};

pub mod status;
pub use status::{MeterReading, SlotStatus, StatusSnapshot};

pub mod prelude {
    pub use crate::{
        AudioBlock, EngineId, Error, HostParam, ParamMap, Preset, PresetBank, ProcessorCore,
        ProcessorHandle, Result, SlotPreset,
    };
}
