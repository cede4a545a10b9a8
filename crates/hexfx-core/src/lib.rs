//! Real-time kernel for the hexfx six-slot effect chain.
//!
//! # Primary API
//!
//! - [`Engine`] / [`EngineDescriptor`]: the contract every effect implements
//! - [`SmoothParam`]: atomic target + per-sample one-pole smoothing
//! - [`ParamBank`] / [`ParamMap`]: lock-free parameter cells and snapshots
//! - [`AudioBlock`]: planar mono/stereo block borrowed from the host
//! - [`DenormalGuard`]: scoped flush-to-zero
//! - [`LevelMeter`] / [`MeterTap`]: peak and RMS metering
//!
//! # Example
//!
//! ```
//! use hexfx_core::{AudioBlock, SmoothParam};
//!
//! let mut gain = SmoothParam::standalone(0.0, 0.010);
//! gain.prepare(48000.0);
//! gain.set_target(1.0);
//!
//! let mut left = [1.0f32; 64];
//! let mut right = [1.0f32; 64];
//! let mut block = AudioBlock::stereo(&mut left, &mut right);
//! for i in 0..block.len() {
//!     let g = gain.next();
//!     let (l, r) = block.frame(i);
//!     block.set_frame(i, l * g, r * g);
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat, AtomicIndex};

pub mod parameter;
pub use parameter::{db_to_gain, gain_to_db, ParamSpec, ParameterScale, DEFAULT_SMOOTHING_MS};

mod smooth;
pub use smooth::{one_pole_coefficient, SmoothParam};

mod param;
pub use param::{ParamBank, ParamMap};

mod block;
pub use block::AudioBlock;

mod denormal;
pub use denormal::{flush_denormal, flush_denormal_f64, DenormalGuard};

pub mod engine;
pub use engine::{
    check_prepare_args, Engine, EngineCategory, EngineDescriptor, EngineId, RenderReport,
};

mod meter;
pub use meter::{LevelMeter, MeterTap, RMS_TIME_SECS};

pub mod config;
pub use config::{CoreConfig, NUM_SLOTS};

pub mod prelude {
    pub use crate::{
        AudioBlock, Engine, EngineDescriptor, EngineId, Error, ParamBank, ParamMap, ParamSpec,
        Result, SmoothParam,
    };
}
