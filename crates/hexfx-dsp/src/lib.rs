//! DSP primitives, effect engines and the engine registry for the hexfx
//! slot chain.
//!
//! Engines are built by [`EngineFactory`] from an [`EngineId`]; the static
//! registry describes all 57 IDs even where no engine is built in.
//!
//! ```
//! use hexfx_core::{AudioBlock, EngineId};
//! use hexfx_dsp::EngineFactory;
//!
//! let mut tremolo = EngineFactory::create(EngineId(29), 48000.0, 256).unwrap();
//! let mut left = [0.5f32; 256];
//! let mut right = [0.5f32; 256];
//! tremolo.render(&mut AudioBlock::stereo(&mut left, &mut right));
//! ```

pub mod primitives;

pub mod engines;

pub mod registry;

mod factory;
pub use factory::{EngineFactory, BUILT_ENGINES};

pub use hexfx_core::{Error, Result};
