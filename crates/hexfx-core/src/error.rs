//! Error types for hexfx-core.

use thiserror::Error;

/// Error type for hexfx-core operations.
///
/// Only construction and preparation paths produce these. The audio thread
/// never sees a `Result`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown engine id {0} (valid ids are 0..=56)")]
    UnknownEngine(u16),

    #[error("Engine '{name}' (id {id}) is not built into this crate")]
    EngineUnavailable { id: u16, name: &'static str },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Prepare failed for '{engine}': {reason}")]
    PrepareFailed {
        engine: &'static str,
        reason: String,
    },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
