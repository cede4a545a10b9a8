//! Centralized error type for the hexfx umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] hexfx_core::Error),

    #[error("Invalid slot index {0} (valid slots are 0..=5)")]
    InvalidSlot(usize),

    #[error("Unknown host parameter '{0}'")]
    UnknownHostParam(String),

    #[error("Engine swap queue is full ({0} engines in flight)")]
    SwapQueueFull(usize),

    #[error("Preset: {0}")]
    Preset(#[from] PresetError),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural problems found while validating a preset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresetError {
    #[error("preset '{preset}': slot {slot} appears more than once")]
    DuplicateSlot { preset: String, slot: usize },

    #[error("preset '{preset}': slot index {slot} out of range (0..=5)")]
    SlotOutOfRange { preset: String, slot: usize },

    #[error("preset '{preset}': engine type {engine} out of range (0..=56)")]
    EngineOutOfRange { preset: String, engine: i64 },

    #[error("preset '{preset}': slot {slot} parameter {index} = {value} outside [0, 1]")]
    ParameterOutOfRange {
        preset: String,
        slot: usize,
        index: usize,
        value: f32,
    },

    #[error("preset '{preset}': slot {slot} mix {value} outside [0, 1]")]
    MixOutOfRange {
        preset: String,
        slot: usize,
        value: f32,
    },

    #[error("no preset with id '{0}'")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
