//! Tolerance constants for audio testing.
//!
//! Different operations require different precision levels.

/// Floating point rounding errors (for passthrough, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// DSP processing tolerance (filters, oscillators may have slight variations).
pub const DSP_EPSILON: f32 = 1e-4;

/// Audio perceptual tolerance (~-60dB, inaudible differences).
pub const PERCEPTUAL_EPSILON: f32 = 0.001;

/// Silence threshold for the post-reset contract.
pub const SILENCE_THRESHOLD: f32 = 1e-6;

/// Relative frequency error allowed by the spectral laws.
pub const FREQUENCY_TOLERANCE: f32 = 0.005;
