//! Concrete engines. Each module exposes `PARAMS`, `DESCRIPTOR` and the
//! engine type itself.

pub mod bypass;
pub mod compressor;
pub mod frequency_shifter;
pub mod gain_utility;
pub mod harmonizer;
pub mod mono_maker;
pub mod noise_gate;
pub mod pitch_shifter;
pub mod ring_modulator;
pub mod spectral_gate;
pub mod tremolo;

pub use bypass::Bypass;
pub use compressor::Compressor;
pub use frequency_shifter::FrequencyShifter;
pub use gain_utility::GainUtility;
pub use harmonizer::Harmonizer;
pub use mono_maker::MonoMaker;
pub use noise_gate::NoiseGate;
pub use pitch_shifter::PitchShifter;
pub use ring_modulator::RingModulator;
pub use spectral_gate::SpectralGate;
pub use tremolo::Tremolo;
