//! Engine construction keyed by ID.

use crate::engines::{
    Bypass, Compressor, FrequencyShifter, GainUtility, Harmonizer, MonoMaker, NoiseGate,
    PitchShifter, RingModulator, SpectralGate, Tremolo,
};
use crate::registry;
use hexfx_core::{Engine, EngineDescriptor, EngineId, Error, Result};

/// IDs with an engine built into this crate.
pub const BUILT_ENGINES: [u16; 11] = [0, 2, 4, 26, 27, 29, 31, 33, 48, 54, 55];

/// Builds engines from the static registry.
pub struct EngineFactory;

impl EngineFactory {
    pub fn descriptor(id: EngineId) -> Result<&'static EngineDescriptor> {
        registry::descriptor(id).ok_or(Error::UnknownEngine(id.0))
    }

    pub fn descriptors() -> impl Iterator<Item = &'static EngineDescriptor> {
        registry::descriptors()
    }

    /// True if `id` names an engine built into this crate.
    pub fn is_available(id: EngineId) -> bool {
        BUILT_ENGINES.contains(&id.0)
    }

    /// IDs of every buildable engine, stub included.
    pub fn available() -> impl Iterator<Item = EngineId> {
        Self::descriptors()
            .map(|d| d.id)
            .filter(|&id| Self::is_available(id))
    }

    /// Construct an unprepared engine.
    pub fn instantiate(id: EngineId) -> Result<Box<dyn Engine>> {
        let engine: Box<dyn Engine> = match id.0 {
            0 => Box::new(Bypass::new()),
            2 => Box::new(Compressor::new()),
            4 => Box::new(NoiseGate::new()),
            26 => Box::new(RingModulator::new()),
            27 => Box::new(FrequencyShifter::new()),
            29 => Box::new(Tremolo::new()),
            31 => Box::new(PitchShifter::new()),
            33 => Box::new(Harmonizer::new()),
            48 => Box::new(SpectralGate::new()),
            54 => Box::new(GainUtility::new()),
            55 => Box::new(MonoMaker::new()),
            _ => {
                let desc = Self::descriptor(id)?;
                return Err(Error::EngineUnavailable {
                    id: id.0,
                    name: desc.name,
                });
            }
        };
        Ok(engine)
    }

    /// Construct and prepare an engine, ready for `process`.
    pub fn create(id: EngineId, sample_rate: f64, max_block_size: usize) -> Result<Box<dyn Engine>> {
        let mut engine = Self::instantiate(id)?;
        engine.prepare(sample_rate, max_block_size)?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_engines_match_descriptors() {
        for id in EngineFactory::available() {
            let engine = EngineFactory::create(id, 48000.0, 256).unwrap();
            assert_eq!(engine.descriptor().id, id);
            assert_eq!(engine.params().len(), engine.descriptor().parameter_count());
        }
        assert_eq!(EngineFactory::available().count(), BUILT_ENGINES.len());
    }

    #[test]
    fn test_availability_matches_instantiate() {
        for desc in EngineFactory::descriptors() {
            assert_eq!(
                EngineFactory::is_available(desc.id),
                EngineFactory::instantiate(desc.id).is_ok(),
                "{}",
                desc.name
            );
        }
    }

    #[test]
    fn test_unbuilt_and_unknown_ids() {
        assert!(matches!(
            EngineFactory::create(EngineId(39), 48000.0, 256),
            Err(Error::EngineUnavailable { id: 39, name: "Plate Reverb" })
        ));
        assert!(matches!(
            EngineFactory::create(EngineId(99), 48000.0, 256),
            Err(Error::UnknownEngine(99))
        ));
    }

    #[test]
    fn test_prepare_rejects_bad_rate() {
        assert!(matches!(
            EngineFactory::create(EngineId(29), 0.0, 256),
            Err(Error::InvalidSampleRate(_))
        ));
    }
}
