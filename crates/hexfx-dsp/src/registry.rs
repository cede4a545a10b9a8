//! Static descriptor table for every engine ID.

use crate::engines;
use hexfx_core::{EngineCategory, EngineDescriptor, EngineId};

/// Descriptor for an ID whose engine is not built into this crate.
const fn unbuilt(id: u16, name: &'static str, category: EngineCategory) -> EngineDescriptor {
    EngineDescriptor {
        id: EngineId(id),
        name,
        category,
        params: &[],
        realtime_safe: true,
        latency_samples: 0,
        stateful_on_bypass: false,
        infinite_tail: false,
    }
}

use EngineCategory::*;

static REGISTRY: [&EngineDescriptor; EngineId::COUNT] = [
    &engines::bypass::DESCRIPTOR,
    &unbuilt(1, "Vintage Opto Compressor", Dynamics),
    &engines::compressor::DESCRIPTOR,
    &unbuilt(3, "Transient Shaper", Dynamics),
    &engines::noise_gate::DESCRIPTOR,
    &unbuilt(5, "Mastering Limiter", Dynamics),
    &unbuilt(6, "Dynamic EQ", Dynamics),
    &unbuilt(7, "Parametric EQ", Filter),
    &unbuilt(8, "Vintage Console EQ", Filter),
    &unbuilt(9, "Ladder Filter", Filter),
    &unbuilt(10, "State Variable Filter", Filter),
    &unbuilt(11, "Formant Filter", Filter),
    &unbuilt(12, "Envelope Filter", Filter),
    &unbuilt(13, "Comb Resonator", Filter),
    &unbuilt(14, "Vocal Formant", Filter),
    &unbuilt(15, "Vintage Tube Preamp", Distortion),
    &unbuilt(16, "Wave Folder", Distortion),
    &unbuilt(17, "Harmonic Exciter", Distortion),
    &unbuilt(18, "Bit Crusher", Distortion),
    &unbuilt(19, "Multiband Saturator", Distortion),
    &unbuilt(20, "Muff Fuzz", Distortion),
    &unbuilt(21, "Rodent Distortion", Distortion),
    &unbuilt(22, "K-Style Overdrive", Distortion),
    &unbuilt(23, "Stereo Chorus", Modulation),
    &unbuilt(24, "Resonant Chorus", Modulation),
    &unbuilt(25, "Analog Phaser", Modulation),
    &engines::ring_modulator::DESCRIPTOR,
    &engines::frequency_shifter::DESCRIPTOR,
    &unbuilt(28, "Harmonic Tremolo", Modulation),
    &engines::tremolo::DESCRIPTOR,
    &unbuilt(30, "Rotary Speaker", Modulation),
    &engines::pitch_shifter::DESCRIPTOR,
    &unbuilt(32, "Detune Doubler", Pitch),
    &engines::harmonizer::DESCRIPTOR,
    &unbuilt(34, "Tape Echo", Delay),
    &unbuilt(35, "Digital Delay", Delay),
    &unbuilt(36, "Magnetic Drum Echo", Delay),
    &unbuilt(37, "Bucket Brigade Delay", Delay),
    &unbuilt(38, "Buffer Repeat", Delay),
    &unbuilt(39, "Plate Reverb", Reverb),
    &unbuilt(40, "Spring Reverb", Reverb),
    &unbuilt(41, "Convolution Reverb", Reverb),
    &unbuilt(42, "Shimmer Reverb", Reverb),
    &unbuilt(43, "Gated Reverb", Reverb),
    &unbuilt(44, "Stereo Widener", Spatial),
    &unbuilt(45, "Stereo Imager", Spatial),
    &unbuilt(46, "Dimension Expander", Spatial),
    &unbuilt(47, "Spectral Freeze", Spectral),
    &engines::spectral_gate::DESCRIPTOR,
    &unbuilt(49, "Phased Vocoder", Spectral),
    &unbuilt(50, "Granular Cloud", Spectral),
    &unbuilt(51, "Chaos Generator", Experimental),
    &unbuilt(52, "Feedback Network", Experimental),
    &unbuilt(53, "Mid-Side Processor", Spatial),
    &engines::gain_utility::DESCRIPTOR,
    &engines::mono_maker::DESCRIPTOR,
    &unbuilt(56, "Phase Align", Utility),
];

/// Descriptor for `id`, or `None` past the last ID.
pub fn descriptor(id: EngineId) -> Option<&'static EngineDescriptor> {
    REGISTRY.get(id.index()).copied()
}

/// All descriptors in ID order.
pub fn descriptors() -> impl Iterator<Item = &'static EngineDescriptor> {
    REGISTRY.iter().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_id() {
        for (index, desc) in descriptors().enumerate() {
            assert_eq!(desc.id.index(), index, "{} at slot {index}", desc.name);
        }
        assert_eq!(descriptors().count(), EngineId::COUNT);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(descriptor(EngineId(29)).map(|d| d.name), Some("Classic Tremolo"));
        assert_eq!(descriptor(EngineId(33)).map(|d| d.name), Some("Intelligent Harmonizer"));
        assert!(descriptor(EngineId(57)).is_none());
    }

    #[test]
    fn test_defaults_in_unit_range() {
        for desc in descriptors() {
            for value in desc.defaults() {
                assert!((0.0..=1.0).contains(&value), "{}: {value}", desc.name);
            }
        }
    }
}
