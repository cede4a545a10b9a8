//! Pitch-ratio classification: which voice algorithm suits a ratio.
//!
//! PSOLA is clean for small-integer ratios but beats audibly at the
//! irrational ratios of equal temperament, where a resampling voice is used
//! instead.

/// Tolerance for matching `p/q` with `1 ≤ p, q ≤ 4`.
pub const SIMPLE_TOLERANCE: f64 = 0.001;
/// Tolerance for matching the equal-tempered table.
pub const PROBLEMATIC_TOLERANCE: f64 = 0.01;
/// Partial quotient above which a ratio counts as irrational.
pub const MAX_PARTIAL_QUOTIENT: f64 = 10.0;

/// Semitone offsets whose equal-tempered ratios beat under PSOLA.
const PROBLEMATIC_SEMITONES: [i32; 10] = [2, -2, 3, -3, 4, -4, 6, -6, 12, -12];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioClass {
    /// No transposition.
    Unity,
    /// `p/q` with small integers.
    Simple,
    /// Close to a known troublesome equal-tempered interval.
    Problematic,
    /// Continued fraction blows up early.
    Irrational,
    /// Everything else.
    Rational,
}

/// Rendering strategy for one harmonizer voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceAlgorithm {
    Delay,
    Psola,
    Resample,
}

impl RatioClass {
    pub fn algorithm(self) -> VoiceAlgorithm {
        match self {
            RatioClass::Unity => VoiceAlgorithm::Delay,
            RatioClass::Simple | RatioClass::Rational => VoiceAlgorithm::Psola,
            RatioClass::Problematic | RatioClass::Irrational => VoiceAlgorithm::Resample,
        }
    }
}

fn is_simple(ratio: f64) -> bool {
    (1..=4).any(|p| (1..=4).any(|q| (ratio - p as f64 / q as f64).abs() < SIMPLE_TOLERANCE))
}

fn is_problematic(ratio: f64) -> bool {
    PROBLEMATIC_SEMITONES
        .iter()
        .any(|&s| (ratio - 2f64.powf(s as f64 / 12.0)).abs() < PROBLEMATIC_TOLERANCE)
}

/// True if one of the first three partial quotients after `a0` exceeds
/// [`MAX_PARTIAL_QUOTIENT`].
fn has_large_partial_quotient(ratio: f64) -> bool {
    let mut frac = ratio - ratio.floor();
    for _ in 0..3 {
        if frac < 1e-9 {
            return false;
        }
        let x = 1.0 / frac;
        let a = x.floor();
        if a > MAX_PARTIAL_QUOTIENT {
            return true;
        }
        frac = x - a;
    }
    false
}

/// Classify a pitch ratio. `semitones` is the quantized interval it came
/// from, when known.
pub fn classify(ratio: f64, semitones: Option<i32>) -> RatioClass {
    if semitones == Some(0) || (ratio - 1.0).abs() < SIMPLE_TOLERANCE {
        RatioClass::Unity
    } else if is_simple(ratio) {
        RatioClass::Simple
    } else if is_problematic(ratio) {
        RatioClass::Problematic
    } else if has_large_partial_quotient(ratio) {
        RatioClass::Irrational
    } else {
        RatioClass::Rational
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn et(semitones: i32) -> f64 {
        2f64.powf(semitones as f64 / 12.0)
    }

    #[test]
    fn test_known_ratios() {
        assert_eq!(classify(1.0, None), RatioClass::Unity);
        assert_eq!(classify(et(0), Some(0)), RatioClass::Unity);
        assert_eq!(classify(2.0, None), RatioClass::Simple);
        assert_eq!(classify(0.5, None), RatioClass::Simple);
        assert_eq!(classify(1.5, None), RatioClass::Simple);
        assert_eq!(classify(2.0 / 3.0, None), RatioClass::Simple);
        assert_eq!(classify(et(4), Some(4)), RatioClass::Problematic);
        assert_eq!(classify(et(-3), Some(-3)), RatioClass::Problematic);
        assert_eq!(classify(et(6), Some(6)), RatioClass::Problematic);
        assert_eq!(classify(et(1), Some(1)), RatioClass::Irrational);
    }

    #[test]
    fn test_octave_prefers_psola() {
        assert_eq!(classify(et(12), Some(12)).algorithm(), VoiceAlgorithm::Psola);
        assert_eq!(classify(et(-12), Some(-12)).algorithm(), VoiceAlgorithm::Psola);
    }

    #[test]
    fn test_equal_tempered_fifth_resamples() {
        // 1.4983 misses 3/2 by more than the simple tolerance.
        assert_eq!(classify(et(7), Some(7)).algorithm(), VoiceAlgorithm::Resample);
    }

    proptest! {
        #[test]
        fn prop_small_fractions_are_simple_or_unity(p in 1u32..=4, q in 1u32..=4) {
            let class = classify(p as f64 / q as f64, None);
            prop_assert!(matches!(class, RatioClass::Simple | RatioClass::Unity));
        }

        #[test]
        fn prop_classification_is_total(ratio in 0.25f64..4.0) {
            let class = classify(ratio, None);
            let algorithm = class.algorithm();
            prop_assert!(matches!(
                algorithm,
                VoiceAlgorithm::Delay | VoiceAlgorithm::Psola | VoiceAlgorithm::Resample
            ));
            if (ratio - 1.0).abs() >= SIMPLE_TOLERANCE {
                prop_assert_ne!(class, RatioClass::Unity);
            }
        }
    }
}
