//! Chord and scale quantization of voice intervals.

/// Three voice offsets per chord, in semitones.
pub const CHORDS: [(&str, [i32; 3]); 12] = [
    ("Unison", [0, 0, 0]),
    ("Major", [4, 7, 12]),
    ("Minor", [3, 7, 12]),
    ("Power", [7, 12, -12]),
    ("Sus2", [2, 7, 12]),
    ("Sus4", [5, 7, 12]),
    ("Maj7", [4, 7, 11]),
    ("Min7", [3, 7, 10]),
    ("Dom7", [4, 7, 10]),
    ("Dim", [3, 6, 9]),
    ("Aug", [4, 8, 12]),
    ("Octaves", [12, -12, 24]),
];

/// Scale degrees relative to the root. An empty set means chromatic.
pub const SCALES: [(&str, &[i32]); 10] = [
    ("Chromatic", &[]),
    ("Major", &[0, 2, 4, 5, 7, 9, 11]),
    ("Natural Minor", &[0, 2, 3, 5, 7, 8, 10]),
    ("Harmonic Minor", &[0, 2, 3, 5, 7, 8, 11]),
    ("Melodic Minor", &[0, 2, 3, 5, 7, 9, 11]),
    ("Dorian", &[0, 2, 3, 5, 7, 9, 10]),
    ("Mixolydian", &[0, 2, 4, 5, 7, 9, 10]),
    ("Pentatonic Major", &[0, 2, 4, 7, 9]),
    ("Pentatonic Minor", &[0, 3, 5, 7, 10]),
    ("Blues", &[0, 3, 5, 6, 7, 10]),
];

/// Octave offset of each position of the transpose selector.
pub const TRANSPOSE_OCTAVES: [i32; 5] = [-2, -1, 0, 1, 2];

/// Snap an interval to the nearest degree of `degrees`. Ties resolve
/// downward.
pub fn snap_to_scale(semitones: i32, degrees: &[i32]) -> i32 {
    if degrees.is_empty() {
        return semitones;
    }
    let octave = semitones.div_euclid(12);
    let class = semitones.rem_euclid(12);

    let mut best = degrees[0];
    let mut best_distance = i32::MAX;
    for candidate in degrees.iter().copied().chain(std::iter::once(degrees[0] + 12)) {
        let distance = (candidate - class).abs();
        if distance < best_distance {
            best = candidate;
            best_distance = distance;
        }
    }
    octave * 12 + best
}

/// Interval in semitones of each voice.
///
/// The chord offset is snapped within the scale, the root transposes the
/// result, and the transpose selector adds whole octaves.
pub fn voice_intervals(chord: usize, root: usize, scale: usize, transpose: usize) -> [i32; 3] {
    let offsets = CHORDS[chord.min(CHORDS.len() - 1)].1;
    let degrees = SCALES[scale.min(SCALES.len() - 1)].1;
    let root = root.min(11) as i32;
    let octaves = TRANSPOSE_OCTAVES[transpose.min(TRANSPOSE_OCTAVES.len() - 1)];
    offsets.map(|offset| root + snap_to_scale(offset, degrees) + 12 * octaves)
}

#[inline]
pub fn semitones_to_ratio(semitones: i32) -> f64 {
    2f64.powf(semitones as f64 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromatic_passthrough() {
        assert_eq!(voice_intervals(1, 0, 0, 2), [4, 7, 12]);
        assert_eq!(voice_intervals(0, 0, 0, 2), [0, 0, 0]);
    }

    #[test]
    fn test_snap_ties_go_down() {
        let major = SCALES[1].1;
        // 1 sits between 0 and 2.
        assert_eq!(snap_to_scale(1, major), 0);
        // 3 sits between 2 and 4.
        assert_eq!(snap_to_scale(3, major), 2);
        assert_eq!(snap_to_scale(6, major), 5);
        assert_eq!(snap_to_scale(-1, major), -1);
    }

    #[test]
    fn test_minor_chord_in_major_scale() {
        // Minor third snaps down to the major second.
        assert_eq!(voice_intervals(2, 0, 1, 2), [2, 7, 12]);
    }

    #[test]
    fn test_root_and_transpose() {
        assert_eq!(voice_intervals(1, 2, 0, 3), [18, 21, 26]);
        assert_eq!(voice_intervals(11, 0, 0, 0), [-12, -36, 0]);
    }

    #[test]
    fn test_ratio() {
        assert!((semitones_to_ratio(12) - 2.0).abs() < 1e-12);
        assert!((semitones_to_ratio(-12) - 0.5).abs() < 1e-12);
    }
}
