//! Allocation-free median helpers.

/// Median of three values.
#[inline]
pub fn median3(a: f32, b: f32, c: f32) -> f32 {
    a.max(b).min(a.min(b).max(c))
}

/// Median of a scratch slice, sorted in place. Returns 0 for an empty slice.
///
/// Even lengths return the upper of the two middle values.
pub fn median_in_place(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    values[values.len() / 2]
}
