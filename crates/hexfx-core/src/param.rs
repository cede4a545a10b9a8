//! Parameter banks shared between the control thread and an engine.
//!
//! A [`ParamBank`] holds one lock-free cell per parameter of an engine. The
//! control thread writes normalized values; the audio thread reads them
//! through [`SmoothParam`]s (continuous) or directly (discrete).

use crate::lockfree::{AtomicFloat, AtomicIndex};
use crate::parameter::ParamSpec;
use crate::smooth::SmoothParam;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Snapshot of parameter values keyed by index, all normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    values: BTreeMap<usize, f32>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map index `i` to `values[i]`.
    pub fn from_values(values: &[f32]) -> Self {
        values.iter().copied().enumerate().collect()
    }

    pub fn insert(&mut self, index: usize, value: f32) -> Option<f32> {
        self.values.insert(index, value)
    }

    /// Builder-style insert.
    pub fn with(mut self, index: usize, value: f32) -> Self {
        self.values.insert(index, value);
        self
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }
}

impl FromIterator<(usize, f32)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (usize, f32)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
struct ParamCell {
    normalized: Arc<AtomicFloat>,
    step: AtomicIndex,
}

/// Lock-free parameter storage for one engine instance.
#[derive(Debug)]
pub struct ParamBank {
    specs: &'static [ParamSpec],
    cells: Vec<ParamCell>,
}

impl ParamBank {
    pub fn new(specs: &'static [ParamSpec]) -> Self {
        let cells = specs
            .iter()
            .map(|spec| {
                let normalized = spec.default_normalized();
                ParamCell {
                    normalized: Arc::new(AtomicFloat::new(normalized)),
                    step: AtomicIndex::new(spec.step_index(normalized)),
                }
            })
            .collect();
        Self { specs, cells }
    }

    pub fn specs(&self) -> &'static [ParamSpec] {
        self.specs
    }

    pub fn spec(&self, index: usize) -> Option<&'static ParamSpec> {
        self.specs.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store a normalized value, clamped to [0, 1].
    ///
    /// Returns `false` for an unknown index or a non-finite value, which are
    /// ignored.
    pub fn set(&self, index: usize, normalized: f32) -> bool {
        let (Some(cell), Some(spec)) = (self.cells.get(index), self.specs.get(index)) else {
            return false;
        };
        if !normalized.is_finite() {
            return false;
        }
        let value = normalized.clamp(0.0, 1.0);
        cell.normalized.set_relaxed(value);
        cell.step.set(spec.step_index(value));
        true
    }

    /// Current normalized value (0.0 for an unknown index).
    pub fn get(&self, index: usize) -> f32 {
        self.cells
            .get(index)
            .map(|c| c.normalized.get_relaxed())
            .unwrap_or(0.0)
    }

    /// Current physical value, unsmoothed.
    pub fn physical(&self, index: usize) -> f32 {
        match self.specs.get(index) {
            Some(spec) => spec.denormalize(self.get(index)),
            None => 0.0,
        }
    }

    /// Step index of a discrete parameter.
    #[inline]
    pub fn choice(&self, index: usize) -> usize {
        self.cells
            .get(index)
            .map(|c| c.step.get() as usize)
            .unwrap_or(0)
    }

    #[inline]
    pub fn toggle(&self, index: usize) -> bool {
        self.get(index) >= 0.5
    }

    /// Apply a full snapshot: listed indices take their value, missing ones
    /// revert to defaults, and indices past the end are ignored.
    pub fn apply_snapshot(&self, map: &ParamMap) {
        for (index, spec) in self.specs.iter().enumerate() {
            let value = map
                .get(index)
                .filter(|v| v.is_finite())
                .unwrap_or_else(|| spec.default_normalized());
            self.set(index, value);
        }
    }

    pub fn snapshot(&self) -> ParamMap {
        (0..self.len()).map(|i| (i, self.get(i))).collect()
    }

    /// Shared handle to a parameter's normalized cell.
    pub fn cell(&self, index: usize) -> Option<Arc<AtomicFloat>> {
        self.cells.get(index).map(|c| Arc::clone(&c.normalized))
    }

    /// Build a smoother that follows parameter `index` in physical units.
    ///
    /// An unknown index yields a detached smoother parked at 0.
    pub fn smoothed(&self, index: usize) -> SmoothParam {
        match (self.cells.get(index), self.specs.get(index)) {
            (Some(cell), Some(spec)) => SmoothParam::with_spec(Arc::clone(&cell.normalized), spec),
            _ => {
                debug_assert!(false, "no parameter at index {index}");
                SmoothParam::standalone(0.0, 0.0)
            }
        }
    }
}
