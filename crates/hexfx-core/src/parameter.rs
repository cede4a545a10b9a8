//! Parameter specifications: normalized (0.0-1.0) ↔ physical value mapping.
//!
//! The host always speaks normalized values. Each engine declares a static
//! table of [`ParamSpec`]s and maps to physical units itself.
//!
//! # Example
//!
//! ```
//! use hexfx_core::ParamSpec;
//!
//! const CUTOFF: ParamSpec = ParamSpec::logarithmic("Cutoff", 20.0, 20000.0, 1000.0).with_unit("Hz");
//!
//! let hz = CUTOFF.denormalize(0.5); // ~632 Hz (geometric mean)
//! assert!((CUTOFF.normalize(hz) - 0.5).abs() < 1e-4);
//! ```

/// Default smoothing time for continuous parameters.
pub const DEFAULT_SMOOTHING_MS: f32 = 10.0;

/// How a parameter value is scaled between normalized (0-1) and physical values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,

    /// `real = min * (max/min)^normalized`. Requires `min > 0`.
    Logarithmic,

    /// `real = min + normalized^curve * (max - min)`
    Exponential { curve: f32 },

    /// Off below 0.5, on at or above. Read without smoothing.
    Toggle,

    /// Discrete selector with `steps` positions. Read without smoothing.
    Choice { steps: u32 },
}

impl ParameterScale {
    /// Discrete parameters are stored as atomic integers and never smoothed.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::Toggle | Self::Choice { .. })
    }
}

/// Static description of one engine parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    /// Default in physical units (the step index for choices).
    pub default: f32,
    pub scale: ParameterScale,
    pub smoothing_ms: f32,
    pub unit: &'static str,
}

impl ParamSpec {
    pub const fn linear(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            name,
            min,
            max,
            default,
            scale: ParameterScale::Linear,
            smoothing_ms: DEFAULT_SMOOTHING_MS,
            unit: "",
        }
    }

    pub const fn logarithmic(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        Self {
            scale: ParameterScale::Logarithmic,
            ..Self::linear(name, min, max, default)
        }
    }

    pub const fn exponential(
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        curve: f32,
    ) -> Self {
        Self {
            scale: ParameterScale::Exponential { curve },
            ..Self::linear(name, min, max, default)
        }
    }

    pub const fn toggle(name: &'static str, default_on: bool) -> Self {
        Self {
            scale: ParameterScale::Toggle,
            ..Self::linear(name, 0.0, 1.0, if default_on { 1.0 } else { 0.0 })
        }
    }

    /// Selector with `steps` positions; `default` is a step index.
    pub const fn choice(name: &'static str, steps: u32, default: f32) -> Self {
        Self {
            scale: ParameterScale::Choice { steps },
            ..Self::linear(name, 0.0, 1.0, default)
        }
    }

    pub const fn with_smoothing_ms(mut self, smoothing_ms: f32) -> Self {
        self.smoothing_ms = smoothing_ms;
        self
    }

    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    pub fn smoothing_secs(&self) -> f32 {
        self.smoothing_ms * 0.001
    }

    /// Number of discrete positions, or `None` for continuous parameters.
    pub fn steps(&self) -> Option<u32> {
        match self.scale {
            ParameterScale::Choice { steps } => Some(steps.max(1)),
            ParameterScale::Toggle => Some(2),
            _ => None,
        }
    }

    /// Step index for a normalized value (0 for continuous parameters).
    #[inline]
    pub fn step_index(&self, normalized: f32) -> u32 {
        match self.steps() {
            Some(steps) if steps > 1 => {
                (normalized.clamp(0.0, 1.0) * (steps - 1) as f32).round() as u32
            }
            _ => 0,
        }
    }

    /// Convert a physical value to normalized (0.0-1.0).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        if let Some(steps) = self.steps() {
            let last = (steps - 1).max(1) as f32;
            return match self.scale {
                ParameterScale::Toggle => {
                    if value >= 0.5 {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => (value.round().clamp(0.0, last)) / last,
            };
        }

        let value = value.clamp(self.min, self.max);
        let range = self.max - self.min;
        if range <= 0.0 {
            return 0.0;
        }

        match self.scale {
            ParameterScale::Logarithmic if self.min > 0.0 => {
                (value.ln() - self.min.ln()) / (self.max.ln() - self.min.ln())
            }
            ParameterScale::Exponential { curve } if curve > 0.0 && curve != 1.0 => {
                ((value - self.min) / range).powf(1.0 / curve)
            }
            _ => (value - self.min) / range,
        }
    }

    /// Convert a normalized value (0.0-1.0) to a physical value.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let range = self.max - self.min;

        match self.scale {
            ParameterScale::Linear => self.min + normalized * range,
            ParameterScale::Logarithmic => {
                if self.min <= 0.0 {
                    self.min + normalized * range
                } else {
                    (self.min.ln() + normalized * (self.max.ln() - self.min.ln())).exp()
                }
            }
            ParameterScale::Exponential { curve } => {
                let shaped = if curve <= 0.0 || curve == 1.0 {
                    normalized
                } else {
                    normalized.powf(curve)
                };
                self.min + shaped * range
            }
            ParameterScale::Toggle | ParameterScale::Choice { .. } => {
                self.step_index(normalized) as f32
            }
        }
    }

    /// The default as a normalized value.
    pub fn default_normalized(&self) -> f32 {
        self.normalize(self.default)
    }
}

/// Convert dB to linear amplitude.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB, floored at -120 dB.
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 1.0e-6 {
        -120.0
    } else {
        20.0 * gain.log10()
    }
}
