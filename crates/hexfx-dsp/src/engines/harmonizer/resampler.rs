//! Resampling voice for ratios PSOLA handles badly.

use crate::primitives::PitchedDelay;

/// Sweep length of each read head.
pub const WINDOW: usize = 2048;

/// Variable-rate read of the input through a crossfaded two-head delay.
///
/// The heads read at `ratio` times the write clock, so the voice sounds
/// `ratio` times higher; the average delay equals the harmonizer latency.
#[derive(Debug, Clone)]
pub struct ResampleVoice {
    line: PitchedDelay,
}

impl ResampleVoice {
    pub fn new(latency: usize) -> Self {
        Self {
            line: PitchedDelay::new(latency.saturating_sub(WINDOW / 2), WINDOW),
        }
    }

    pub fn latency(&self) -> usize {
        self.line.latency()
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }

    #[inline]
    pub fn tick(&mut self, input: f32, ratio: f64) -> f32 {
        self.line.process(input, ratio as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_matches() {
        assert_eq!(ResampleVoice::new(2048).latency(), 2048);
    }
}
