//! Processor configuration.

use crate::{Error, Result};

/// Slot count of the chain.
pub const NUM_SLOTS: usize = 6;

/// Configuration for the six-slot processor.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub channels: usize,
    /// Smoothing time for slot mix and master gains.
    pub smoothing_secs: f32,
    /// Capacity of the engine swap and retirement queues.
    pub retire_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_block_size: 512,
            channels: 2,
            smoothing_secs: 0.010,
            retire_capacity: 16,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384_000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if !(1..=16384).contains(&self.max_block_size) {
            return Err(Error::InvalidConfig(format!(
                "max_block_size {} out of range (1-16384)",
                self.max_block_size
            )));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(Error::InvalidConfig(format!(
                "channels {} not supported (1 or 2)",
                self.channels
            )));
        }
        if !(0.001..=0.050).contains(&self.smoothing_secs) {
            return Err(Error::InvalidConfig(format!(
                "smoothing {} s out of range (1-50 ms)",
                self.smoothing_secs
            )));
        }
        if self.retire_capacity < NUM_SLOTS {
            return Err(Error::InvalidConfig(format!(
                "retire_capacity {} smaller than slot count",
                self.retire_capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.sample_rate, 48000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let bad = [
            CoreConfig { sample_rate: 4000.0, ..Default::default() },
            CoreConfig { max_block_size: 0, ..Default::default() },
            CoreConfig { channels: 3, ..Default::default() },
            CoreConfig { smoothing_secs: 0.2, ..Default::default() },
            CoreConfig { retire_capacity: 2, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }
}
