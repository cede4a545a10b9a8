//! Builder for configuring and constructing a [`ProcessorCore`].

use crate::handle::ProcessorHandle;
use crate::{ProcessorCore, Result};
use hexfx_core::CoreConfig;

/// Every slot starts on the pass-through stub; pick engines afterwards
/// through the handle or a preset.
///
/// # Example
///
/// ```
/// use hexfx::ProcessorCore;
///
/// let (core, handle) = ProcessorCore::builder()
///     .sample_rate(44100.0)
///     .max_block_size(1024)
///     .smoothing_ms(20.0)
///     .build()
///     .unwrap();
///
/// assert_eq!(core.latency_samples(), 0);
/// assert_eq!(handle.sample_rate(), 44100.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProcessorBuilder {
    config: CoreConfig,
}

impl ProcessorBuilder {
    /// Start from an existing configuration.
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 512
    pub fn max_block_size(mut self, max_block_size: usize) -> Self {
        self.config.max_block_size = max_block_size;
        self
    }

    /// Default: 2
    pub fn channels(mut self, channels: usize) -> Self {
        self.config.channels = channels;
        self
    }

    /// Smoothing for slot mix and master gains. Default: 10 ms
    pub fn smoothing_ms(mut self, ms: f32) -> Self {
        self.config.smoothing_secs = ms * 0.001;
        self
    }

    /// Engines that may be queued or awaiting release at once. Default: 16
    pub fn retire_capacity(mut self, capacity: usize) -> Self {
        self.config.retire_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<(ProcessorCore, ProcessorHandle)> {
        ProcessorCore::new(self.config)
    }
}
