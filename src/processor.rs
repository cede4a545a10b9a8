//! Audio-side processor: owns the chain and applies engine swaps queued by
//! the control thread.

use crate::chain::{MasterShared, SlotChain, SlotShared};
use crate::handle::ProcessorHandle;
use crate::Result;
use hexfx_core::{AudioBlock, CoreConfig, Engine, EngineId, NUM_SLOTS};
use hexfx_dsp::engines::Bypass;
use parking_lot::RwLock;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sample rate and block ceiling the engines are prepared for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub max_block_size: usize,
}

/// State shared by both halves of the processor.
#[derive(Debug)]
pub(crate) struct ProcessorShared {
    /// Blocks completed by the audio thread.
    pub blocks: AtomicU64,
    pub format: RwLock<StreamFormat>,
}

/// A prepared engine on its way to a slot.
pub(crate) struct EngineSwap {
    pub slot: usize,
    pub engine: Box<dyn Engine>,
}

/// An engine taken out of a slot, tagged with the block it left in.
pub(crate) struct RetiredEngine {
    pub block: u64,
    pub engine: Box<dyn Engine>,
}

/// Real-time half of the processor. Lives on the audio thread.
///
/// # Example
///
/// ```
/// use hexfx::{EngineId, ProcessorCore};
///
/// let (mut core, handle) = ProcessorCore::builder()
///     .sample_rate(48000.0)
///     .max_block_size(256)
///     .build()
///     .unwrap();
///
/// handle.set_engine(0, EngineId(29)).unwrap();
/// let mut buffer = vec![0.5f32; 2 * 256];
/// core.process_interleaved(&mut buffer, 2);
/// assert_eq!(core.engine_ids()[0], EngineId(29));
/// ```
pub struct ProcessorCore {
    chain: SlotChain,
    swaps: HeapCons<EngineSwap>,
    retired: HeapProd<RetiredEngine>,
    shared: Arc<ProcessorShared>,
    config: CoreConfig,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl ProcessorCore {
    pub fn builder() -> crate::ProcessorBuilder {
        crate::ProcessorBuilder::default()
    }

    pub(crate) fn new(config: CoreConfig) -> Result<(Self, ProcessorHandle)> {
        config.validate()?;

        let engines: [Box<dyn Engine>; NUM_SLOTS] =
            std::array::from_fn(|_| Box::new(Bypass::new()) as Box<dyn Engine>);
        let mut chain = SlotChain::new(&config, engines);
        chain.prepare(config.sample_rate, config.max_block_size)?;

        let (swap_prod, swap_cons) = HeapRb::<EngineSwap>::new(config.retire_capacity).split();
        let (retire_prod, retire_cons) =
            HeapRb::<RetiredEngine>::new(config.retire_capacity).split();

        let shared = Arc::new(ProcessorShared {
            blocks: AtomicU64::new(0),
            format: RwLock::new(StreamFormat {
                sample_rate: config.sample_rate,
                max_block_size: config.max_block_size,
            }),
        });

        let slots: [Arc<SlotShared>; NUM_SLOTS] =
            std::array::from_fn(|i| Arc::clone(chain.slots()[i].shared()));
        let handle = ProcessorHandle::new(
            slots,
            Arc::clone(chain.master()),
            Arc::clone(&shared),
            swap_prod,
            retire_cons,
            config.retire_capacity,
        );

        tracing::debug!(
            sample_rate = config.sample_rate,
            max_block_size = config.max_block_size,
            channels = config.channels,
            "processor created"
        );

        let core = Self {
            chain,
            swaps: swap_cons,
            retired: retire_prod,
            shared,
            left: vec![0.0; config.max_block_size],
            right: vec![0.0; config.max_block_size],
            config,
        };
        Ok((core, handle))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn master(&self) -> &Arc<MasterShared> {
        self.chain.master()
    }

    pub fn chain(&self) -> &SlotChain {
        &self.chain
    }

    /// Engine currently installed in each slot.
    pub fn engine_ids(&self) -> [EngineId; NUM_SLOTS] {
        self.chain.engine_ids()
    }

    /// Total latency of the active slots, for reporting to the host.
    pub fn latency_samples(&self) -> usize {
        self.chain.latency_samples()
    }

    /// Blocks completed so far.
    pub fn blocks_processed(&self) -> u64 {
        self.shared.blocks.load(Ordering::Acquire)
    }

    /// Re-prepare every engine for a new sample rate or block ceiling.
    ///
    /// Not real-time safe: call it with the audio stream stopped.
    pub fn prepare_to_play(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        let config = CoreConfig {
            sample_rate,
            max_block_size,
            ..self.config.clone()
        };
        config.validate()?;

        self.install_pending();
        self.chain.prepare(sample_rate, max_block_size)?;
        self.left.resize(max_block_size, 0.0);
        self.right.resize(max_block_size, 0.0);
        *self.shared.format.write() = StreamFormat {
            sample_rate,
            max_block_size,
        };
        self.config = config;
        tracing::info!(sample_rate, max_block_size, "prepared to play");
        Ok(())
    }

    /// Clear every engine's transient state and the meters.
    pub fn release_resources(&mut self) {
        self.install_pending();
        self.chain.reset();
    }

    /// Process a planar block in place. Blocks longer than the prepared
    /// maximum are split.
    pub fn process(&mut self, block: &mut AudioBlock<'_>) {
        self.install_pending();
        let max = self.config.max_block_size;
        let len = block.len();
        let mut start = 0;
        while start < len {
            let end = (start + max).min(len);
            let (left, right) = block.split_mut();
            let mut chunk = match right {
                Some(right) => AudioBlock::stereo(&mut left[start..end], &mut right[start..end]),
                None => AudioBlock::mono(&mut left[start..end]),
            };
            self.chain.process(&mut chunk);
            start = end;
        }
        self.shared.blocks.fetch_add(1, Ordering::Release);
    }

    /// Process an interleaved host buffer of `channels` (1 or 2) channels.
    pub fn process_interleaved(&mut self, buffer: &mut [f32], channels: usize) {
        if !(1..=2).contains(&channels) {
            debug_assert!(false, "unsupported channel count {channels}");
            return;
        }
        self.install_pending();
        let max = self.config.max_block_size;
        for frames in buffer.chunks_mut(max * channels) {
            let len = frames.len() / channels;
            let left = &mut self.left[..len];
            let right = &mut self.right[..len];
            if channels == 2 {
                for (i, frame) in frames.chunks_exact(2).enumerate() {
                    left[i] = frame[0];
                    right[i] = frame[1];
                }
                self.chain.process(&mut AudioBlock::stereo(left, right));
                for (i, frame) in frames.chunks_exact_mut(2).enumerate() {
                    frame[0] = self.left[i];
                    frame[1] = self.right[i];
                }
            } else {
                self.chain.process(&mut AudioBlock::mono(&mut frames[..len]));
            }
        }
        self.shared.blocks.fetch_add(1, Ordering::Release);
    }

    /// Move queued engines into their slots and retire the old ones.
    fn install_pending(&mut self) {
        let block = self.shared.blocks.load(Ordering::Relaxed);
        while let Some(EngineSwap { slot, engine }) = self.swaps.try_pop() {
            let outgoing = match self.chain.slot_mut(slot) {
                Some(target) => target.replace_engine(engine),
                None => engine,
            };
            if let Err(rejected) = self.retired.try_push(RetiredEngine {
                block,
                engine: outgoing,
            }) {
                // The handle reserves retirement capacity before queueing a
                // swap, so this never runs. Never drop an engine here.
                std::mem::forget(rejected);
            }
        }
    }
}
