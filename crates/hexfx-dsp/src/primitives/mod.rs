//! Reusable DSP building blocks shared by the engines.

mod dc_blocker;
pub use dc_blocker::{DcBlocker, DC_BLOCKER_HZ};

mod oversampler;
pub use oversampler::{design_lowpass, Oversampler};

mod hilbert;
pub use hilbert::{FrequencyShifter, HilbertTransform, HILBERT_TAPS};

mod svf;
pub use svf::{Svf, SvfOutput};

mod delay;
pub use delay::{DelayLine, PitchedDelay};

mod stft;
pub use stft::Stft;

mod saturate;
pub use saturate::{saturate, soft_limit};

mod noise;
pub use noise::{Drift, Xorshift};
