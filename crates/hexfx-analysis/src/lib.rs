//! Real-time-safe signal analysis used by the hexfx pitch engines.
//!
//! Everything here allocates at construction and never inside the per-frame
//! calls, so the detectors can run on the audio thread.

mod history;
pub use history::SampleHistory;

mod yin;
pub use yin::{PitchResult, YinDetector, DEFAULT_YIN_THRESHOLD};

mod epoch;
pub use epoch::EpochTracker;

mod median;
pub use median::{median3, median_in_place};
