pub mod biquad;
#[cfg(feature = "capture")]
pub mod capture;
pub mod coordinator;
pub mod filter_bank;
pub mod level_tracker;
pub mod ring_buffer;
pub mod spectrum;

pub use biquad::{Coefficients, FilterSection};
#[cfg(feature = "capture")]
pub use capture::InputCapture;
pub use coordinator::{Band, Coordinator, LevelMonitor};
pub use filter_bank::{BandSample, FilterBank};
pub use level_tracker::{peak_dbfs, rms_dbfs, LevelTracker, TrackerSettings};
pub use ring_buffer::RingBuffer;
pub use spectrum::{Averaging, SpectralAnalyzer};
