//! Real-time audio level and spectrum analysis.
//!
//! A [`Coordinator`] takes mono samples from an audio callback, splits them
//! through a three-band crossover and keeps a short history of the raw and
//! filtered signals. Any number of [`LevelMonitor`] handles read peak, RMS,
//! waveform snapshots and FFT band averages from that history without
//! locking out the audio thread.
//!
//! ```
//! use arrvee_levels::{Averaging, Band, Coordinator};
//!
//! let mut core = Coordinator::with_sample_rate(48_000.0)?;
//! core.feed_block(&[0.0, 0.5, -0.25]);
//!
//! let monitor = core.monitor();
//! assert_eq!(monitor.peak(Band::Raw, 0.01), 0.5);
//!
//! let mut bands = [0.0f32; 8];
//! monitor.band_averages(Averaging::Linear, &mut bands, 8)?;
//! # Ok::<(), arrvee_levels::AnalysisError>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;

pub use audio::{
    Averaging, Band, Coordinator, FilterBank, FilterSection, LevelMonitor, LevelTracker,
    RingBuffer, SpectralAnalyzer, TrackerSettings,
};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
