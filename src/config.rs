use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::filter_bank::{DEFAULT_CROSSOVER_HZ, DEFAULT_Q};
use crate::audio::level_tracker::TrackerSettings;
use crate::audio::ring_buffer::DEFAULT_CAPACITY;
use crate::audio::spectrum::DEFAULT_WINDOW_SIZE;
use crate::error::{AnalysisError, Result};

/// Sizing and filter settings for a [`Coordinator`](crate::Coordinator).
///
/// Every field is optional in the JSON form; missing ones take the defaults
/// below.
///
/// ```json
/// { "history_capacity": 4096, "crossover_hz": 800.0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples kept per band; power of two.
    pub history_capacity: usize,
    /// FFT block length; power of two.
    pub spectrum_window: usize,
    /// Low/mid/high split frequency (Hz).
    pub crossover_hz: f32,
    /// Resonance of every filter section.
    pub q: f32,
    pub tracker: TrackerSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            spectrum_window: DEFAULT_WINDOW_SIZE,
            crossover_hz: DEFAULT_CROSSOVER_HZ,
            q: DEFAULT_Q,
            tracker: TrackerSettings::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("Loaded analysis config from {:?}: {:?}", path.as_ref(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.history_capacity.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo {
                what: "history capacity",
                value: self.history_capacity,
            });
        }
        if self.spectrum_window < 2 || !self.spectrum_window.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo {
                what: "spectral window",
                value: self.spectrum_window,
            });
        }
        if !(self.q > 0.0) || !(self.crossover_hz > 0.0) || !self.crossover_hz.is_finite() {
            return Err(AnalysisError::InvalidFilter {
                crossover_hz: self.crossover_hz,
                q: self.q,
            });
        }
        Ok(())
    }

    /// Checks the crossover sits below Nyquist for `sample_rate`.
    pub fn validate_for_rate(&self, sample_rate: f32) -> Result<()> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if self.crossover_hz >= sample_rate / 2.0 {
            return Err(AnalysisError::InvalidFilter {
                crossover_hz: self.crossover_hz,
                q: self.q,
            });
        }
        Ok(())
    }
}
