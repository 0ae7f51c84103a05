use serde::{Deserialize, Serialize};

/// Noise floor of the tracker (dBFS).
pub const SILENCE_DB: f32 = -60.0;

// Keeps log10 finite for digital silence.
const ZERO_OFFSET: f32 = 1.5849e-13;

/// RMS level in dBFS. A full-scale sine reads 0 dB.
pub fn rms_dbfs(rms: f32) -> f32 {
    20.0 * (rms / std::f32::consts::FRAC_1_SQRT_2 + ZERO_OFFSET).log10()
}

/// Peak level in dBFS. A full-scale square reads 0 dB.
pub fn peak_dbfs(peak: f32) -> f32 {
    20.0 * (peak + ZERO_OFFSET).log10()
}

/// Tunables for [`LevelTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Follow the recent maximum instead of using a fixed gain.
    pub auto_gain: bool,
    /// Manual gain in dB, used when `auto_gain` is off.
    pub gain: f32,
    /// Width of the normalized window in dB.
    pub dynamic_range: f32,
    /// Hold-and-fall smoothing of the output.
    pub smooth_fall: bool,
    /// 0..1, higher falls faster.
    pub fall_speed: f32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            auto_gain: true,
            gain: 6.0,
            dynamic_range: 12.0,
            smooth_fall: true,
            fall_speed: 0.3,
        }
    }
}

/// Turns a dBFS level stream into a 0..1 meter value.
///
/// Meant to be polled once per display frame with that frame's delta time.
#[derive(Debug, Clone)]
pub struct LevelTracker {
    settings: TrackerSettings,
    head: f32,
    fall: f32,
    level: f32,
}

impl LevelTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            head: SILENCE_DB,
            fall: 0.0,
            level: 0.0,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Gain currently applied (dB).
    pub fn current_gain(&self) -> f32 {
        if self.settings.auto_gain {
            -self.head
        } else {
            self.settings.gain
        }
    }

    pub fn normalized_level(&self) -> f32 {
        self.level
    }

    pub fn reset_auto_gain(&mut self) {
        self.head = SILENCE_DB;
    }

    /// Feeds one level reading (dBFS) taken `dt` seconds after the previous one.
    pub fn update(&mut self, input_db: f32, dt: f32) -> f32 {
        let range = self.settings.dynamic_range;

        if self.settings.auto_gain {
            const DECAY_DB_PER_SEC: f32 = 0.6;
            self.head = (self.head - DECAY_DB_PER_SEC * dt).max(SILENCE_DB);

            // Pull up by input, leaving a little headroom for clipping.
            let room = range * 0.05;
            self.head = (input_db - room).clamp(self.head, 0.0);
        }

        let normalized = ((input_db + self.current_gain()) / range + 1.0).clamp(0.0, 1.0);

        if self.settings.smooth_fall {
            self.fall += 10f32.powf(1.0 + self.settings.fall_speed * 2.0) * dt;
            self.level -= self.fall * dt;

            if self.level < normalized {
                self.level = normalized;
                self.fall = 0.0;
            }
        } else {
            self.level = normalized;
        }

        self.level
    }
}

impl Default for LevelTracker {
    fn default() -> Self {
        Self::new(TrackerSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbfs_references() {
        assert!(rms_dbfs(std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        assert!(peak_dbfs(1.0).abs() < 1e-4);
        assert!((peak_dbfs(0.5) + 6.0206).abs() < 1e-3);
        assert!(rms_dbfs(0.0).is_finite());
        assert!(rms_dbfs(0.0) < -200.0);
    }

    #[test]
    fn test_manual_gain_normalization() {
        let mut tracker = LevelTracker::new(TrackerSettings {
            auto_gain: false,
            gain: 6.0,
            dynamic_range: 12.0,
            smooth_fall: false,
            fall_speed: 0.3,
        });
        // (-12 + 6) / 12 + 1 = 0.5
        assert!((tracker.update(-12.0, 1.0 / 60.0) - 0.5).abs() < 1e-6);
        assert_eq!(tracker.update(0.0, 1.0 / 60.0), 1.0);
        assert_eq!(tracker.update(-80.0, 1.0 / 60.0), 0.0);
    }

    #[test]
    fn test_auto_gain_follows_loud_input() {
        let mut tracker = LevelTracker::new(TrackerSettings {
            smooth_fall: false,
            ..TrackerSettings::default()
        });
        assert_eq!(tracker.current_gain(), -SILENCE_DB);

        let level = tracker.update(-20.0, 0.1);
        // head = -20 - 0.6
        assert!((tracker.current_gain() - 20.6).abs() < 1e-4);
        assert!((level - 1.0).abs() < 1e-6);

        tracker.reset_auto_gain();
        assert_eq!(tracker.current_gain(), 60.0);
    }

    #[test]
    fn test_auto_gain_head_decays_toward_silence() {
        let mut tracker = LevelTracker::default();
        tracker.update(-10.0, 0.0);
        let before = tracker.current_gain();
        for _ in 0..10 {
            tracker.update(SILENCE_DB, 1.0);
        }
        assert!((tracker.current_gain() - (before + 6.0)).abs() < 1e-3);
    }

    #[test]
    fn test_smooth_fall_holds_then_drops() {
        let mut tracker = LevelTracker::new(TrackerSettings {
            auto_gain: false,
            ..TrackerSettings::default()
        });
        assert_eq!(tracker.update(0.0, 1.0 / 60.0), 1.0);

        let dt = 1.0 / 60.0;
        let first = tracker.update(-100.0, dt);
        let second = tracker.update(-100.0, dt);
        assert!(first < 1.0);
        // Fall speed accelerates.
        assert!(1.0 - first < first - second);

        for _ in 0..120 {
            tracker.update(-100.0, dt);
        }
        assert_eq!(tracker.normalized_level(), 0.0);
    }
}
