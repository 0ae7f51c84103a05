use atomic_float::AtomicF32;
use log::{debug, info};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use super::filter_bank::FilterBank;
use super::ring_buffer::RingBuffer;
use super::spectrum::{Averaging, SpectralAnalyzer};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};

/// History selector for the read accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Raw = 0,
    Low = 1,
    Mid = 2,
    High = 3,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Raw, Band::Low, Band::Mid, Band::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Band::Raw => "raw",
            Band::Low => "low",
            Band::Mid => "mid",
            Band::High => "high",
        }
    }
}

impl TryFrom<i64> for Band {
    type Error = AnalysisError;

    fn try_from(index: i64) -> Result<Self> {
        match index {
            0 => Ok(Band::Raw),
            1 => Ok(Band::Low),
            2 => Ok(Band::Mid),
            3 => Ok(Band::High),
            other => Err(AnalysisError::InvalidBand(other)),
        }
    }
}

impl TryFrom<usize> for Band {
    type Error = AnalysisError;

    fn try_from(index: usize) -> Result<Self> {
        Band::try_from(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

// State written by the producer and read by every monitor.
#[derive(Debug)]
struct History {
    bands: [RingBuffer; 4],
    spectral_window: RingBuffer,
    sample_rate: AtomicF32,
}

/// Read side of a [`Coordinator`].
///
/// Cheap to clone and safe to hand to any number of threads. Reads never
/// block the producer; see [`RingBuffer`] for what a concurrent read can see.
#[derive(Debug, Clone)]
pub struct LevelMonitor {
    history: Arc<History>,
    analyzer: Arc<SpectralAnalyzer>,
}

impl LevelMonitor {
    pub fn sample_rate(&self) -> f32 {
        self.history.sample_rate.load(Ordering::Acquire)
    }

    pub fn history_capacity(&self) -> usize {
        self.history.bands[0].capacity()
    }

    pub fn spectrum_window(&self) -> usize {
        self.analyzer.window_size()
    }

    pub fn buffer(&self, band: Band) -> &RingBuffer {
        &self.history.bands[band.index()]
    }

    // Negative or NaN durations saturate to zero and are clamped up by the buffer.
    fn duration_to_range(&self, duration_secs: f32) -> usize {
        (duration_secs * self.sample_rate()) as usize
    }

    /// Largest absolute sample of `band` over the last `duration_secs`.
    pub fn peak(&self, band: Band, duration_secs: f32) -> f32 {
        self.buffer(band).peak(self.duration_to_range(duration_secs))
    }

    /// RMS of `band` over the last `duration_secs`.
    pub fn rms(&self, band: Band, duration_secs: f32) -> f32 {
        self.buffer(band).rms(self.duration_to_range(duration_secs))
    }

    /// Copies the newest `length` samples of `band` (oldest first) into the
    /// front of `dest`. `length` is capped at the history capacity; `dest`
    /// must hold the capped length. Returns the count written.
    pub fn copy_waveform(&self, band: Band, dest: &mut [f32], length: usize) -> Result<usize> {
        let buffer = self.buffer(band);
        let length = length.min(buffer.capacity());
        if dest.len() < length {
            return Err(AnalysisError::DestinationTooShort {
                needed: length,
                available: dest.len(),
            });
        }
        Ok(buffer.copy_recent(&mut dest[..length]))
    }

    /// Magnitude spectrum (`window/2` bins, DC dropped) of the latest raw block.
    pub fn spectrum(&self) -> Result<Vec<f32>> {
        let mut block = vec![0.0; self.analyzer.window_size()];
        self.history.spectral_window.copy_recent(&mut block);
        self.analyzer.analyze(&block)
    }

    /// Reduces the latest spectrum to `bands` averages in `dest`.
    ///
    /// Linear mode writes `bands` values, logarithmic mode writes `bands + 1`;
    /// `dest` is checked against that before anything is written. Returns
    /// the count written.
    pub fn band_averages(&self, mode: Averaging, dest: &mut [f32], bands: usize) -> Result<usize> {
        let needed = mode.output_len(bands)?;
        if dest.len() < needed {
            return Err(AnalysisError::DestinationTooShort {
                needed,
                available: dest.len(),
            });
        }

        let magnitude = self.spectrum()?;
        match mode {
            Averaging::Linear => SpectralAnalyzer::reduce_linear(&magnitude, &mut dest[..bands]),
            Averaging::Logarithmic => {
                self.analyzer
                    .reduce_log(&magnitude, self.sample_rate(), bands, dest)
            }
        }
    }
}

/// Owns the filter bank and feeds the shared history.
///
/// This is the producer role: one audio thread holds it and calls
/// [`feed`](Self::feed). Hand [`monitor`](Self::monitor) clones to readers.
/// `feed` never allocates, locks or logs.
#[derive(Debug)]
pub struct Coordinator {
    filters: FilterBank,
    crossover_hz: f32,
    q: f32,
    monitor: LevelMonitor,
}

impl Coordinator {
    pub fn new(config: &AnalysisConfig, sample_rate: f32) -> Result<Self> {
        config.validate()?;
        config.validate_for_rate(sample_rate)?;

        let bands = [
            RingBuffer::new(config.history_capacity)?,
            RingBuffer::new(config.history_capacity)?,
            RingBuffer::new(config.history_capacity)?,
            RingBuffer::new(config.history_capacity)?,
        ];
        let analyzer = SpectralAnalyzer::new(config.spectrum_window)?;
        let history = History {
            bands,
            spectral_window: RingBuffer::new(config.spectrum_window)?,
            sample_rate: AtomicF32::new(sample_rate),
        };

        info!(
            "Analysis core ready: {} Hz, crossover {} Hz (Q {}), history {} samples, FFT {}",
            sample_rate,
            config.crossover_hz,
            config.q,
            config.history_capacity,
            config.spectrum_window
        );

        Ok(Self {
            filters: FilterBank::new(sample_rate, config.crossover_hz, config.q),
            crossover_hz: config.crossover_hz,
            q: config.q,
            monitor: LevelMonitor {
                history: Arc::new(history),
                analyzer: Arc::new(analyzer),
            },
        })
    }

    /// Default sizes with the standard 960 Hz / Q 0.15 crossover.
    pub fn with_sample_rate(sample_rate: f32) -> Result<Self> {
        Self::new(&AnalysisConfig::default(), sample_rate)
    }

    pub fn monitor(&self) -> LevelMonitor {
        self.monitor.clone()
    }

    pub fn sample_rate(&self) -> f32 {
        self.monitor.sample_rate()
    }

    /// Routes one sample into the raw history, the three band histories and
    /// the spectral window.
    #[inline]
    pub fn feed(&mut self, sample: f32) {
        let history = &self.monitor.history;
        history.bands[0].push(sample);

        let split = self.filters.process(sample);
        history.bands[1].push(split.low);
        history.bands[2].push(split.mid);
        history.bands[3].push(split.high);

        history.spectral_window.push(sample);
    }

    pub fn feed_block(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.feed(sample);
        }
    }

    /// Averages each interleaved frame of `channels` samples down to mono
    /// before feeding it. A trailing partial frame is dropped.
    pub fn feed_interleaved(&mut self, samples: &[f32], channels: usize) {
        if channels <= 1 {
            self.feed_block(samples);
            return;
        }
        let norm = 1.0 / channels as f32;
        for frame in samples.chunks_exact(channels) {
            self.feed(frame.iter().sum::<f32>() * norm);
        }
    }

    /// Re-derives the filter bank for a new rate, keeping the configured
    /// crossover and Q (960 Hz / 0.15 unless the config says otherwise).
    /// Histories and the spectral window are kept as they are, so they
    /// briefly hold samples taken at the old rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<()> {
        if sample_rate == self.sample_rate() {
            return Ok(());
        }
        let usable = sample_rate > 0.0 && sample_rate.is_finite();
        if !usable || self.crossover_hz >= sample_rate / 2.0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }

        debug!(
            "Sample rate {} -> {} Hz, reconfiguring filter bank",
            self.sample_rate(),
            sample_rate
        );
        self.filters.configure(sample_rate, self.crossover_hz, self.q);
        self.monitor.history.sample_rate.store(sample_rate, Ordering::Release);
        Ok(())
    }

    /// Zero-fills every history and clears the filter registers.
    pub fn clear_history(&mut self) {
        let history = &self.monitor.history;
        history.bands.iter().for_each(RingBuffer::clear);
        history.spectral_window.clear();
        self.filters.reset();
    }

    pub fn filter_bank(&self) -> &FilterBank {
        &self.filters
    }

    pub fn peak(&self, band: Band, duration_secs: f32) -> f32 {
        self.monitor.peak(band, duration_secs)
    }

    pub fn rms(&self, band: Band, duration_secs: f32) -> f32 {
        self.monitor.rms(band, duration_secs)
    }

    pub fn copy_waveform(&self, band: Band, dest: &mut [f32], length: usize) -> Result<usize> {
        self.monitor.copy_waveform(band, dest, length)
    }

    pub fn band_averages(&self, mode: Averaging, dest: &mut [f32], bands: usize) -> Result<usize> {
        self.monitor.band_averages(mode, dest, bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 48_000.0;

    #[test]
    fn test_band_from_index() {
        assert_eq!(Band::try_from(0i64).unwrap(), Band::Raw);
        assert_eq!(Band::try_from(3usize).unwrap(), Band::High);
        assert!(matches!(Band::try_from(4i64), Err(AnalysisError::InvalidBand(4))));
        assert!(matches!(Band::try_from(-1i64), Err(AnalysisError::InvalidBand(-1))));
        assert_eq!(Band::Mid.index(), 2);
    }

    #[test]
    fn test_feed_fills_all_histories() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_block(&vec![0.5; 4_800]);

        assert_eq!(core.peak(Band::Raw, 0.01), 0.5);
        assert!((core.rms(Band::Raw, 0.01) - 0.5).abs() < 1e-6);
        assert!(core.peak(Band::Low, 0.01) > 0.4);
        assert!(core.peak(Band::High, 0.001) < 0.01);
    }

    #[test]
    fn test_duration_maps_to_sample_count() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed(1.0);
        // 48 silent samples push the spike out of a 1 ms window.
        core.feed_block(&[0.0; 48]);
        assert_eq!(core.peak(Band::Raw, 0.001), 0.0);
        assert_eq!(core.peak(Band::Raw, 0.002), 1.0);
        // Zero and negative durations still look at the newest sample.
        assert_eq!(core.peak(Band::Raw, 0.0), 0.0);
        assert_eq!(core.rms(Band::Raw, -1.0), 0.0);
    }

    #[test]
    fn test_copy_waveform_validates_destination() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_block(&[0.1, 0.2, 0.3]);

        let mut dest = [0.0f32; 3];
        assert_eq!(core.copy_waveform(Band::Raw, &mut dest, 3).unwrap(), 3);
        assert_eq!(dest, [0.1, 0.2, 0.3]);

        let mut short = [0.0f32; 2];
        assert!(matches!(
            core.copy_waveform(Band::Raw, &mut short, 3),
            Err(AnalysisError::DestinationTooShort { needed: 3, available: 2 })
        ));
        assert_eq!(short, [0.0, 0.0]);

        // Requests past capacity are capped.
        let mut large = vec![0.0f32; 4_096];
        assert_eq!(core.copy_waveform(Band::Raw, &mut large, 4_096).unwrap(), 2_048);
        assert_eq!(large[2_047], 0.3);
    }

    #[test]
    fn test_feed_interleaved_downmixes() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_interleaved(&[1.0, 0.0, 0.5, 0.5, 0.9], 2);

        let mut dest = [0.0f32; 2];
        core.copy_waveform(Band::Raw, &mut dest, 2).unwrap();
        assert_eq!(dest, [0.5, 0.5]);
    }

    #[test]
    fn test_set_sample_rate_keeps_history() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_block(&[0.25; 16]);
        let before = core.filter_bank().sections()[0].coefficients();

        core.set_sample_rate(RATE).unwrap();
        assert_eq!(core.filter_bank().sections()[0].coefficients(), before);

        core.set_sample_rate(44_100.0).unwrap();
        assert_eq!(core.sample_rate(), 44_100.0);
        assert_ne!(core.filter_bank().sections()[0].coefficients(), before);
        assert_eq!(core.peak(Band::Raw, 1.0), 0.25);

        assert!(core.set_sample_rate(0.0).is_err());
        assert!(core.set_sample_rate(1_000.0).is_err());
        assert_eq!(core.sample_rate(), 44_100.0);
    }

    #[test]
    fn test_monitor_sees_producer_writes() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        let monitor = core.monitor();
        core.feed(-0.6);
        assert_eq!(monitor.peak(Band::Raw, 0.1), 0.6);

        core.set_sample_rate(44_100.0).unwrap();
        assert_eq!(monitor.sample_rate(), 44_100.0);
    }

    #[test]
    fn test_band_averages_shapes() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        let tone: Vec<f32> = (0..512)
            .map(|i| (2.0 * std::f32::consts::PI * 3_000.0 * i as f32 / RATE).sin())
            .collect();
        core.feed_block(&tone);

        let mut linear = [0.0f32; 16];
        assert_eq!(core.band_averages(Averaging::Linear, &mut linear, 16).unwrap(), 16);
        // 3 kHz lands in bin 8 -> magnitude index 7 -> band 1 of 16 (4 bins each).
        let loudest = linear
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(loudest, 1);

        let mut log = [0.0f32; 18];
        assert_eq!(core.band_averages(Averaging::Logarithmic, &mut log, 17).unwrap(), 18);

        let mut short = [0.0f32; 17];
        assert!(core.band_averages(Averaging::Logarithmic, &mut short, 17).is_err());
    }

    #[test]
    fn test_band_averages_rejects_huge_band_counts() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_block(&[0.5; 256]);

        let mut dest = [-1.0f32; 18];
        assert!(matches!(
            core.band_averages(Averaging::Logarithmic, &mut dest, usize::MAX),
            Err(AnalysisError::InvalidBandCount { requested: usize::MAX, .. })
        ));
        assert!(matches!(
            core.band_averages(Averaging::Linear, &mut dest, usize::MAX),
            Err(AnalysisError::DestinationTooShort { needed: usize::MAX, available: 18 })
        ));
        assert!(dest.iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_clear_history() {
        let mut core = Coordinator::with_sample_rate(RATE).unwrap();
        core.feed_block(&[1.0; 64]);
        core.clear_history();
        for band in Band::ALL {
            assert_eq!(core.peak(band, 1.0), 0.0, "{}", band.name());
        }
        assert!(core.monitor().spectrum().unwrap().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = AnalysisConfig {
            history_capacity: 100,
            ..AnalysisConfig::default()
        };
        assert!(Coordinator::new(&config, RATE).is_err());
        assert!(Coordinator::with_sample_rate(-1.0).is_err());
    }
}
