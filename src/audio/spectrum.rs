use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AnalysisError, Result};

/// Default spectral window length (samples).
pub const DEFAULT_WINDOW_SIZE: usize = 128;

/// Lowest octave width used by logarithmic averaging.
pub const MIN_BANDWIDTH_HZ: f32 = 60.0;

/// How magnitude bins are grouped into display bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    #[default]
    Linear,
    Logarithmic,
}

impl TryFrom<u32> for Averaging {
    type Error = AnalysisError;

    fn try_from(mode: u32) -> Result<Self> {
        match mode {
            0 => Ok(Averaging::Linear),
            1 => Ok(Averaging::Logarithmic),
            other => Err(AnalysisError::InvalidAveraging(other)),
        }
    }
}

impl Averaging {
    /// Output slots needed for `bands` requested bands. Logarithmic averaging
    /// writes one extra slot; callers depend on that shape.
    pub fn output_len(self, bands: usize) -> Result<usize> {
        match self {
            Averaging::Linear => Ok(bands),
            Averaging::Logarithmic => bands.checked_add(1).ok_or(AnalysisError::InvalidBandCount {
                requested: bands,
                max: usize::MAX - 1,
            }),
        }
    }
}

/// Hann-windowed FFT over a fixed power-of-two block, reduced to band averages.
pub struct SpectralAnalyzer {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(AnalysisError::NotPowerOfTwo {
                what: "spectral window",
                value: size,
            });
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        Ok(Self {
            size,
            fft,
            window: Self::hann_window(size),
        })
    }

    // Periodic Hann: w[i] = 0.5 * (1 - cos(2*pi*i/N)).
    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    pub fn window_size(&self) -> usize {
        self.size
    }

    /// Number of magnitude values `analyze` produces.
    pub fn bin_count(&self) -> usize {
        self.size / 2
    }

    /// Windows `samples` (exactly `window_size` long) and returns the
    /// magnitudes of FFT bins `1..=N/2`. The DC bin is dropped.
    pub fn analyze(&self, samples: &[f32]) -> Result<Vec<f32>> {
        if samples.len() != self.size {
            return Err(AnalysisError::WindowLength {
                expected: self.size,
                actual: samples.len(),
            });
        }

        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .zip(&self.window)
            .map(|(&x, &w)| Complex::new(x * w, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        Ok(buffer[1..=self.size / 2]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect())
    }

    /// Splits `magnitude` into `dest.len()` contiguous groups of
    /// `floor(bins / dest.len())` bins and writes each group's mean.
    ///
    /// The mean divides by the number of bins actually summed. Trailing bins
    /// that do not fill a whole group are ignored.
    pub fn reduce_linear(magnitude: &[f32], dest: &mut [f32]) -> Result<usize> {
        let bands = dest.len();
        if bands == 0 || bands > magnitude.len() {
            return Err(AnalysisError::InvalidBandCount {
                requested: bands,
                max: magnitude.len(),
            });
        }

        let width = magnitude.len() / bands;
        for (slot, group) in dest.iter_mut().zip(magnitude.chunks_exact(width)) {
            *slot = group.iter().sum::<f32>() / group.len() as f32;
        }
        Ok(bands)
    }

    /// Octave count above [`MIN_BANDWIDTH_HZ`]: Nyquist is halved until it
    /// no longer exceeds the minimum bandwidth.
    pub fn octave_count(sample_rate: f32) -> Result<usize> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }

        let mut octaves = 1;
        let mut freq = sample_rate / 2.0;
        loop {
            freq /= 2.0;
            if freq <= MIN_BANDWIDTH_HZ {
                break;
            }
            octaves += 1;
        }
        Ok(octaves)
    }

    /// `[lo, hi)` frequency pairs averaged by [`reduce_log`](Self::reduce_log)
    /// for `bands` requested bands, lowest first.
    pub fn log_band_edges(sample_rate: f32, bands: usize) -> Result<Vec<(f32, f32)>> {
        let octaves = Self::octave_count(sample_rate)?;
        let per_octave = Averaging::Logarithmic.output_len(bands)? / octaves;
        if per_octave == 0 {
            return Err(AnalysisError::TooFewLogBands {
                requested: bands,
                octaves,
            });
        }

        let nyquist = sample_rate / 2.0;
        let mut edges = Vec::with_capacity(octaves * per_octave);
        for i in 0..octaves {
            let lo = if i == 0 {
                0.0
            } else {
                nyquist / 2f32.powi((octaves - i) as i32)
            };
            let hi = nyquist / 2f32.powi((octaves - i - 1) as i32);
            let step = (hi - lo) / per_octave as f32;

            let mut freq = lo;
            for _ in 0..per_octave {
                edges.push((freq, freq + step));
                freq += step;
            }
        }
        Ok(edges)
    }

    /// Octave-grouped averages. Writes `bands + 1` values into `dest`, which
    /// must hold at least that many; slots past the last whole octave group
    /// are zeroed. Returns the number of slots written (`bands + 1`).
    pub fn reduce_log(
        &self,
        magnitude: &[f32],
        sample_rate: f32,
        bands: usize,
        dest: &mut [f32],
    ) -> Result<usize> {
        let out_len = Averaging::Logarithmic.output_len(bands)?;
        if dest.len() < out_len {
            return Err(AnalysisError::DestinationTooShort {
                needed: out_len,
                available: dest.len(),
            });
        }
        if magnitude.is_empty() {
            return Err(AnalysisError::InvalidBandCount {
                requested: bands,
                max: 0,
            });
        }

        let edges = Self::log_band_edges(sample_rate, bands)?;
        let dest = &mut dest[..out_len];
        dest.fill(0.0);

        for (slot, &(lo, hi)) in dest.iter_mut().zip(&edges) {
            let first = self.freq_to_index(lo, sample_rate, magnitude.len());
            let last = self.freq_to_index(hi, sample_rate, magnitude.len());
            let group = &magnitude[first..=last.max(first)];
            *slot = group.iter().sum::<f32>() / group.len() as f32;
        }
        Ok(out_len)
    }

    // floor(N * f / rate), clamped to the magnitude range.
    fn freq_to_index(&self, freq: f32, sample_rate: f32, bins: usize) -> usize {
        let index = (self.size as f32 * freq / sample_rate).floor().max(0.0) as usize;
        index.min(bins - 1)
    }
}
