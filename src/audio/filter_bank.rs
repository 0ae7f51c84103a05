use super::biquad::{Coefficients, FilterSection};

pub const DEFAULT_CROSSOVER_HZ: f32 = 960.0;
pub const DEFAULT_Q: f32 = 0.15;

/// Output of one sample through the bank.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandSample {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

/// Three-band crossover built from six biquads.
///
/// Each band cascades two identical sections for a 24 dB/oct slope:
/// `[low1, low2, band1, band2, high1, high2]`.
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    sections: [FilterSection; 6],
}

impl FilterBank {
    pub fn new(sample_rate: f32, crossover_hz: f32, q: f32) -> Self {
        let mut bank = Self::default();
        bank.configure(sample_rate, crossover_hz, q);
        bank
    }

    /// Re-derives all coefficients from `crossover_hz / sample_rate`.
    /// Registers are kept, so a short transient follows.
    pub fn configure(&mut self, sample_rate: f32, crossover_hz: f32, q: f32) {
        let fc = crossover_hz / sample_rate;
        let low = Coefficients::lowpass(fc, q);
        let mid = Coefficients::bandpass(fc, q);
        let high = Coefficients::highpass(fc, q);

        for (i, section) in self.sections.iter_mut().enumerate() {
            section.set_coefficients(match i / 2 {
                0 => low,
                1 => mid,
                _ => high,
            });
        }
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> BandSample {
        let [low1, low2, band1, band2, high1, high2] = &mut self.sections;
        BandSample {
            low: low2.feed_sample(low1.feed_sample(sample)),
            mid: band2.feed_sample(band1.feed_sample(sample)),
            high: high2.feed_sample(high1.feed_sample(sample)),
        }
    }

    pub fn reset(&mut self) {
        self.sections.iter_mut().for_each(FilterSection::reset);
    }

    pub fn sections(&self) -> &[FilterSection; 6] {
        &self.sections
    }
}
