use std::f32::consts::PI;

/// Feed-forward (`a*`) and feedback (`b*`) terms of one second-order section.
///
/// Design formulas follow the EarLevel Engineering biquad derivation with the
/// bilinear transform prewarped through `K = tan(pi * Fc)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
}

impl Default for Coefficients {
    /// Unity pass-through.
    fn default() -> Self {
        Self {
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
        }
    }
}

impl Coefficients {
    /// `fc` is normalized (cycles per sample, 0 < fc < 0.5), `q` must be > 0.
    /// Out-of-range arguments give a numerically meaningless filter, not an error.
    pub fn lowpass(fc: f32, q: f32) -> Self {
        let (k, norm, b1, b2) = Self::poles(fc, q);
        let a0 = k * k * norm;
        Self {
            a0,
            a1: 2.0 * a0,
            a2: a0,
            b1,
            b2,
        }
    }

    pub fn bandpass(fc: f32, q: f32) -> Self {
        let (k, norm, b1, b2) = Self::poles(fc, q);
        let a0 = k / q * norm;
        Self {
            a0,
            a1: 0.0,
            a2: -a0,
            b1,
            b2,
        }
    }

    pub fn highpass(fc: f32, q: f32) -> Self {
        let (_, norm, b1, b2) = Self::poles(fc, q);
        Self {
            a0: norm,
            a1: -2.0 * norm,
            a2: norm,
            b1,
            b2,
        }
    }

    // Shared by all three responses: (K, norm, b1, b2).
    fn poles(fc: f32, q: f32) -> (f32, f32, f32, f32) {
        let k = (PI * fc).tan();
        let norm = 1.0 / (1.0 + k / q + k * k);
        let b1 = 2.0 * (k * k - 1.0) * norm;
        let b2 = (1.0 - k / q + k * k) * norm;
        (k, norm, b1, b2)
    }

    /// Magnitude of the response at DC, `H(z = 1)`.
    pub fn dc_gain(&self) -> f32 {
        (self.a0 + self.a1 + self.a2) / (1.0 + self.b1 + self.b2)
    }
}

/// One transposed direct-form-II biquad stage.
///
/// Changing the response swaps the coefficient set wholesale and leaves
/// `z1`/`z2` alone, so the next few outputs blend the old and new responses.
/// Call [`FilterSection::reset`] to get a clean start instead.
#[derive(Debug, Clone, Default)]
pub struct FilterSection {
    coeffs: Coefficients,
    z1: f32,
    z2: f32,
}

impl FilterSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_lowpass(&mut self, fc: f32, q: f32) {
        self.coeffs = Coefficients::lowpass(fc, q);
    }

    pub fn set_bandpass(&mut self, fc: f32, q: f32) {
        self.coeffs = Coefficients::bandpass(fc, q);
    }

    pub fn set_highpass(&mut self, fc: f32, q: f32) {
        self.coeffs = Coefficients::highpass(fc, q);
    }

    pub fn set_coefficients(&mut self, coeffs: Coefficients) {
        self.coeffs = coeffs;
    }

    pub fn coefficients(&self) -> Coefficients {
        self.coeffs
    }

    #[inline]
    pub fn feed_sample(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = x * c.a0 + self.z1;
        self.z1 = x * c.a1 + self.z2 - c.b1 * y;
        self.z2 = x * c.a2 - c.b2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
