//! Biquad (bi-quadratic) filter structure.
//!
//! Provides a generic second-order IIR filter used by the modulation
//! filterbank. Coefficients come from a bilinear-transformed first-order
//! Butterworth bandpass prototype ([`butterworth_bandpass_coefficients`]).
//!
//! All arithmetic is `f64`: modulation filters at sub-hertz centre
//! frequencies place their poles within 1e-4 of the unit circle at audio
//! sample rates, where single precision coefficients are no longer stable.

use core::f64::consts::PI;
use libm::{cos, fabs, sin, sqrt, tan};

/// Generic biquad filter coefficients and state.
///
/// Implements the Direct Form I biquad structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    /// Feedforward coefficients
    b0: f64,
    b1: f64,
    b2: f64,

    /// Feedback coefficients (normalized by a0)
    a1: f64,
    a2: f64,

    /// Input delay line: x[n-1], x[n-2]
    x1: f64,
    x2: f64,

    /// Output delay line: y[n-1], y[n-2]
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Creates a new biquad with passthrough coefficients.
    ///
    /// Initial state: `y[n] = x[n]` (no filtering)
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Creates a biquad from a `(b0, b1, b2, a0, a1, a2)` coefficient tuple.
    pub fn from_coefficients(coefficients: (f64, f64, f64, f64, f64, f64)) -> Self {
        let (b0, b1, b2, a0, a1, a2) = coefficients;
        let mut biquad = Self::new();
        biquad.set_coefficients(b0, b1, b2, a0, a1, a2);
        biquad
    }

    /// Sets the biquad coefficients.
    ///
    /// # Arguments
    ///
    /// * `b0, b1, b2` - Feedforward coefficients
    /// * `a0, a1, a2` - Feedback coefficients (a0 is typically 1.0)
    ///
    /// Note: This function normalizes by a0 internally.
    pub fn set_coefficients(&mut self, b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }

    /// Processes a single sample through the biquad filter.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Filters a buffer in place, starting from the current state.
    pub fn process_in_place(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clears the filter state (delay lines).
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Returns true when both poles lie strictly inside the unit circle.
    ///
    /// Uses the stability triangle for `1 + a1 z^-1 + a2 z^-2`.
    pub fn is_stable(&self) -> bool {
        fabs(self.a2) < 1.0 && fabs(self.a1) < 1.0 + self.a2
    }

    /// Magnitude of the frequency response at `frequency` Hz.
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (c1, s1) = (cos(w), sin(w));
        let (c2, s2) = (cos(2.0 * w), sin(2.0 * w));

        // H(e^jw) = (b0 + b1 e^-jw + b2 e^-2jw) / (1 + a1 e^-jw + a2 e^-2jw)
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let den = sqrt(den_re * den_re + den_im * den_im);
        if den == 0.0 {
            return 0.0;
        }
        sqrt(num_re * num_re + num_im * num_im) / den
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculates first-order Butterworth band-pass coefficients.
///
/// The analog prototype `H(s) = B s / (s^2 + B s + w0^2)` is mapped with the
/// bilinear transform after pre-warping both edges, so the -3 dB points land
/// exactly on `low_hz` and `high_hz`. This matches `butter(1, [lo, hi])` and
/// yields a single second-order section with unity gain at the geometric
/// center frequency.
///
/// # Arguments
///
/// * `low_hz` - Lower -3 dB edge in Hz (must be > 0)
/// * `high_hz` - Upper -3 dB edge in Hz (must be < Nyquist)
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
///
/// (b0, b1, b2, a0, a1, a2) coefficients
pub fn butterworth_bandpass_coefficients(
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
) -> (f64, f64, f64, f64, f64, f64) {
    let k = 2.0 * sample_rate;
    let wl = k * tan(PI * low_hz / sample_rate);
    let wh = k * tan(PI * high_hz / sample_rate);
    let bw = wh - wl;
    let w0_sq = wl * wh;
    let k_sq = k * k;

    let b0 = bw * k;
    let b1 = 0.0;
    let b2 = -bw * k;
    let a0 = k_sq + bw * k + w0_sq;
    let a1 = 2.0 * (w0_sq - k_sq);
    let a2 = k_sq - bw * k + w0_sq;

    (b0, b1, b2, a0, a1, a2)
}
