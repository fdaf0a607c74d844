//! Hilbert transform for computing analytic signals.
//!
//! The Hilbert envelope of each auditory channel is the input to the
//! modulation stage, so the transform runs at the exact channel length: no
//! zero padding, no truncation.
//!
//! # Algorithm
//!
//! 1. Compute FFT of the real signal
//! 2. Zero out negative frequencies (bins N/2+1 to N-1)
//! 3. Double positive frequencies (bins 1 to N/2-1, or to (N-1)/2 for odd N)
//! 4. Keep DC and Nyquist (even N only) unchanged
//! 5. Inverse FFT gives the analytic signal
//!
//! The envelope is the magnitude of the analytic signal.
//!
//! # Example
//!
//! ```rust
//! use tmst_analysis::hilbert::HilbertTransform;
//! use std::f64::consts::PI;
//!
//! let signal: Vec<f64> = (0..1000)
//!     .map(|i| (2.0 * PI * 10.0 * i as f64 / 1000.0).sin())
//!     .collect();
//!
//! let hilbert = HilbertTransform::new(signal.len());
//! let amplitude = hilbert.instantaneous_amplitude(&signal);
//! assert!((amplitude[500] - 1.0).abs() < 1e-6);
//! ```

use crate::fft::Fft;
use rustfft::num_complex::Complex;

/// Hilbert transform processor for signals of one fixed length.
#[derive(Debug, Clone)]
pub struct HilbertTransform {
    fft: Fft,
    len: usize,
}

impl HilbertTransform {
    /// Create a Hilbert transform processor for signals of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            fft: Fft::new(len),
            len,
        }
    }

    /// Signal length this processor was planned for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length processor.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Compute the analytic signal `z(t) = x(t) + i*H{x(t)}`.
    ///
    /// Input shorter than the planned length is zero-padded; longer input is
    /// truncated. The result always has `min(signal.len(), len)` samples.
    pub fn analytic_signal(&self, signal: &[f64]) -> Vec<Complex<f64>> {
        let n = signal.len().min(self.len);
        if n == 0 {
            return Vec::new();
        }

        let mut buffer: Vec<Complex<f64>> = signal[..n]
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.len, Complex::new(0.0, 0.0));

        self.fft.forward_complex(&mut buffer);

        // Positive bins 1..ceil(N/2) doubled; Nyquist (even N) kept as is
        let positive_end = self.len.div_ceil(2);
        for sample in buffer.iter_mut().take(positive_end).skip(1) {
            *sample *= 2.0;
        }
        let negative_start = self.len / 2 + 1;
        for sample in buffer.iter_mut().skip(negative_start) {
            *sample = Complex::new(0.0, 0.0);
        }

        self.fft.inverse_complex(&mut buffer);

        buffer.truncate(n);
        buffer
    }

    /// Compute the instantaneous amplitude (envelope) of the signal.
    ///
    /// Never negative. An all-zero input yields an all-zero envelope.
    pub fn instantaneous_amplitude(&self, signal: &[f64]) -> Vec<f64> {
        self.analytic_signal(signal)
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}
