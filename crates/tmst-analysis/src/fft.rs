//! FFT wrapper with precomputed forward and inverse plans.

use rustfft::{FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// FFT processor for one fixed length.
///
/// Both plans are planned once at construction. The processor is
/// `Send + Sync`, so a single instance can be shared by every channel of a
/// filterbank when they all have the same length.
#[derive(Clone)]
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl core::fmt::Debug for Fft {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fft").field("size", &self.size).finish()
    }
}

impl Fft {
    /// Create a new FFT processor for the given size.
    ///
    /// Any size is accepted; rustfft handles non-power-of-two lengths with
    /// mixed-radix and Bluestein plans.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f64>]) {
        self.fft.process(buffer);
    }

    /// Perform inverse FFT on complex buffer (in-place), normalized by `1/size`.
    pub fn inverse_complex(&self, buffer: &mut [Complex<f64>]) {
        self.ifft.process(buffer);

        let scale = 1.0 / self.size as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn spectrum_of(fft: &Fft, input: &[f64]) -> Vec<Complex<f64>> {
        let mut buffer: Vec<Complex<f64>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.forward_complex(&mut buffer);
        buffer
    }

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(250);

        let input: Vec<f64> = (0..250)
            .map(|i| (2.0 * PI * 10.0 * i as f64 / 250.0).sin())
            .collect();

        let mut spectrum = spectrum_of(&fft, &input);
        fft.inverse_complex(&mut spectrum);

        for (a, b) in input.iter().zip(spectrum.iter()) {
            assert!((a - b.re).abs() < 1e-10, "Mismatch: {} vs {}", a, b.re);
            assert!(b.im.abs() < 1e-10);
        }
    }

    #[test]
    fn test_dc_detection() {
        let fft = Fft::new(256);

        let spectrum = spectrum_of(&fft, &[1.0; 256]);

        let dc_mag = spectrum[0].norm();
        let other_mag: f64 = spectrum[1..].iter().map(|c| c.norm()).sum();

        assert!((dc_mag - 256.0).abs() < 1e-9);
        assert!(other_mag < 1e-6);
    }

    #[test]
    fn test_sine_peak_bin() {
        let fft = Fft::new(128);
        let input: Vec<f64> = (0..128)
            .map(|i| (2.0 * PI * 8.0 * i as f64 / 128.0).cos())
            .collect();
        let spectrum = spectrum_of(&fft, &input);

        let peak = (0..64)
            .max_by(|&a, &b| spectrum[a].norm().total_cmp(&spectrum[b].norm()))
            .unwrap();
        assert_eq!(peak, 8);
    }
}
