//! Mathematical utility functions for signal statistics.
//!
//! All functions are allocation-free and suitable for `no_std`. Empty
//! slices return `0.0` instead of dividing by zero.
//!
//! - [`mean`] / [`mean_square`] - Moments of a buffer
//! - [`seconds_to_samples`] - Time conversion
//! - [`all_finite`] - NaN/inf scan

use libm::ceil;

/// Arithmetic mean of a buffer.
///
/// # Example
/// ```rust
/// use tmst_core::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
/// assert_eq!(mean(&[]), 0.0);
/// ```
#[inline]
pub fn mean(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().sum::<f64>() / signal.len() as f64
}

/// Mean squared amplitude (power) of a buffer.
#[inline]
pub fn mean_square(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().map(|&x| x * x).sum::<f64>() / signal.len() as f64
}

/// Convert a duration in seconds to a whole number of samples, rounding up.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> usize {
    if seconds <= 0.0 || sample_rate <= 0.0 {
        return 0;
    }
    ceil(seconds * sample_rate) as usize
}

/// Returns true when no sample is NaN or infinite.
#[inline]
pub fn all_finite(signal: &[f64]) -> bool {
    signal.iter().all(|x| x.is_finite())
}
