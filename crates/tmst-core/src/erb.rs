//! Equivalent-rectangular-bandwidth (ERB) auditory scale.
//!
//! Uses the Glasberg & Moore (1990) constants:
//!
//! ```text
//! ERB(f)      = 24.7 + f / 9.265
//! ERB-rate(f) = 9.265 * ln(1 + f / (24.7 * 9.265))
//! ```

use libm::{exp, log};

const EAR_Q: f64 = 9.265;
const MIN_BW: f64 = 24.7;

/// Bandwidth in Hz of the auditory filter centered at `freq_hz`.
#[inline]
pub fn erb_bandwidth(freq_hz: f64) -> f64 {
    MIN_BW + freq_hz / EAR_Q
}

/// Converts a frequency in Hz to ERB-rate (number of ERBs below `freq_hz`).
#[inline]
pub fn hz_to_erb_rate(freq_hz: f64) -> f64 {
    EAR_Q * log(1.0 + freq_hz / (MIN_BW * EAR_Q))
}

/// Converts an ERB-rate value back to frequency in Hz.
#[inline]
pub fn erb_rate_to_hz(erb_rate: f64) -> f64 {
    MIN_BW * EAR_Q * (exp(erb_rate / EAR_Q) - 1.0)
}

/// Fills `out` with frequencies equally spaced on the ERB-rate scale,
/// `out[0] = low_hz` and `out[len-1] = high_hz`.
///
/// A single-element slice receives the ERB-rate midpoint of the range.
pub fn erb_space(low_hz: f64, high_hz: f64, out: &mut [f64]) {
    let n = out.len();
    if n == 0 {
        return;
    }
    let lo = hz_to_erb_rate(low_hz);
    let hi = hz_to_erb_rate(high_hz);
    if n == 1 {
        out[0] = erb_rate_to_hz(0.5 * (lo + hi));
        return;
    }
    let step = (hi - lo) / (n - 1) as f64;

    for (i, f) in out.iter_mut().enumerate() {
        *f = erb_rate_to_hz(lo + step * i as f64);
    }
    // Pin the end point against rounding in the round trip
    out[n - 1] = high_hz;
}

/// Number of channels needed to span `[low_hz, high_hz]` at `step_erb` spacing.
pub fn erb_channel_count(low_hz: f64, high_hz: f64, step_erb: f64) -> usize {
    if step_erb <= 0.0 || high_hz <= low_hz {
        return 0;
    }
    let span = hz_to_erb_rate(high_hz) - hz_to_erb_rate(low_hz);
    // floor(span/step) + 1 channels, matching 1-ERB spacing from low_hz upward
    (span / step_erb) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erb_known_values() {
        // ERB at 1 kHz is about 132.6 Hz
        assert!((erb_bandwidth(1000.0) - 132.63).abs() < 0.1);
        assert!((erb_bandwidth(0.0) - 24.7).abs() < 1e-12);
    }

    #[test]
    fn test_erb_rate_roundtrip() {
        for &f in &[20.0, 70.0, 440.0, 1000.0, 6700.0, 16000.0] {
            let back = erb_rate_to_hz(hz_to_erb_rate(f));
            assert!((back - f).abs() < 1e-6 * f, "{f} -> {back}");
        }
    }

    #[test]
    fn test_erb_space_endpoints_and_monotonic() {
        let mut freqs = [0.0; 16];
        erb_space(70.0, 6700.0, &mut freqs);
        assert!((freqs[0] - 70.0).abs() < 1e-9);
        assert_eq!(freqs[15], 6700.0);
        for pair in freqs.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_erb_space_single() {
        let mut freqs = [0.0; 1];
        erb_space(100.0, 200.0, &mut freqs);
        assert!(freqs[0] > 100.0 && freqs[0] < 200.0);
        let mid = 0.5 * (hz_to_erb_rate(100.0) + hz_to_erb_rate(200.0));
        assert!((hz_to_erb_rate(freqs[0]) - mid).abs() < 1e-9);
    }

    #[test]
    fn test_channel_count() {
        // 70-6700 Hz spans roughly 31 ERBs
        let n = erb_channel_count(70.0, 6700.0, 1.0);
        assert!((30..=33).contains(&n), "got {n}");
        assert_eq!(erb_channel_count(100.0, 50.0, 1.0), 0);
        assert_eq!(erb_channel_count(100.0, 500.0, 0.0), 0);
    }
}
