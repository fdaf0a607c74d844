//! Property-based tests for tmst-core filter primitives.
//!
//! Tests filter stability and ERB-scale monotonicity using proptest for
//! randomized input generation.

use proptest::prelude::*;
use tmst_core::{
    Biquad, GAMMATONE_ERB_FACTOR, GammatoneFilter, butterworth_bandpass_coefficients, erb_bandwidth,
    erb_rate_to_hz, hz_to_erb_rate,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any modulation band whose upper edge stays below Nyquist yields a
    /// stable section with finite output for random finite input.
    #[test]
    fn butterworth_bandpass_stability(
        center in 0.1f64..2000.0f64,
        q in 0.5f64..4.0f64,
        sample_rate in prop::sample::select(vec![1000.0f64, 16000.0, 44100.0, 48000.0]),
        input in prop::array::uniform32(-1.0f64..=1.0f64),
    ) {
        let bw = center / q;
        let (low, high) = (center - bw / 2.0, center + bw / 2.0);
        prop_assume!(low > 0.0 && high < sample_rate / 2.0);

        let mut biquad = Biquad::from_coefficients(butterworth_bandpass_coefficients(low, high, sample_rate));
        prop_assert!(biquad.is_stable(), "unstable band {}..{} at {}", low, high, sample_rate);

        for &sample in &input {
            let out = biquad.process(sample);
            prop_assert!(out.is_finite(), "non-finite output {} for band {}..{}", out, low, high);
        }
    }

    /// Gammatone channels never diverge: bounded input gives bounded output.
    #[test]
    fn gammatone_bounded_output(
        center in 50.0f64..7500.0f64,
        order in 1usize..=8,
        input in prop::collection::vec(-1.0f64..=1.0f64, 256),
    ) {
        let mut filter = GammatoneFilter::new(center, GAMMATONE_ERB_FACTOR * erb_bandwidth(center), order, 16000.0);
        for &sample in &input {
            let out = filter.process(sample);
            prop_assert!(out.is_finite());
            // Unity peak gain: output magnitude stays within the L1 norm of the
            // impulse response, which is a few units at most for these bandwidths.
            prop_assert!(out.abs() < 64.0, "gammatone output {} exploded", out);
        }
    }

    /// ERB-rate is strictly increasing and invertible.
    #[test]
    fn erb_rate_monotonic(a in 1.0f64..20000.0f64, b in 1.0f64..20000.0f64) {
        prop_assume!(a < b);
        prop_assert!(hz_to_erb_rate(a) < hz_to_erb_rate(b));
        let back = erb_rate_to_hz(hz_to_erb_rate(a));
        prop_assert!((back - a).abs() < 1e-6 * a);
    }
}
