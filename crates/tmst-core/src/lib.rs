//! TMST Core - filter primitives for temporal modulation analysis
//!
//! This crate provides the leaf-level building blocks used by
//! `tmst-analysis`: the filters that make up the peripheral (auditory) and
//! modulation filterbanks, the auditory frequency scale, and a few signal
//! statistics.
//!
//! ## Filters
//!
//! - [`Biquad`] - Second-order IIR section (Direct Form I, `f64`)
//! - [`butterworth_bandpass_coefficients`] - First-order Butterworth bandpass design
//! - [`GammatoneFilter`] - Complex all-pole gammatone approximation
//!
//! ## Auditory scale
//!
//! - [`erb_bandwidth`], [`hz_to_erb_rate`], [`erb_rate_to_hz`], [`erb_space`]
//!
//! ## Utilities
//!
//! - [`mean`], [`mean_square`], [`seconds_to_samples`], [`all_finite`]
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature in
//! your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tmst-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use tmst_core::{Biquad, butterworth_bandpass_coefficients};
//!
//! // 4 Hz modulation band with Q = 1: edges at 2 and 6 Hz
//! let mut band = Biquad::from_coefficients(butterworth_bandpass_coefficients(2.0, 6.0, 1000.0));
//! let y = band.process(1.0);
//! assert!(y.is_finite());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod erb;
pub mod gammatone;
pub mod math;

pub use biquad::{Biquad, butterworth_bandpass_coefficients};
pub use erb::{erb_bandwidth, erb_channel_count, erb_rate_to_hz, erb_space, hz_to_erb_rate};
pub use gammatone::{
    GAMMATONE_ERB_FACTOR, GammatoneFilter, MAX_GAMMATONE_ORDER, gammatone_group_delay,
};
pub use math::{all_finite, mean, mean_square, seconds_to_samples};
