//! TMST Analysis - temporal modulation structure of recorded sound
//!
//! This crate turns a waveform into modulation-domain descriptors:
//!
//! - [`signal`] - Immutable sample buffer with its sample rate
//! - [`filterbank`] - ERB-spaced gammatone auditory filterbank
//! - [`hilbert`] - Hilbert transform for analytic signals
//! - [`envelope`] - Per-channel Hilbert envelopes
//! - [`modulation`] - Log-spaced modulation filterbank and its overlap bound
//! - [`mps`] - Modulation power spectrum (auditory x modulation frequency)
//! - [`periodicity`] - YIN-style periodicity and pitch-salience trace
//! - [`spectra`] - AM and f0 modulation spectra and scalograms
//! - [`features`] - Named scalar and array features
//! - [`pipeline`] - [`analyze`] and the reusable [`Analyzer`]
//! - [`fft`] - FFT wrapper used by the Hilbert transform
//!
//! ## Pipeline
//!
//! ```text
//! waveform -> auditory filterbank -> envelopes -> modulation filterbank -> MPS --+
//!     |                                                                           +-> FeatureSet
//!     +-> periodicity estimator ------------------------------------------------+
//! ```
//!
//! The channel stream and the periodicity stream run in parallel on the
//! rayon thread pool. Output does not depend on the number of threads.
//! The f0 modulation spectrum reads a second, denser periodicity trace
//! stepped every [`PeriodicityConfig::f0_track_hop`] samples.
//!
//! ## Example
//!
//! ```rust
//! use tmst_analysis::{
//!     Analyzer, MpsNormalization, PeriodicityConfig, Signal,
//!     build_auditory_filterbank, build_modulation_filterbank, features::names,
//! };
//!
//! let fs = 16_000.0;
//! let samples: Vec<f64> = (0..16_000)
//!     .map(|i| {
//!         let t = i as f64 / fs;
//!         let envelope = 1.0 + 0.5 * (2.0 * std::f64::consts::PI * 4.0 * t).sin();
//!         envelope * (2.0 * std::f64::consts::PI * 500.0 * t).sin()
//!     })
//!     .collect();
//! let signal = Signal::new(samples, fs).unwrap();
//!
//! let analyzer = Analyzer::new(
//!     build_auditory_filterbank(fs, 80.0, 6000.0, 16).unwrap(),
//!     build_modulation_filterbank(fs, 1.0, 64.0, 7).unwrap(),
//!     PeriodicityConfig::default(),
//! )
//! .unwrap()
//! .normalization(MpsNormalization::ChannelPower);
//!
//! let features = analyzer.analyze_with(&signal).unwrap();
//! let channel = features
//!     .mps()
//!     .auditory_frequencies()
//!     .iter()
//!     .position(|&cf| cf > 450.0)
//!     .unwrap();
//! let dominant = features.array(names::DOMINANT_MODULATION_HZ).unwrap()[channel];
//! assert!((2.0..=8.0).contains(&dominant));
//! ```

pub mod envelope;
pub mod error;
pub mod features;
pub mod fft;
pub mod filterbank;
pub mod hilbert;
pub mod modulation;
pub mod mps;
pub mod periodicity;
pub mod pipeline;
pub mod signal;
pub mod spectra;

// Re-export main types
pub use envelope::{Envelope, EnvelopeExtractor};
pub use error::{Error, Result};
pub use features::{FeatureAggregator, FeatureSet, FeatureValue, Intermediates};
pub use fft::Fft;
pub use filterbank::{
    AuditoryFilterbank, Channel, FilterFamily, FilterSpec, Filterbank, PhaseAlignment,
    build_auditory_filterbank,
};
pub use hilbert::HilbertTransform;
pub use modulation::{
    ModulationAxis, ModulationBand, ModulationFilterbank, build_modulation_filterbank,
};
pub use mps::{ChannelRow, Mps, MpsBuilder, MpsNormalization};
pub use periodicity::{
    BoundaryPolicy, PeriodicityConfig, PeriodicityEstimator, PeriodicityFrame, PeriodicityTrace,
};
pub use pipeline::{AnalysisOptions, Analyzer, analyze, analyze_with};
pub use signal::Signal;
pub use spectra::{
    AmScalogram, AmSpectrum, F0ModulationScalogram, F0ModulationSpectrum, ScalogramConfig,
};
