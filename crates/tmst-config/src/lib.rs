//! Analysis presets for the tmst modulation pipeline.
//!
//! This crate describes a complete analysis (both filterbanks, the
//! periodicity estimator and the output options) as a TOML document, and
//! turns it into a ready [`tmst_analysis::Analyzer`] for a given sample rate.
//!
//! # Features
//!
//! - **Preset System**: Load and save analysis presets from TOML files
//! - **Validation**: Check ranges, band counts and estimator settings
//! - **Factory Presets**: Built-in presets for speech, music and hearing-aid output
//!
//! # Example
//!
//! ```rust,no_run
//! use tmst_config::{AnalysisPreset, AuditorySection, ChannelSpacing};
//!
//! // Load a preset from file
//! let preset = AnalysisPreset::load("speech.toml").unwrap();
//!
//! // Create a preset programmatically
//! let preset = AnalysisPreset::new("Lecture")
//!     .with_description("Single talker, close microphone")
//!     .with_auditory(AuditorySection {
//!         spacing: ChannelSpacing::Channels(32),
//!         ..AuditorySection::default()
//!     });
//! preset.save("presets/lecture.toml").unwrap();
//!
//! let analyzer = preset.analyzer(16000.0).unwrap();
//! ```

mod error;
mod preset;

/// Preset validation.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_preset_names, factory_presets, get_factory_preset,
    is_factory_preset,
};
pub use preset::{AnalysisPreset, AuditorySection, ChannelSpacing, ModulationSection};
pub use validation::{ValidationError, ValidationResult, validate_preset};
