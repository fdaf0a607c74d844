//! Preset validation.
//!
//! Checks every section of an [`AnalysisPreset`] that can be checked without
//! knowing the sample rate: positive frequencies, ordered ranges, band and
//! channel counts, modulation Q and the periodicity settings. Limits that
//! depend on Nyquist are enforced when the filterbanks are built.
//!
//! # Example
//!
//! ```rust
//! use tmst_config::{get_factory_preset, validate_preset};
//!
//! let preset = get_factory_preset("speech").expect("speech should exist");
//! validate_preset(&preset).expect("factory presets are valid");
//! ```

use thiserror::Error;

use crate::preset::{AnalysisPreset, ChannelSpacing};

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A frequency range is not `0 < low < high`.
    #[error("invalid {section} range: low {low} Hz must be positive and below high {high} Hz")]
    InvalidRange {
        /// Preset section holding the range.
        section: &'static str,
        /// Lower bound in Hz.
        low: f64,
        /// Upper bound in Hz.
        high: f64,
    },

    /// Parameter value out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the parameter.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Parameter rejected for another reason.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_range(section: &'static str, low: f64, high: f64, errors: &mut Vec<ValidationError>) {
    if !(low.is_finite() && high.is_finite() && low > 0.0 && low < high) {
        errors.push(ValidationError::InvalidRange { section, low, high });
    }
}

fn check_bounds(param: &str, value: f64, min: f64, max: f64, errors: &mut Vec<ValidationError>) {
    if !(value.is_finite() && value >= min && value <= max) {
        errors.push(ValidationError::OutOfRange {
            param: param.to_string(),
            value,
            min,
            max,
        });
    }
}

/// Validate every sample-rate independent setting of a preset.
///
/// All problems are collected; more than one is reported as
/// [`ValidationError::Multiple`].
pub fn validate_preset(preset: &AnalysisPreset) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if preset.name.trim().is_empty() {
        errors.push(ValidationError::InvalidParameter {
            param: "name".to_string(),
            reason: "must not be empty".to_string(),
        });
    }

    let auditory = &preset.auditory;
    check_range("auditory", auditory.low_hz, auditory.high_hz, &mut errors);
    match auditory.spacing {
        ChannelSpacing::ErbStep(step) => check_bounds("auditory.spacing.erb_step", step, 0.05, 10.0, &mut errors),
        ChannelSpacing::Channels(0) => errors.push(ValidationError::InvalidParameter {
            param: "auditory.spacing.channels".to_string(),
            reason: "at least one channel is required".to_string(),
        }),
        ChannelSpacing::Channels(_) => {}
    }

    let modulation = &preset.modulation;
    check_range("modulation", modulation.low_hz, modulation.high_hz, &mut errors);
    if modulation.bands == 0 {
        errors.push(ValidationError::InvalidParameter {
            param: "modulation.bands".to_string(),
            reason: "at least one band is required".to_string(),
        });
    }
    if !(modulation.q.is_finite() && modulation.q > 0.5) {
        errors.push(ValidationError::InvalidParameter {
            param: "modulation.q".to_string(),
            reason: format!("must be greater than 0.5, got {}", modulation.q),
        });
    }

    if let Err(e) = preset.periodicity.validate() {
        errors.push(ValidationError::InvalidParameter {
            param: "periodicity".to_string(),
            reason: e.to_string(),
        });
    }

    if let Some(scalogram) = &preset.output.scalogram
        && let Err(e) = scalogram.validate()
    {
        errors.push(ValidationError::InvalidParameter {
            param: "output.scalogram".to_string(),
            reason: e.to_string(),
        });
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}
