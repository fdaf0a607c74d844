//! Error types for the analysis pipeline.
//!
//! Documented edge cases (silent channels, frames without a periodicity
//! minimum) are not errors; they produce defined zero or `None` outputs.

use thiserror::Error;

/// Errors that can occur while building filterbanks or analyzing a signal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid filter or estimator parameters, or mismatched sample rates.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The signal is empty or too short for the requested analysis, or an
    /// aggregation stage received no channels or no frames.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A stage produced NaN or infinity from finite input.
    ///
    /// This indicates a defect in the pipeline and is never clamped away.
    #[error("numeric anomaly in {stage} (channel {channel})")]
    NumericAnomaly {
        /// Pipeline stage that produced the non-finite value.
        stage: &'static str,
        /// Auditory channel index, or 0 for whole-signal stages.
        channel: usize,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration(reason.into())
    }

    /// Create an insufficient-data error.
    pub fn insufficient_data(reason: impl Into<String>) -> Self {
        Error::InsufficientData(reason.into())
    }
}

/// Convenience result type for analysis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fails with [`Error::NumericAnomaly`] when `values` contains NaN or infinity.
pub(crate) fn ensure_finite(values: &[f64], stage: &'static str, channel: usize) -> Result<()> {
    if tmst_core::all_finite(values) {
        Ok(())
    } else {
        tracing::error!(stage, channel, "non-finite value produced");
        Err(Error::NumericAnomaly { stage, channel })
    }
}
