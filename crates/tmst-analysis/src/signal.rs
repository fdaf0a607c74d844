//! Monaural input signal.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An immutable, already-loaded monaural waveform.
///
/// The pipeline only ever borrows a `Signal`; decoding audio files into
/// samples is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    samples: Vec<f64>,
    sample_rate: f64,
}

impl Signal {
    /// Create a signal from samples and a sample rate in Hz.
    ///
    /// Fails with [`Error::Configuration`] if the sample rate is not a
    /// positive finite number or a sample is NaN/infinite. An empty sample
    /// vector is accepted here; [`analyze`](crate::analyze) rejects it.
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::configuration(format!(
                "sample rate must be positive and finite, got {sample_rate}"
            )));
        }
        if let Some(index) = samples.iter().position(|x| !x.is_finite()) {
            return Err(Error::configuration(format!(
                "signal sample {index} is not finite"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a signal from single-precision samples.
    pub fn from_f32(samples: &[f32], sample_rate: f64) -> Result<Self> {
        Self::new(samples.iter().map(|&x| f64::from(x)).collect(), sample_rate)
    }

    /// Sample values.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the signal holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Time in seconds of each sample, starting at `1 / fs`.
    pub fn times(&self) -> Vec<f64> {
        (1..=self.samples.len())
            .map(|i| i as f64 / self.sample_rate)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_sample_rate() {
        assert!(Signal::new(vec![0.0; 4], 0.0).is_err());
        assert!(Signal::new(vec![0.0; 4], -8000.0).is_err());
        assert!(Signal::new(vec![0.0; 4], f64::NAN).is_err());
    }

    #[test]
    fn rejects_non_finite_samples() {
        let err = Signal::new(vec![0.0, f64::INFINITY], 8000.0).unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("sample 1")));
    }

    #[test]
    fn empty_signal_is_constructible() {
        let signal = Signal::new(Vec::new(), 8000.0).unwrap();
        assert!(signal.is_empty());
        assert_eq!(signal.duration(), 0.0);
    }

    #[test]
    fn from_f32_converts() {
        let signal = Signal::from_f32(&[0.5, -0.25], 16000.0).unwrap();
        assert_eq!(signal.samples(), &[0.5, -0.25]);
        assert_eq!(signal.len(), 2);
        assert_eq!(signal.times(), vec![1.0 / 16000.0, 2.0 / 16000.0]);
    }
}
