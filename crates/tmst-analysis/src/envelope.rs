//! Hilbert envelope extraction for auditory channels.

use rayon::prelude::*;

use crate::error::{Result, ensure_finite};
use crate::filterbank::Channel;
use crate::hilbert::HilbertTransform;

/// Instantaneous amplitude of one auditory channel.
///
/// Never negative and the same length as the channel it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Center frequency of the source channel in Hz
    pub center_hz: f64,
    /// Envelope samples
    pub samples: Vec<f64>,
}

impl Envelope {
    /// Mean (DC) level.
    pub fn mean(&self) -> f64 {
        tmst_core::mean(&self.samples)
    }

    /// Mean squared amplitude.
    pub fn power(&self) -> f64 {
        tmst_core::mean_square(&self.samples)
    }
}

/// Computes analytic-signal envelopes with one FFT plan shared by every
/// channel of the same length.
#[derive(Debug, Clone)]
pub struct EnvelopeExtractor {
    hilbert: HilbertTransform,
}

impl EnvelopeExtractor {
    /// Create an extractor for channels of `len` samples.
    pub fn new(len: usize) -> Self {
        Self {
            hilbert: HilbertTransform::new(len),
        }
    }

    /// Envelope of a single channel. `index` only labels numeric errors.
    pub fn extract(&self, channel: &Channel, index: usize) -> Result<Envelope> {
        let samples = if channel.samples.len() == self.hilbert.len() {
            self.hilbert.instantaneous_amplitude(&channel.samples)
        } else {
            HilbertTransform::new(channel.samples.len()).instantaneous_amplitude(&channel.samples)
        };
        ensure_finite(&samples, "envelope", index)?;

        Ok(Envelope {
            center_hz: channel.center_hz,
            samples,
        })
    }

    /// Envelopes of all channels, in parallel, in channel order.
    pub fn extract_all(&self, channels: &[Channel]) -> Result<Vec<Envelope>> {
        channels
            .par_iter()
            .enumerate()
            .map(|(index, channel)| self.extract(channel, index))
            .collect()
    }
}
