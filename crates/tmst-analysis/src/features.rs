//! Feature aggregation.
//!
//! Reduces a completed [`Mps`] and [`PeriodicityTrace`] into a named map of
//! scalar and array descriptors. The map is keyed by the constants in
//! [`names`].

use std::collections::BTreeMap;

use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::filterbank::Channel;
use crate::modulation::ModulationBand;
use crate::mps::Mps;
use crate::periodicity::PeriodicityTrace;
use crate::spectra::{AmScalogram, AmSpectrum, F0ModulationScalogram, F0ModulationSpectrum};

/// Modulation-rate range in Hz counted as roughness.
pub const ROUGHNESS_RANGE_HZ: (f64, f64) = (15.0, 300.0);

/// Feature names used as keys in [`FeatureSet::features`].
pub mod names {
    /// Per-channel modulation frequency of the largest MPS cell (array).
    pub const DOMINANT_MODULATION_HZ: &str = "dominant_modulation_hz";
    /// Per-channel sum of MPS cells (array).
    pub const MODULATION_ENERGY: &str = "modulation_energy";
    /// Mean envelope modulation index over non-silent channels (scalar).
    pub const MODULATION_INDEX: &str = "modulation_index";
    /// Share of MPS energy in the roughness range (scalar).
    pub const ROUGHNESS_RATIO: &str = "roughness_ratio";
    /// Share of voiced frames (scalar).
    pub const VOICED_FRACTION: &str = "voiced_fraction";
    /// Mean salience over voiced frames (scalar).
    pub const MEAN_SALIENCE: &str = "mean_salience";
    /// Median salience over voiced frames (scalar).
    pub const MEDIAN_SALIENCE: &str = "median_salience";
    /// Median f0 over voiced frames, only present when a frame is voiced
    /// (scalar).
    pub const MEDIAN_F0_HZ: &str = "median_f0_hz";
    /// Envelope periodogram summed over channels (array).
    pub const AM_SPECTRUM: &str = "am_spectrum";
    /// f0 modulation spectrum (array).
    pub const F0M_SPECTRUM: &str = "f0m_spectrum";
}

/// A single named feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Single number
    Scalar(f64),
    /// Sequence, usually one value per channel or per modulation frequency
    Array(Vec<f64>),
}

impl FeatureValue {
    /// The value if this is a scalar.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FeatureValue::Scalar(v) => Some(*v),
            FeatureValue::Array(_) => None,
        }
    }

    /// The values if this is an array.
    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            FeatureValue::Scalar(_) => None,
            FeatureValue::Array(v) => Some(v),
        }
    }
}

/// Per-channel artifacts kept on request.
///
/// Empty unless the analysis was configured to retain them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intermediates {
    /// Auditory filterbank outputs
    pub channels: Option<Vec<Channel>>,
    /// Hilbert envelopes
    pub envelopes: Option<Vec<Envelope>>,
    /// Modulation bands, `bands[channel][band]`
    pub bands: Option<Vec<Vec<ModulationBand>>>,
}

/// Immutable result of analyzing one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSet {
    mps: Mps,
    periodicity: PeriodicityTrace,
    features: BTreeMap<String, FeatureValue>,
    am_spectrum: Option<AmSpectrum>,
    f0m_spectrum: Option<F0ModulationSpectrum>,
    am_scalogram: Option<AmScalogram>,
    f0m_scalogram: Option<F0ModulationScalogram>,
    #[serde(skip)]
    intermediates: Intermediates,
}

impl FeatureSet {
    /// Modulation power spectrum.
    pub fn mps(&self) -> &Mps {
        &self.mps
    }

    /// Periodicity trace.
    pub fn periodicity(&self) -> &PeriodicityTrace {
        &self.periodicity
    }

    /// All named features.
    pub fn features(&self) -> &BTreeMap<String, FeatureValue> {
        &self.features
    }

    /// Feature by name.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    /// Scalar feature by name.
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_scalar()
    }

    /// Array feature by name.
    pub fn array(&self, name: &str) -> Option<&[f64]> {
        self.get(name)?.as_array()
    }

    /// AM spectrum, when computed.
    pub fn am_spectrum(&self) -> Option<&AmSpectrum> {
        self.am_spectrum.as_ref()
    }

    /// f0 modulation spectrum, when computed.
    pub fn f0m_spectrum(&self) -> Option<&F0ModulationSpectrum> {
        self.f0m_spectrum.as_ref()
    }

    /// AM scalogram, when computed.
    pub fn am_scalogram(&self) -> Option<&AmScalogram> {
        self.am_scalogram.as_ref()
    }

    /// f0 modulation scalogram, when computed.
    pub fn f0m_scalogram(&self) -> Option<&F0ModulationScalogram> {
        self.f0m_scalogram.as_ref()
    }

    /// Retained per-channel intermediates.
    pub fn intermediates(&self) -> &Intermediates {
        &self.intermediates
    }
}

/// Builds a [`FeatureSet`] from the outputs of the pipeline stages.
#[derive(Debug, Clone)]
pub struct FeatureAggregator {
    mps: Mps,
    periodicity: PeriodicityTrace,
    am_spectrum: Option<AmSpectrum>,
    f0m_spectrum: Option<F0ModulationSpectrum>,
    am_scalogram: Option<AmScalogram>,
    f0m_scalogram: Option<F0ModulationScalogram>,
    intermediates: Intermediates,
}

impl FeatureAggregator {
    /// Start from the two mandatory inputs.
    pub fn new(mps: Mps, periodicity: PeriodicityTrace) -> Self {
        Self {
            mps,
            periodicity,
            am_spectrum: None,
            f0m_spectrum: None,
            am_scalogram: None,
            f0m_scalogram: None,
            intermediates: Intermediates::default(),
        }
    }

    /// Attach an AM spectrum.
    pub fn with_am_spectrum(mut self, spectrum: AmSpectrum) -> Self {
        self.am_spectrum = Some(spectrum);
        self
    }

    /// Attach an f0 modulation spectrum.
    pub fn with_f0m_spectrum(mut self, spectrum: F0ModulationSpectrum) -> Self {
        self.f0m_spectrum = Some(spectrum);
        self
    }

    /// Attach an AM scalogram.
    pub fn with_am_scalogram(mut self, scalogram: AmScalogram) -> Self {
        self.am_scalogram = Some(scalogram);
        self
    }

    /// Attach an f0 modulation scalogram.
    pub fn with_f0m_scalogram(mut self, scalogram: F0ModulationScalogram) -> Self {
        self.f0m_scalogram = Some(scalogram);
        self
    }

    /// Attach retained intermediates.
    pub fn with_intermediates(mut self, intermediates: Intermediates) -> Self {
        self.intermediates = intermediates;
        self
    }

    /// Compute the feature map.
    ///
    /// Fails with [`Error::InsufficientData`] when the MPS has no channels
    /// or the trace has no frames.
    pub fn aggregate(self) -> Result<FeatureSet> {
        let (n_auditory, _) = self.mps.shape();
        if n_auditory == 0 {
            return Err(Error::insufficient_data("no auditory channels to aggregate"));
        }
        if self.periodicity.is_empty() {
            return Err(Error::insufficient_data("no periodicity frames to aggregate"));
        }

        let mut features = BTreeMap::new();
        let mut insert = |name: &str, value: FeatureValue| {
            features.insert(name.to_string(), value);
        };

        insert(
            names::DOMINANT_MODULATION_HZ,
            FeatureValue::Array(dominant_modulation(&self.mps)),
        );
        insert(
            names::MODULATION_ENERGY,
            FeatureValue::Array(self.mps.row_sums()),
        );
        insert(
            names::MODULATION_INDEX,
            FeatureValue::Scalar(modulation_index(&self.mps)),
        );
        insert(
            names::ROUGHNESS_RATIO,
            FeatureValue::Scalar(roughness_ratio(&self.mps)),
        );

        let trace = &self.periodicity;
        insert(names::VOICED_FRACTION, FeatureValue::Scalar(trace.voiced_fraction()));
        insert(names::MEAN_SALIENCE, FeatureValue::Scalar(trace.mean_salience()));
        insert(names::MEDIAN_SALIENCE, FeatureValue::Scalar(trace.median_salience()));
        if let Some(f0) = trace.median_f0() {
            insert(names::MEDIAN_F0_HZ, FeatureValue::Scalar(f0));
        }

        if let Some(spectrum) = &self.am_spectrum {
            insert(names::AM_SPECTRUM, FeatureValue::Array(spectrum.total.clone()));
        }
        if let Some(spectrum) = &self.f0m_spectrum {
            insert(names::F0M_SPECTRUM, FeatureValue::Array(spectrum.values.clone()));
        }

        Ok(FeatureSet {
            mps: self.mps,
            periodicity: self.periodicity,
            features,
            am_spectrum: self.am_spectrum,
            f0m_spectrum: self.f0m_spectrum,
            am_scalogram: self.am_scalogram,
            f0m_scalogram: self.f0m_scalogram,
            intermediates: self.intermediates,
        })
    }
}

/// Modulation frequency of the largest cell of each row.
///
/// Ties resolve to the lower modulation frequency; an all-zero row gives 0.
fn dominant_modulation(mps: &Mps) -> Vec<f64> {
    let modulation_hz = mps.modulation_frequencies();
    mps.values()
        .iter()
        .map(|row| {
            let mut best: Option<(usize, f64)> = None;
            for (i, &v) in row.iter().enumerate() {
                if v > best.map_or(0.0, |(_, b)| b) {
                    best = Some((i, v));
                }
            }
            best.map_or(0.0, |(i, _)| modulation_hz[i])
        })
        .collect()
}

/// Mean over non-silent channels of `sqrt(2 * var(E)) / mean(E)`.
fn modulation_index(mps: &Mps) -> f64 {
    let indices: Vec<f64> = mps
        .raw_rows()
        .iter()
        .filter(|row| !row.is_silent() && row.envelope_mean > 0.0)
        .map(|row| (2.0 * row.envelope_variance()).sqrt() / row.envelope_mean)
        .collect();
    tmst_core::mean(&indices)
}

/// Share of total MPS energy in bands centered inside [`ROUGHNESS_RANGE_HZ`].
fn roughness_ratio(mps: &Mps) -> f64 {
    let (low, high) = ROUGHNESS_RANGE_HZ;
    let profile = mps.modulation_profile();
    let total: f64 = profile.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let rough: f64 = mps
        .modulation_frequencies()
        .iter()
        .zip(&profile)
        .filter(|&(&f, _)| (low..=high).contains(&f))
        .map(|(_, &v)| v)
        .sum();
    rough / total
}
