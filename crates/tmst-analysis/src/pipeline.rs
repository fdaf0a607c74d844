//! End-to-end analysis: waveform to [`FeatureSet`].
//!
//! The channel stream (auditory filterbank, envelopes, modulation bands,
//! MPS) and the periodicity stream run side by side with `rayon::join` and
//! meet at the [`FeatureAggregator`]. The periodicity stream also produces
//! the dense f0 track behind the f0 modulation spectrum and scalogram when
//! either is requested. Every parallel stage collects in index order, so
//! results do not depend on the thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, EnvelopeExtractor};
use crate::error::{Error, Result};
use crate::features::{FeatureAggregator, FeatureSet, Intermediates};
use crate::filterbank::{AuditoryFilterbank, Channel, Filterbank, check_sample_rate};
use crate::modulation::{ModulationBand, ModulationFilterbank};
use crate::mps::{ChannelRow, Mps, MpsBuilder, MpsNormalization};
use crate::periodicity::{PeriodicityConfig, PeriodicityEstimator, PeriodicityTrace};
use crate::signal::Signal;
use crate::spectra::{
    AmScalogram, AmSpectrum, F0ModulationScalogram, F0ModulationSpectrum, ScalogramConfig,
    check_f0_track_rate,
};

/// What [`analyze_with`] computes and keeps beyond the MPS and periodicity
/// trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalysisOptions {
    /// MPS normalization mode
    pub normalization: MpsNormalization,
    /// Keep the auditory filterbank outputs
    pub retain_channels: bool,
    /// Keep the Hilbert envelopes
    pub retain_envelopes: bool,
    /// Keep every modulation band of every channel
    pub retain_bands: bool,
    /// Compute the AM spectrum
    pub am_spectrum: bool,
    /// Compute the f0 modulation spectrum
    pub f0m_spectrum: bool,
    /// Compute AM and f0 modulation scalograms with this window geometry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalogram: Option<ScalogramConfig>,
}

impl AnalysisOptions {
    fn needs_f0_track(&self) -> bool {
        self.f0m_spectrum || self.scalogram.is_some()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            normalization: MpsNormalization::default(),
            retain_channels: false,
            retain_envelopes: false,
            retain_bands: false,
            am_spectrum: true,
            f0m_spectrum: true,
            scalogram: None,
        }
    }
}

/// Analyze `signal` with default [`AnalysisOptions`].
///
/// # Errors
///
/// - [`Error::InsufficientData`] if the signal is empty or shorter than one
///   periodicity frame.
/// - [`Error::Configuration`] if the filterbanks were designed for a
///   different sample rate than the signal, the periodicity configuration
///   is invalid at that rate, or a modulation frequency reaches half the f0
///   track rate while the f0 modulation spectrum or scalograms are on.
/// - [`Error::NumericAnomaly`] if any stage produces a non-finite value.
///
/// # Example
///
/// ```rust
/// use tmst_analysis::{
///     PeriodicityConfig, Signal, analyze, build_auditory_filterbank,
///     build_modulation_filterbank, features::names,
/// };
///
/// let fs = 16_000.0;
/// let samples: Vec<f64> = (0..8000)
///     .map(|i| (2.0 * std::f64::consts::PI * 220.0 * i as f64 / fs).sin())
///     .collect();
/// let signal = Signal::new(samples, fs).unwrap();
///
/// let auditory = build_auditory_filterbank(fs, 100.0, 4000.0, 8).unwrap();
/// let modulation = build_modulation_filterbank(fs, 2.0, 64.0, 6).unwrap();
/// let features = analyze(&signal, &auditory, &modulation, &PeriodicityConfig::default()).unwrap();
///
/// assert_eq!(features.mps().shape(), (8, 6));
/// assert!(features.scalar(names::VOICED_FRACTION).unwrap() > 0.5);
/// ```
pub fn analyze(
    signal: &Signal,
    auditory_fb: &AuditoryFilterbank,
    modulation_fb: &ModulationFilterbank,
    periodicity_config: &PeriodicityConfig,
) -> Result<FeatureSet> {
    analyze_with(
        signal,
        auditory_fb,
        modulation_fb,
        periodicity_config,
        &AnalysisOptions::default(),
    )
}

/// Analyze `signal` with explicit options. Errors as for [`analyze`].
pub fn analyze_with(
    signal: &Signal,
    auditory_fb: &AuditoryFilterbank,
    modulation_fb: &ModulationFilterbank,
    periodicity_config: &PeriodicityConfig,
    options: &AnalysisOptions,
) -> Result<FeatureSet> {
    if signal.is_empty() {
        return Err(Error::insufficient_data("signal is empty"));
    }
    check_sample_rate(auditory_fb.sample_rate(), signal.sample_rate())?;
    check_sample_rate(modulation_fb.sample_rate(), signal.sample_rate())?;

    let estimator = PeriodicityEstimator::new(periodicity_config.clone(), signal.sample_rate())?;
    check_options(&estimator, modulation_fb, options)?;
    let min_len = estimator.min_signal_len();
    if signal.len() < min_len {
        return Err(Error::insufficient_data(format!(
            "signal has {} samples, periodicity analysis needs at least {min_len}",
            signal.len()
        )));
    }

    let margin = auditory_fb.transient_margin();
    if signal.len() < margin {
        tracing::warn!(
            samples = signal.len(),
            transient_margin = margin,
            "signal is shorter than the filterbank transient margin"
        );
    }

    tracing::debug!(
        samples = signal.len(),
        sample_rate = signal.sample_rate(),
        auditory = auditory_fb.num_filters(),
        modulation = modulation_fb.num_filters(),
        "analysis started"
    );

    let (channel_stage, (trace, f0_track)) = rayon::join(
        || channel_stream(signal, auditory_fb, modulation_fb, options),
        || {
            rayon::join(
                || estimator.estimate(signal),
                || {
                    options
                        .needs_f0_track()
                        .then(|| estimator.f0_track_estimator().estimate(signal))
                        .transpose()
                },
            )
        },
    );
    let channel_stage = channel_stage?;
    let trace = trace?;
    let f0_track: Option<PeriodicityTrace> = f0_track?;

    let axis = modulation_fb.modulation_axis();
    let mut aggregator = FeatureAggregator::new(channel_stage.mps, trace);
    if let Some(spectrum) = channel_stage.am_spectrum {
        aggregator = aggregator.with_am_spectrum(spectrum);
    }
    if let Some(scalogram) = channel_stage.am_scalogram {
        aggregator = aggregator.with_am_scalogram(scalogram);
    }
    if let Some(track) = &f0_track {
        if options.f0m_spectrum {
            aggregator = aggregator.with_f0m_spectrum(F0ModulationSpectrum::compute(
                track,
                estimator.config(),
                &axis,
            )?);
        }
        if let Some(config) = &options.scalogram {
            aggregator = aggregator.with_f0m_scalogram(F0ModulationScalogram::compute(
                track,
                estimator.config(),
                &axis,
                config,
                signal.duration(),
            )?);
        }
    }

    aggregator
        .with_intermediates(channel_stage.intermediates)
        .aggregate()
}

/// Check the option-dependent limits before any filtering starts.
fn check_options(
    estimator: &PeriodicityEstimator,
    modulation_fb: &ModulationFilterbank,
    options: &AnalysisOptions,
) -> Result<()> {
    if let Some(config) = &options.scalogram {
        config.validate()?;
    }
    if options.needs_f0_track() {
        check_f0_track_rate(
            estimator.f0_track_estimator().frame_rate(),
            &modulation_fb.modulation_axis(),
        )?;
    }
    Ok(())
}

/// Outputs of the auditory-to-modulation stream.
struct ChannelStage {
    mps: Mps,
    am_spectrum: Option<AmSpectrum>,
    am_scalogram: Option<AmScalogram>,
    intermediates: Intermediates,
}

fn channel_stream(
    signal: &Signal,
    auditory_fb: &AuditoryFilterbank,
    modulation_fb: &ModulationFilterbank,
    options: &AnalysisOptions,
) -> Result<ChannelStage> {
    let channels: Vec<Channel> = auditory_fb.filter(signal)?;
    let envelopes: Vec<Envelope> = EnvelopeExtractor::new(signal.len()).extract_all(&channels)?;

    let rows: Vec<(ChannelRow, Option<Vec<ModulationBand>>)> = envelopes
        .par_iter()
        .enumerate()
        .map(|(index, envelope)| {
            let bands = modulation_fb.filter_at_rate(envelope, signal.sample_rate(), index)?;
            let row = ChannelRow::from_bands(envelope, &bands);
            Ok((row, options.retain_bands.then_some(bands)))
        })
        .collect::<Result<_>>()?;

    let mut builder = MpsBuilder::new(
        rows.len(),
        modulation_fb.center_frequencies(),
        options.normalization,
    );
    let mut retained_bands = Vec::new();
    for (index, (row, bands)) in rows.into_iter().enumerate() {
        builder.insert(index, row)?;
        retained_bands.extend(bands);
    }
    let mps = builder.build()?;

    let axis = modulation_fb.modulation_axis();
    let am_spectrum = if options.am_spectrum {
        Some(AmSpectrum::compute(&envelopes, signal.sample_rate(), &axis)?)
    } else {
        None
    };
    let am_scalogram = match &options.scalogram {
        Some(config) => Some(AmScalogram::compute(
            &envelopes,
            signal.sample_rate(),
            &axis,
            config,
        )?),
        None => None,
    };

    Ok(ChannelStage {
        mps,
        am_spectrum,
        am_scalogram,
        intermediates: Intermediates {
            channels: options.retain_channels.then_some(channels),
            envelopes: options.retain_envelopes.then_some(envelopes),
            bands: options.retain_bands.then_some(retained_bands),
        },
    })
}

/// Reusable analysis setup: both filterbanks, a periodicity configuration
/// and [`AnalysisOptions`], checked once against each other.
#[derive(Debug, Clone)]
pub struct Analyzer {
    auditory: AuditoryFilterbank,
    modulation: ModulationFilterbank,
    periodicity: PeriodicityConfig,
    options: AnalysisOptions,
}

impl Analyzer {
    /// Create an analyzer with default options.
    ///
    /// Fails with [`Error::Configuration`] if the filterbanks disagree on the
    /// sample rate or the periodicity configuration is invalid at that rate.
    pub fn new(
        auditory: AuditoryFilterbank,
        modulation: ModulationFilterbank,
        periodicity: PeriodicityConfig,
    ) -> Result<Self> {
        check_sample_rate(auditory.sample_rate(), modulation.sample_rate())?;
        PeriodicityEstimator::new(periodicity.clone(), auditory.sample_rate())?;
        Ok(Self {
            auditory,
            modulation,
            periodicity,
            options: AnalysisOptions::default(),
        })
    }

    /// Replace all options.
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the MPS normalization.
    pub fn normalization(mut self, normalization: MpsNormalization) -> Self {
        self.options.normalization = normalization;
        self
    }

    /// Keep channels, envelopes and modulation bands in the result.
    pub fn retain_intermediates(mut self, retain: bool) -> Self {
        self.options.retain_channels = retain;
        self.options.retain_envelopes = retain;
        self.options.retain_bands = retain;
        self
    }

    /// Toggle the AM and f0 modulation spectra.
    pub fn spectra(mut self, am_spectrum: bool, f0m_spectrum: bool) -> Self {
        self.options.am_spectrum = am_spectrum;
        self.options.f0m_spectrum = f0m_spectrum;
        self
    }

    /// Compute AM and f0 modulation scalograms, or stop computing them.
    pub fn scalogram(mut self, config: Option<ScalogramConfig>) -> Self {
        self.options.scalogram = config;
        self
    }

    /// Check the current options against the filterbanks and periodicity
    /// configuration without analyzing anything.
    pub fn check(&self) -> Result<()> {
        let estimator = PeriodicityEstimator::new(self.periodicity.clone(), self.sample_rate())?;
        check_options(&estimator, &self.modulation, &self.options)
    }

    /// Options in use.
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Auditory filterbank.
    pub fn auditory(&self) -> &AuditoryFilterbank {
        &self.auditory
    }

    /// Modulation filterbank.
    pub fn modulation(&self) -> &ModulationFilterbank {
        &self.modulation
    }

    /// Periodicity configuration.
    pub fn periodicity(&self) -> &PeriodicityConfig {
        &self.periodicity
    }

    /// Sample rate both filterbanks were designed for.
    pub fn sample_rate(&self) -> f64 {
        self.auditory.sample_rate()
    }

    /// Analyze one signal.
    pub fn analyze_with(&self, signal: &Signal) -> Result<FeatureSet> {
        analyze_with(
            signal,
            &self.auditory,
            &self.modulation,
            &self.periodicity,
            &self.options,
        )
    }
}
