//! Peripheral (auditory) gammatone filterbank.
//!
//! Splits a waveform into N channels with 4th-order gammatone filters spaced
//! on the ERB-rate scale. Every channel keeps the length and sample rate of
//! the input and is temporally aligned with the others, so envelopes taken
//! from different channels can be compared sample by sample.
//!
//! # Example
//!
//! ```rust
//! use tmst_analysis::{Filterbank, Signal, build_auditory_filterbank};
//!
//! let bank = build_auditory_filterbank(16000.0, 100.0, 4000.0, 16).unwrap();
//! assert_eq!(bank.num_filters(), 16);
//!
//! let signal = Signal::new(vec![0.0; 1600], 16000.0).unwrap();
//! let channels = bank.filter(&signal).unwrap();
//! assert_eq!(channels.len(), 16);
//! assert_eq!(channels[0].samples.len(), 1600);
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tmst_core::{
    GAMMATONE_ERB_FACTOR, GammatoneFilter, erb_bandwidth, erb_channel_count, erb_rate_to_hz,
    erb_space, gammatone_group_delay, hz_to_erb_rate,
};

use crate::error::{Error, Result, ensure_finite};
use crate::signal::Signal;

/// Gammatone order used by the auditory filterbank.
pub const GAMMATONE_ORDER: usize = 4;

/// Which stage of the pipeline a filter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterFamily {
    /// Peripheral filter applied to the waveform.
    Auditory,
    /// Second-stage filter applied to an envelope.
    Modulation,
}

/// Center frequency and bandwidth of one filter in a bank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Center frequency in Hz
    pub center_hz: f64,
    /// Bandwidth in Hz
    pub bandwidth_hz: f64,
    /// Filter family
    pub family: FilterFamily,
}

impl FilterSpec {
    /// Quality factor `center / bandwidth`.
    pub fn q(&self) -> f64 {
        self.center_hz / self.bandwidth_hz
    }
}

/// Shared read-only view of a configured filterbank.
///
/// Banks are built once, validated at construction and then only read, so
/// every implementation is `Send + Sync`.
pub trait Filterbank: Send + Sync {
    /// Sample rate in Hz the bank was designed for.
    fn sample_rate(&self) -> f64;

    /// Filter specifications in ascending center-frequency order.
    fn specs(&self) -> &[FilterSpec];

    /// Number of filters.
    fn num_filters(&self) -> usize {
        self.specs().len()
    }

    /// Center frequencies in Hz.
    fn center_frequencies(&self) -> Vec<f64> {
        self.specs().iter().map(|s| s.center_hz).collect()
    }
}

/// How channel outputs are kept temporally aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAlignment {
    /// Advance each channel by the integer-sample group delay of its
    /// gammatone envelope peak, `(order - 1) / (2*pi*b)`.
    #[default]
    DelayCompensated,
    /// Forward-backward filtering. Exact zero phase, squared magnitude
    /// response.
    ZeroPhase,
}

/// One peripheral filter output.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Center frequency of the filter in Hz
    pub center_hz: f64,
    /// Filtered samples, same length and rate as the input
    pub samples: Vec<f64>,
}

/// Bank of ERB-spaced gammatone filters.
#[derive(Debug, Clone)]
pub struct AuditoryFilterbank {
    sample_rate: f64,
    specs: Vec<FilterSpec>,
    alignment: PhaseAlignment,
}

impl AuditoryFilterbank {
    /// Create `n_channels` filters equally spaced on the ERB-rate scale from
    /// `low_hz` to `high_hz` inclusive.
    pub fn new(sample_rate: f64, low_hz: f64, high_hz: f64, n_channels: usize) -> Result<Self> {
        validate_range(sample_rate, low_hz, high_hz)?;
        if n_channels == 0 {
            return Err(Error::configuration("auditory filterbank needs at least one channel"));
        }

        let mut centers = vec![0.0; n_channels];
        if n_channels == 1 {
            centers[0] = low_hz;
        } else {
            erb_space(low_hz, high_hz, &mut centers);
        }
        Self::from_center_frequencies(sample_rate, &centers)
    }

    /// Create one filter every `step_erb` ERBs starting at `low_hz`, up to
    /// and including `high_hz` when it falls on the grid.
    pub fn erb_spaced(sample_rate: f64, low_hz: f64, high_hz: f64, step_erb: f64) -> Result<Self> {
        validate_range(sample_rate, low_hz, high_hz)?;
        if !(step_erb.is_finite() && step_erb > 0.0) {
            return Err(Error::configuration(format!(
                "ERB step must be positive, got {step_erb}"
            )));
        }

        let count = erb_channel_count(low_hz, high_hz, step_erb);
        let start = hz_to_erb_rate(low_hz);
        let centers: Vec<f64> = (0..count)
            .map(|i| erb_rate_to_hz(start + step_erb * i as f64))
            .filter(|&f| f <= high_hz)
            .collect();
        Self::from_center_frequencies(sample_rate, &centers)
    }

    /// Create filters at explicit center frequencies.
    ///
    /// Centers must be positive, strictly ascending and below Nyquist. Each
    /// filter gets bandwidth `1.019 * ERB(center)`.
    pub fn from_center_frequencies(sample_rate: f64, centers: &[f64]) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        if centers.is_empty() {
            return Err(Error::configuration("auditory filterbank needs at least one channel"));
        }

        let nyquist = sample_rate / 2.0;
        for (i, &center) in centers.iter().enumerate() {
            if !(center.is_finite() && center > 0.0) {
                return Err(Error::configuration(format!(
                    "auditory center frequency {i} must be positive, got {center}"
                )));
            }
            if center >= nyquist {
                return Err(Error::configuration(format!(
                    "auditory center frequency {center} Hz is at or above Nyquist ({nyquist} Hz)"
                )));
            }
            if i > 0 && center <= centers[i - 1] {
                return Err(Error::configuration(
                    "auditory center frequencies must be strictly ascending",
                ));
            }
        }

        let specs: Vec<FilterSpec> = centers
            .iter()
            .map(|&center_hz| FilterSpec {
                center_hz,
                bandwidth_hz: GAMMATONE_ERB_FACTOR * erb_bandwidth(center_hz),
                family: FilterFamily::Auditory,
            })
            .collect();

        tracing::debug!(
            channels = specs.len(),
            low_hz = centers[0],
            high_hz = centers[centers.len() - 1],
            "auditory filterbank built"
        );

        Ok(Self {
            sample_rate,
            specs,
            alignment: PhaseAlignment::default(),
        })
    }

    /// Set the phase alignment strategy.
    pub fn with_alignment(mut self, alignment: PhaseAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Phase alignment strategy.
    pub fn alignment(&self) -> PhaseAlignment {
        self.alignment
    }

    /// Gammatone order of every channel.
    pub fn filter_order(&self) -> usize {
        GAMMATONE_ORDER
    }

    /// ERB in Hz of each channel's center frequency.
    pub fn erb_bandwidths(&self) -> Vec<f64> {
        self.specs.iter().map(|s| erb_bandwidth(s.center_hz)).collect()
    }

    /// Per-channel delay in samples removed under
    /// [`PhaseAlignment::DelayCompensated`].
    pub fn group_delays(&self) -> Vec<usize> {
        self.specs
            .iter()
            .map(|s| group_delay_samples(s.bandwidth_hz, self.sample_rate))
            .collect()
    }

    /// Number of samples at each end of a channel affected by filter
    /// onset and ring-out.
    ///
    /// The margin is twice the mean duration of the slowest channel's
    /// impulse-response envelope, `2 * order / (2*pi*b)` seconds. It is
    /// documented for callers and never trimmed.
    pub fn transient_margin(&self) -> usize {
        let narrowest = self
            .specs
            .iter()
            .map(|s| s.bandwidth_hz)
            .fold(f64::INFINITY, f64::min);
        if !narrowest.is_finite() {
            return 0;
        }
        let seconds = 2.0 * GAMMATONE_ORDER as f64 / (core::f64::consts::TAU * narrowest);
        tmst_core::seconds_to_samples(seconds, self.sample_rate)
    }

    /// Filter `signal` through every channel.
    ///
    /// Channels are computed in parallel and returned in ascending
    /// center-frequency order.
    pub fn filter(&self, signal: &Signal) -> Result<Vec<Channel>> {
        check_sample_rate(self.sample_rate, signal.sample_rate())?;

        self.specs
            .par_iter()
            .enumerate()
            .map(|(index, spec)| {
                let samples = self.filter_channel(spec, signal.samples());
                ensure_finite(&samples, "auditory filterbank", index)?;
                tracing::trace!(index, center_hz = spec.center_hz, "channel filtered");
                Ok(Channel {
                    center_hz: spec.center_hz,
                    samples,
                })
            })
            .collect()
    }

    fn filter_channel(&self, spec: &FilterSpec, input: &[f64]) -> Vec<f64> {
        let mut filter = GammatoneFilter::new(
            spec.center_hz,
            spec.bandwidth_hz,
            GAMMATONE_ORDER,
            self.sample_rate,
        );

        match self.alignment {
            PhaseAlignment::DelayCompensated => {
                let delay = group_delay_samples(spec.bandwidth_hz, self.sample_rate);
                // Run `delay` extra zeros through the filter so the shifted
                // tail holds the ring-out rather than padding.
                let mut out: Vec<f64> = input
                    .iter()
                    .chain(core::iter::repeat_n(&0.0, delay))
                    .map(|&x| filter.process(x))
                    .collect();
                out.drain(..delay.min(out.len()));
                out.truncate(input.len());
                out
            }
            PhaseAlignment::ZeroPhase => {
                let mut out: Vec<f64> = input.iter().map(|&x| filter.process(x)).collect();
                out.reverse();
                filter.clear();
                for sample in out.iter_mut() {
                    *sample = filter.process(*sample);
                }
                out.reverse();
                out
            }
        }
    }
}

impl Filterbank for AuditoryFilterbank {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }
}

/// Build an auditory filterbank of `n_channels` ERB-spaced gammatone filters
/// between `low_freq` and `high_freq`.
///
/// Fails with [`Error::Configuration`] if `low_freq >= high_freq`,
/// `n_channels == 0` or `high_freq` reaches Nyquist.
pub fn build_auditory_filterbank(
    sample_rate: f64,
    low_freq: f64,
    high_freq: f64,
    n_channels: usize,
) -> Result<AuditoryFilterbank> {
    AuditoryFilterbank::new(sample_rate, low_freq, high_freq, n_channels)
}

fn group_delay_samples(bandwidth_hz: f64, sample_rate: f64) -> usize {
    (gammatone_group_delay(bandwidth_hz, GAMMATONE_ORDER) * sample_rate).round() as usize
}

pub(crate) fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "sample rate must be positive and finite, got {sample_rate}"
        )))
    }
}

/// Validates `0 < low < high < Nyquist`.
pub(crate) fn validate_range(sample_rate: f64, low_hz: f64, high_hz: f64) -> Result<()> {
    validate_sample_rate(sample_rate)?;
    if !(low_hz.is_finite() && low_hz > 0.0) {
        return Err(Error::configuration(format!(
            "lower frequency must be positive, got {low_hz}"
        )));
    }
    if !(high_hz.is_finite() && low_hz < high_hz) {
        return Err(Error::configuration(format!(
            "lower frequency {low_hz} Hz must be below upper frequency {high_hz} Hz"
        )));
    }
    let nyquist = sample_rate / 2.0;
    if high_hz >= nyquist {
        return Err(Error::configuration(format!(
            "upper frequency {high_hz} Hz is at or above Nyquist ({nyquist} Hz)"
        )));
    }
    Ok(())
}

pub(crate) fn check_sample_rate(expected: f64, actual: f64) -> Result<()> {
    if (expected - actual).abs() > 1e-9 * expected {
        return Err(Error::configuration(format!(
            "sample rate mismatch: filterbank designed for {expected} Hz, signal is {actual} Hz"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(frequency: f64, sample_rate: f64, seconds: f64) -> Signal {
        let n = (sample_rate * seconds) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * PI * frequency * i as f64 / sample_rate).sin())
            .collect();
        Signal::new(samples, sample_rate).unwrap()
    }

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_rejects_bad_ranges() {
        assert!(matches!(
            build_auditory_filterbank(16000.0, 500.0, 500.0, 8),
            Err(Error::Configuration(_))
        ));
        assert!(build_auditory_filterbank(16000.0, 100.0, 8000.0, 8).is_err());
        assert!(build_auditory_filterbank(16000.0, 100.0, 9000.0, 8).is_err());
        assert!(build_auditory_filterbank(16000.0, 100.0, 4000.0, 0).is_err());
        assert!(build_auditory_filterbank(0.0, 100.0, 4000.0, 4).is_err());
    }

    #[test]
    fn test_centers_span_range() {
        let bank = build_auditory_filterbank(16000.0, 100.0, 4000.0, 20).unwrap();
        let centers = bank.center_frequencies();
        assert_eq!(centers.len(), 20);
        assert!((centers[0] - 100.0).abs() < 1e-9);
        assert_eq!(centers[19], 4000.0);
        assert!(bank.specs().iter().all(|s| s.family == FilterFamily::Auditory));
    }

    #[test]
    fn test_erb_spaced_one_per_erb() {
        let bank = AuditoryFilterbank::erb_spaced(16000.0, 70.0, 6700.0, 1.0).unwrap();
        let rates: Vec<f64> = bank
            .center_frequencies()
            .iter()
            .map(|&f| hz_to_erb_rate(f))
            .collect();
        for pair in rates.windows(2) {
            assert!((pair[1] - pair[0] - 1.0).abs() < 1e-9);
        }
        assert!(*bank.center_frequencies().last().unwrap() <= 6700.0);
    }

    #[test]
    fn test_explicit_centers_validated() {
        assert!(AuditoryFilterbank::from_center_frequencies(8000.0, &[100.0, 4000.0]).is_err());
        assert!(AuditoryFilterbank::from_center_frequencies(8000.0, &[500.0, 200.0]).is_err());
        assert!(AuditoryFilterbank::from_center_frequencies(8000.0, &[]).is_err());
        assert!(AuditoryFilterbank::from_center_frequencies(8000.0, &[200.0, 500.0]).is_ok());
    }

    #[test]
    fn test_sample_rate_mismatch() {
        let bank = build_auditory_filterbank(16000.0, 100.0, 4000.0, 4).unwrap();
        let signal = sine(440.0, 22050.0, 0.1);
        assert!(matches!(bank.filter(&signal), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_channel_lengths_match_input() {
        for alignment in [PhaseAlignment::DelayCompensated, PhaseAlignment::ZeroPhase] {
            let bank = build_auditory_filterbank(8000.0, 100.0, 3000.0, 6)
                .unwrap()
                .with_alignment(alignment);
            let signal = sine(440.0, 8000.0, 0.25);
            let channels = bank.filter(&signal).unwrap();
            assert!(channels.iter().all(|c| c.samples.len() == signal.len()));
        }
    }

    #[test]
    fn test_silence_stays_silent() {
        let bank = build_auditory_filterbank(8000.0, 100.0, 3000.0, 6).unwrap();
        let signal = Signal::new(vec![0.0; 800], 8000.0).unwrap();
        for channel in bank.filter(&signal).unwrap() {
            assert!(channel.samples.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_tone_passes_matching_channel() {
        let sr = 16000.0;
        let bank = AuditoryFilterbank::from_center_frequencies(sr, &[250.0, 1000.0, 4000.0]).unwrap();
        let signal = sine(1000.0, sr, 0.5);
        let channels = bank.filter(&signal).unwrap();

        // Skip settling
        let settle = bank.transient_margin();
        let levels: Vec<f64> = channels
            .iter()
            .map(|c| rms(&c.samples[settle..signal.len() - settle]))
            .collect();
        assert!((levels[1] - core::f64::consts::FRAC_1_SQRT_2).abs() < 0.03);
        assert!(levels[0] < 0.05 * levels[1]);
        assert!(levels[2] < 0.05 * levels[1]);
    }

    #[test]
    fn test_delay_compensation_aligns_impulse_peaks() {
        let sr = 16000.0;
        let centers = [500.0, 1500.0, 4800.0];
        let n = 2000;
        let mut impulse = vec![0.0; n];
        impulse[500] = 1.0;
        let signal = Signal::new(impulse, sr).unwrap();

        let bank = AuditoryFilterbank::from_center_frequencies(sr, &centers).unwrap();
        let hilbert = crate::hilbert::HilbertTransform::new(n);
        for channel in bank.filter(&signal).unwrap() {
            let env = hilbert.instantaneous_amplitude(&channel.samples);
            let peak = (0..n).max_by(|&a, &b| env[a].total_cmp(&env[b])).unwrap();
            assert!(
                (peak as i64 - 500).abs() <= 4,
                "{} Hz channel peaks at {peak}",
                channel.center_hz
            );
        }
    }

    #[test]
    fn test_zero_phase_is_symmetric() {
        let sr = 8000.0;
        let mut impulse = vec![0.0; 801];
        impulse[400] = 1.0;
        let signal = Signal::new(impulse, sr).unwrap();
        let bank = AuditoryFilterbank::from_center_frequencies(sr, &[1000.0])
            .unwrap()
            .with_alignment(PhaseAlignment::ZeroPhase);

        let out = &bank.filter(&signal).unwrap()[0].samples;
        for k in 1..200 {
            assert!((out[400 - k] - out[400 + k]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_transient_margin_and_order() {
        let bank = build_auditory_filterbank(16000.0, 100.0, 4000.0, 8).unwrap();
        assert_eq!(bank.filter_order(), 4);
        // Slowest channel at 100 Hz, b ~ 36.2 Hz -> ~35 ms
        let margin = bank.transient_margin();
        assert!((500..650).contains(&margin), "margin {margin}");
        assert_eq!(bank.group_delays().len(), 8);
        assert!(bank.group_delays()[0] > bank.group_delays()[7]);
    }
}
