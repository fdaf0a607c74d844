//! Modulation filterbank applied to auditory envelopes.
//!
//! Each band is a first-order Butterworth bandpass (one second-order
//! section) with -3 dB edges at `mf -/+ mf / (2Q)`. Centers are log-spaced
//! between the lowest and highest modulation rate. The envelope mean is
//! removed before filtering, so the bands only see fluctuations.
//!
//! # Example
//!
//! ```rust
//! use tmst_analysis::{Filterbank, build_modulation_filterbank};
//!
//! let bank = build_modulation_filterbank(16000.0, 0.5, 200.0, 24).unwrap();
//! assert_eq!(bank.num_filters(), 24);
//! assert!(bank.overlap_bound() >= 1.0);
//! ```

use serde::{Deserialize, Serialize};
use tmst_core::{Biquad, butterworth_bandpass_coefficients};

use crate::envelope::Envelope;
use crate::error::{Error, Result, ensure_finite};
use crate::filterbank::{FilterFamily, FilterSpec, Filterbank, check_sample_rate, validate_sample_rate};

/// Default modulation filter quality factor.
pub const DEFAULT_MODULATION_Q: f64 = 1.0;

/// Frequency grid resolution used by [`ModulationFilterbank::overlap_bound`].
const OVERLAP_GRID_POINTS: usize = 4096;

/// One modulation filter output for one auditory channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulationBand {
    /// Auditory channel center frequency in Hz
    pub auditory_hz: f64,
    /// Modulation filter center frequency in Hz
    pub modulation_hz: f64,
    /// Filtered, mean-removed envelope
    pub samples: Vec<f64>,
}

impl ModulationBand {
    /// Mean squared amplitude of the band.
    pub fn power(&self) -> f64 {
        tmst_core::mean_square(&self.samples)
    }
}

/// Log-spaced modulation frequencies with an integration interval per
/// center.
///
/// Interval edges sit at the geometric midpoints between neighbouring
/// centers; the outer edges extend by the same log step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationAxis {
    /// Center frequencies in Hz, ascending
    pub centers: Vec<f64>,
    /// `(low, high)` integration interval of each center, in Hz
    pub intervals: Vec<(f64, f64)>,
}

impl ModulationAxis {
    /// Build an axis from ascending center frequencies.
    pub fn from_centers(centers: Vec<f64>) -> Self {
        let n = centers.len();
        let intervals = match n {
            0 => Vec::new(),
            1 => vec![(centers[0] / core::f64::consts::SQRT_2, centers[0] * core::f64::consts::SQRT_2)],
            _ => (0..n)
                .map(|i| {
                    let low = if i == 0 {
                        centers[0] / (centers[1] / centers[0]).sqrt()
                    } else {
                        (centers[i - 1] * centers[i]).sqrt()
                    };
                    let high = if i == n - 1 {
                        centers[n - 1] * (centers[n - 1] / centers[n - 2]).sqrt()
                    } else {
                        (centers[i] * centers[i + 1]).sqrt()
                    };
                    (low, high)
                })
                .collect(),
        };
        Self { centers, intervals }
    }

    /// Number of modulation frequencies.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// True when the axis is empty.
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// `n` log-spaced frequencies from `low` to `high` inclusive.
pub(crate) fn log_space(low: f64, high: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![low],
        _ => {
            let ratio = (high / low).ln() / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| low * (ratio * i as f64).exp()).collect();
            out[n - 1] = high;
            out
        }
    }
}

/// Bank of first-order Butterworth modulation bandpass filters.
#[derive(Debug, Clone)]
pub struct ModulationFilterbank {
    sample_rate: f64,
    q: f64,
    specs: Vec<FilterSpec>,
    coefficients: Vec<(f64, f64, f64, f64, f64, f64)>,
}

impl ModulationFilterbank {
    /// Create `n_bands` log-spaced bands from `low_hz` to `high_hz` with the
    /// default quality factor.
    pub fn new(sample_rate: f64, low_hz: f64, high_hz: f64, n_bands: usize) -> Result<Self> {
        Self::with_q(sample_rate, low_hz, high_hz, n_bands, DEFAULT_MODULATION_Q)
    }

    /// Create `n_bands` log-spaced bands with quality factor `q`.
    pub fn with_q(
        sample_rate: f64,
        low_hz: f64,
        high_hz: f64,
        n_bands: usize,
        q: f64,
    ) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        if !(low_hz.is_finite() && low_hz > 0.0) {
            return Err(Error::configuration(format!(
                "lowest modulation frequency must be positive, got {low_hz}"
            )));
        }
        if !(high_hz.is_finite() && low_hz < high_hz) {
            return Err(Error::configuration(format!(
                "lowest modulation frequency {low_hz} Hz must be below highest {high_hz} Hz"
            )));
        }
        if n_bands == 0 {
            return Err(Error::configuration("modulation filterbank needs at least one band"));
        }
        Self::from_center_frequencies(sample_rate, &log_space(low_hz, high_hz, n_bands), q)
    }

    /// Create bands at explicit, strictly ascending center frequencies.
    ///
    /// Fails if `q <= 0.5` (the lower edge would not be positive), if a
    /// center reaches the envelope Nyquist limit, or if an upper band edge
    /// does.
    pub fn from_center_frequencies(sample_rate: f64, centers: &[f64], q: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        if !(q.is_finite() && q > 0.5) {
            return Err(Error::configuration(format!(
                "modulation Q must be greater than 0.5, got {q}"
            )));
        }
        if centers.is_empty() {
            return Err(Error::configuration("modulation filterbank needs at least one band"));
        }

        let nyquist = sample_rate / 2.0;
        let mut specs = Vec::with_capacity(centers.len());
        let mut coefficients = Vec::with_capacity(centers.len());
        for (i, &center) in centers.iter().enumerate() {
            if !(center.is_finite() && center > 0.0) {
                return Err(Error::configuration(format!(
                    "modulation center frequency {i} must be positive, got {center}"
                )));
            }
            if i > 0 && center <= centers[i - 1] {
                return Err(Error::configuration(
                    "modulation center frequencies must be strictly ascending",
                ));
            }
            if center >= nyquist {
                return Err(Error::configuration(format!(
                    "modulation center frequency {center} Hz is at or above the envelope Nyquist limit ({nyquist} Hz)"
                )));
            }

            let bandwidth = center / q;
            let (low, high) = (center - bandwidth / 2.0, center + bandwidth / 2.0);
            if high >= nyquist {
                return Err(Error::configuration(format!(
                    "modulation band at {center} Hz has upper edge {high} Hz at or above Nyquist ({nyquist} Hz)"
                )));
            }

            specs.push(FilterSpec {
                center_hz: center,
                bandwidth_hz: bandwidth,
                family: FilterFamily::Modulation,
            });
            coefficients.push(butterworth_bandpass_coefficients(low, high, sample_rate));
        }

        tracing::debug!(
            bands = specs.len(),
            q,
            low_hz = centers[0],
            high_hz = centers[centers.len() - 1],
            "modulation filterbank built"
        );

        Ok(Self {
            sample_rate,
            q,
            specs,
            coefficients,
        })
    }

    /// Quality factor shared by all bands.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// `(low, high)` -3 dB edges of each band in Hz.
    pub fn band_edges(&self) -> Vec<(f64, f64)> {
        self.specs
            .iter()
            .map(|s| (s.center_hz - s.bandwidth_hz / 2.0, s.center_hz + s.bandwidth_hz / 2.0))
            .collect()
    }

    /// Magnitude response of band `index` at `frequency` Hz.
    pub fn magnitude_at(&self, index: usize, frequency: f64) -> f64 {
        self.coefficients
            .get(index)
            .map_or(0.0, |&c| Biquad::from_coefficients(c).magnitude_at(frequency, self.sample_rate))
    }

    /// Sum over bands of the squared magnitude response at `frequency` Hz.
    pub fn summed_power_response(&self, frequency: f64) -> f64 {
        self.coefficients
            .iter()
            .map(|&c| {
                let m = Biquad::from_coefficients(c).magnitude_at(frequency, self.sample_rate);
                m * m
            })
            .sum()
    }

    /// Upper bound on the sum of normalized band powers of one channel.
    ///
    /// For any finite mean-removed input `x`, `sum_k ||h_k * x||^2 <=
    /// max_f sum_k |H_k(f)|^2 * ||x||^2`, and `||x||^2 <= N * mean(E^2)`.
    /// Under [`MpsNormalization::ChannelPower`](crate::MpsNormalization)
    /// every MPS row therefore sums to at most this value. Local maxima are
    /// located on a dense log grid and each is refined by golden-section
    /// search.
    pub fn overlap_bound(&self) -> f64 {
        let low = self.specs[0].center_hz / 64.0;
        let high = self.sample_rate / 2.0 * 0.999_999;
        let (log_low, log_high) = (low.ln(), high.ln());
        let step = (log_high - log_low) / (OVERLAP_GRID_POINTS - 1) as f64;

        let response = |log_f: f64| self.summed_power_response(log_f.exp());
        let grid: Vec<f64> = (0..OVERLAP_GRID_POINTS)
            .map(|i| response(log_low + step * i as f64))
            .collect();

        let golden = 0.5 * (5.0_f64.sqrt() - 1.0);
        let mut best = grid.iter().copied().fold(0.0, f64::max);
        for i in 0..OVERLAP_GRID_POINTS {
            let left = if i == 0 { f64::NEG_INFINITY } else { grid[i - 1] };
            let right = grid.get(i + 1).copied().unwrap_or(f64::NEG_INFINITY);
            if grid[i] < left || grid[i] < right {
                continue;
            }
            let center = log_low + step * i as f64;
            let (mut a, mut b) = ((center - step).max(log_low), (center + step).min(log_high));
            for _ in 0..60 {
                let c = b - golden * (b - a);
                let d = a + golden * (b - a);
                let (fc, fd) = (response(c), response(d));
                best = best.max(fc).max(fd);
                if fc > fd {
                    b = d;
                } else {
                    a = c;
                }
            }
        }
        best
    }

    /// Modulation axis with one center per band.
    pub fn modulation_axis(&self) -> ModulationAxis {
        ModulationAxis::from_centers(self.center_frequencies())
    }

    /// Filter the mean-removed envelope through every band.
    ///
    /// `channel` only labels numeric errors.
    pub fn filter(&self, envelope: &Envelope, channel: usize) -> Result<Vec<ModulationBand>> {
        let dc = envelope.mean();
        let centered: Vec<f64> = envelope.samples.iter().map(|&x| x - dc).collect();

        self.specs
            .iter()
            .zip(&self.coefficients)
            .map(|(spec, &coefficients)| {
                let mut samples = centered.clone();
                Biquad::from_coefficients(coefficients).process_in_place(&mut samples);
                ensure_finite(&samples, "modulation filterbank", channel)?;
                Ok(ModulationBand {
                    auditory_hz: envelope.center_hz,
                    modulation_hz: spec.center_hz,
                    samples,
                })
            })
            .collect()
    }

    /// Like [`filter`](Self::filter), after checking the envelope's sample
    /// rate against the bank's.
    pub fn filter_at_rate(
        &self,
        envelope: &Envelope,
        sample_rate: f64,
        channel: usize,
    ) -> Result<Vec<ModulationBand>> {
        check_sample_rate(self.sample_rate, sample_rate)?;
        self.filter(envelope, channel)
    }
}

impl Filterbank for ModulationFilterbank {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn specs(&self) -> &[FilterSpec] {
        &self.specs
    }
}

/// Build a modulation filterbank of `n_bands` log-spaced bands between
/// `low_mod` and `high_mod` Hz, with the default Q.
///
/// Fails with [`Error::Configuration`] if `low_mod >= high_mod`,
/// `n_bands == 0` or a band reaches Nyquist.
pub fn build_modulation_filterbank(
    sample_rate: f64,
    low_mod: f64,
    high_mod: f64,
    n_bands: usize,
) -> Result<ModulationFilterbank> {
    ModulationFilterbank::new(sample_rate, low_mod, high_mod, n_bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn modulated_envelope(rate: f64, sample_rate: f64, seconds: f64) -> Envelope {
        let n = (sample_rate * seconds) as usize;
        Envelope {
            center_hz: 1000.0,
            samples: (0..n)
                .map(|i| 1.0 + 0.5 * (2.0 * PI * rate * i as f64 / sample_rate).sin())
                .collect(),
        }
    }

    #[test]
    fn test_log_spacing() {
        let bank = build_modulation_filterbank(1000.0, 1.0, 64.0, 7).unwrap();
        let centers = bank.center_frequencies();
        for (i, &c) in centers.iter().enumerate() {
            assert!((c - 2.0_f64.powi(i as i32)).abs() < 1e-9, "{c}");
        }
        assert!(bank.specs().iter().all(|s| s.family == FilterFamily::Modulation));
        assert!((bank.specs()[3].q() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(build_modulation_filterbank(1000.0, 10.0, 5.0, 4).is_err());
        assert!(build_modulation_filterbank(1000.0, 0.0, 5.0, 4).is_err());
        assert!(build_modulation_filterbank(1000.0, 1.0, 5.0, 0).is_err());
        // Center at Nyquist
        assert!(build_modulation_filterbank(1000.0, 1.0, 500.0, 4).is_err());
        // Center below Nyquist, upper edge above it
        assert!(build_modulation_filterbank(1000.0, 1.0, 400.0, 4).is_err());
        assert!(ModulationFilterbank::with_q(1000.0, 1.0, 10.0, 4, 0.5).is_err());
    }

    #[test]
    fn test_edges() {
        let bank = ModulationFilterbank::from_center_frequencies(1000.0, &[8.0], 2.0).unwrap();
        assert_eq!(bank.band_edges(), vec![(6.0, 10.0)]);
        let half_power = core::f64::consts::FRAC_1_SQRT_2;
        assert!((bank.magnitude_at(0, 6.0) - half_power).abs() < 1e-6);
        assert!((bank.magnitude_at(0, 10.0) - half_power).abs() < 1e-6);
        assert_eq!(bank.magnitude_at(5, 10.0), 0.0);
    }

    #[test]
    fn test_dc_removed() {
        let bank = build_modulation_filterbank(1000.0, 1.0, 64.0, 7).unwrap();
        let env = Envelope {
            center_hz: 500.0,
            samples: vec![3.0; 4000],
        };
        for band in bank.filter(&env, 0).unwrap() {
            assert!(band.samples.iter().all(|&x| x == 0.0));
            assert_eq!(band.auditory_hz, 500.0);
        }
    }

    #[test]
    fn test_modulation_selects_band() {
        let sr = 1000.0;
        let bank = build_modulation_filterbank(sr, 1.0, 64.0, 7).unwrap();
        let env = modulated_envelope(16.0, sr, 4.0);
        let bands = bank.filter(&env, 0).unwrap();
        let powers: Vec<f64> = bands.iter().map(ModulationBand::power).collect();

        let peak = (0..powers.len())
            .max_by(|&a, &b| powers[a].total_cmp(&powers[b]))
            .unwrap();
        assert_eq!(bands[peak].modulation_hz, 16.0);
    }

    #[test]
    fn test_overlap_bound() {
        let bank = build_modulation_filterbank(1000.0, 1.0, 64.0, 7).unwrap();
        let bound = bank.overlap_bound();
        // Each band peaks at 1, octave neighbours at Q = 1 add a fraction more
        assert!(bound >= 1.0 && bound < 3.0, "bound {bound}");
        for f in [0.5, 1.0, 3.3, 16.0, 40.0, 200.0] {
            assert!(bank.summed_power_response(f) <= bound + 1e-9);
        }

        let single = ModulationFilterbank::from_center_frequencies(1000.0, &[10.0], 1.0).unwrap();
        assert!((single.overlap_bound() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_modulation_axis_intervals() {
        let axis = ModulationAxis::from_centers(vec![1.0, 4.0, 16.0]);
        assert_eq!(axis.len(), 3);
        assert_eq!(axis.intervals[0], (0.5, 2.0));
        assert_eq!(axis.intervals[1], (2.0, 8.0));
        assert_eq!(axis.intervals[2], (8.0, 32.0));
        assert!(ModulationAxis::from_centers(Vec::new()).is_empty());
    }

    #[test]
    fn test_sample_rate_checked() {
        let bank = build_modulation_filterbank(1000.0, 1.0, 64.0, 7).unwrap();
        let env = modulated_envelope(4.0, 1000.0, 1.0);
        assert!(bank.filter_at_rate(&env, 2000.0, 0).is_err());
        assert!(bank.filter_at_rate(&env, 1000.0, 0).is_ok());
    }
}
