//! Modulation spectra evaluated on a [`ModulationAxis`].
//!
//! - [`AmSpectrum`]: periodogram of each auditory envelope at the axis
//!   frequencies, summed over channels.
//! - [`F0ModulationSpectrum`]: Lomb-Scargle periodogram of the f0 track,
//!   which tolerates the gaps left by unvoiced frames.
//! - [`AmScalogram`] / [`F0ModulationScalogram`]: the same measures in
//!   sliding windows of a fixed number of modulation periods, one column
//!   per axis frequency.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{Error, Result, ensure_finite};
use crate::modulation::{ModulationAxis, log_space};
use crate::periodicity::{PeriodicityConfig, PeriodicityTrace};

/// Interpolation points averaged inside each integration interval of the f0
/// modulation spectrum.
const POINTS_PER_INTERVAL: usize = 8;

/// Minimum number of f0 values for a Lomb-Scargle estimate.
const MIN_F0_POINTS: usize = 3;

/// Squared DFT magnitude of `x` at `frequency` Hz, by the Goertzel
/// recurrence. Works for frequencies that are not bin-aligned.
pub fn goertzel_power(x: &[f64], frequency: f64, sample_rate: f64) -> f64 {
    let omega = core::f64::consts::TAU * frequency / sample_rate;
    let coeff = 2.0 * omega.cos();
    let (mut s1, mut s2) = (0.0, 0.0);
    for &sample in x {
        let s0 = sample + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0)
}

/// One-sided periodogram `2 * |X(f)|^2 / (fs * N)` of mean-removed `x` at
/// each of `frequencies`.
fn periodogram(x: &[f64], frequencies: &[f64], sample_rate: f64) -> Vec<f64> {
    if x.is_empty() {
        return vec![0.0; frequencies.len()];
    }
    let dc = tmst_core::mean(x);
    let centered: Vec<f64> = x.iter().map(|&v| v - dc).collect();
    let scale = 2.0 / (sample_rate * x.len() as f64);
    frequencies
        .iter()
        .map(|&f| scale * goertzel_power(&centered, f, sample_rate))
        .collect()
}

/// Envelope periodogram on the modulation axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmSpectrum {
    /// Modulation frequencies in Hz
    pub frequencies: Vec<f64>,
    /// `per_channel[channel][frequency]`
    pub per_channel: Vec<Vec<f64>>,
    /// Sum over channels
    pub total: Vec<f64>,
}

impl AmSpectrum {
    /// One-sided periodogram `2 * |X(f)|^2 / (fs * N)` of each mean-removed
    /// envelope at every axis frequency.
    pub fn compute(envelopes: &[Envelope], sample_rate: f64, axis: &ModulationAxis) -> Result<Self> {
        if envelopes.is_empty() {
            return Err(Error::insufficient_data("AM spectrum needs at least one envelope"));
        }

        let per_channel: Vec<Vec<f64>> = envelopes
            .par_iter()
            .enumerate()
            .map(|(index, envelope)| {
                let row = periodogram(&envelope.samples, &axis.centers, sample_rate);
                ensure_finite(&row, "am spectrum", index)?;
                Ok(row)
            })
            .collect::<Result<_>>()?;

        let mut total = vec![0.0; axis.len()];
        for row in &per_channel {
            for (acc, &v) in total.iter_mut().zip(row) {
                *acc += v;
            }
        }

        Ok(Self {
            frequencies: axis.centers.clone(),
            per_channel,
            total,
        })
    }
}

/// Fail with [`Error::Configuration`] unless every axis frequency lies below
/// half the f0 track's frame rate. Above it the Lomb-Scargle estimate only
/// mirrors slower fluctuations.
pub fn check_f0_track_rate(frame_rate: f64, axis: &ModulationAxis) -> Result<()> {
    let limit = frame_rate / 2.0;
    match axis.centers.iter().copied().find(|&f| f >= limit) {
        Some(f) => Err(Error::configuration(format!(
            "modulation frequency {f} Hz is at or above half the f0 track rate ({limit} Hz)"
        ))),
        None => Ok(()),
    }
}

/// Spectrum of the fluctuations of the f0 track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct F0ModulationSpectrum {
    /// Modulation frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Lomb-Scargle power at the axis centers, averaged over each
    /// integration interval
    pub values: Vec<f64>,
    /// Cleaned `(time, f0)` points the spectrum was computed from
    pub track: Vec<(f64, f64)>,
    /// Frame rate of the f0 track in Hz
    pub frame_rate: f64,
}

impl F0ModulationSpectrum {
    /// Compute the spectrum of the f0 track carried by `trace`.
    ///
    /// The raw [`lomb_scargle`] power is scaled by `2 / N` for `N` track
    /// points, so an f0 excursion `A * sin(2 pi f t)` reads `A^2 / 2` at `f`.
    /// Fewer than three points after artifact removal give a spectrum of
    /// zeros.
    ///
    /// Fails with [`Error::Configuration`] if an axis frequency reaches half
    /// the trace's frame rate.
    pub fn compute(
        trace: &PeriodicityTrace,
        config: &PeriodicityConfig,
        axis: &ModulationAxis,
    ) -> Result<Self> {
        let frame_rate = 1.0 / trace.hop_seconds;
        check_f0_track_rate(frame_rate, axis)?;
        let track = remove_artifacts(trace, config);

        let values = if track.len() < MIN_F0_POINTS {
            tracing::debug!(points = track.len(), "too few f0 points for f0 modulation spectrum");
            vec![0.0; axis.len()]
        } else {
            let (times, f0): (Vec<f64>, Vec<f64>) = track.iter().copied().unzip();
            let raw: Vec<f64> = axis
                .centers
                .par_iter()
                .map(|&f| scaled_lomb_scargle(&times, &f0, f))
                .collect();
            axis.intervals
                .iter()
                .map(|&interval| interval_mean(&axis.centers, &raw, interval))
                .collect()
        };
        ensure_finite(&values, "f0 modulation spectrum", 0)?;

        Ok(Self {
            frequencies: axis.centers.clone(),
            values,
            track,
            frame_rate,
        })
    }
}

/// Mean of the piecewise-linear curve through `(frequencies, values)`
/// sampled at log-spaced points across `(low, high)`. Outside the first
/// and last frequency the curve is held constant.
fn interval_mean(frequencies: &[f64], values: &[f64], (low, high): (f64, f64)) -> f64 {
    let points = log_space(low, high, POINTS_PER_INTERVAL);
    let sum: f64 = points
        .iter()
        .map(|&f| interpolate(frequencies, values, f))
        .sum();
    sum / points.len() as f64
}

fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let upper = xs.partition_point(|&v| v < x);
    if upper == 0 {
        return ys[0];
    }
    if upper == xs.len() {
        return ys[xs.len() - 1];
    }
    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// `(time, f0)` points that survive artifact removal.
///
/// Each frame contributes [`PeriodicityFrame::track_f0_hz`] at the
/// configured aperiodicity threshold. Values outside the f0 range are
/// dropped. A jump of more than `max_jump_semitones` between consecutive
/// points starts a new run, and runs shorter than `min_voiced_duration` are
/// discarded.
///
/// [`PeriodicityFrame::track_f0_hz`]: crate::periodicity::PeriodicityFrame::track_f0_hz
pub fn remove_artifacts(trace: &PeriodicityTrace, config: &PeriodicityConfig) -> Vec<(f64, f64)> {
    let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();

    for frame in &trace.frames {
        let point = frame
            .track_f0_hz(config.aperiodicity_threshold)
            .filter(|&f0| f0 >= config.f0_min_hz && f0 <= config.f0_max_hz)
            .map(|f0| (frame.time, f0));

        let previous = current.last().map(|&(_, f0)| f0);
        match (point, previous) {
            (Some(p), Some(previous)) => {
                let jump = 12.0 * (p.1 / previous).log2().abs();
                if jump > config.max_jump_semitones {
                    runs.push(core::mem::take(&mut current));
                }
                current.push(p);
            }
            (Some(p), None) => current.push(p),
            (None, _) => {
                if !current.is_empty() {
                    runs.push(core::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs.into_iter()
        .filter(|run| run.len() as f64 * trace.hop_seconds >= config.min_voiced_duration)
        .flatten()
        .collect()
}

/// Lomb-Scargle periodogram of unevenly sampled `y(t)` at `frequency` Hz.
///
/// `y` is mean-removed internally; returns the classical unnormalized power
/// `0.5 * [(sum y cos)^2 / sum cos^2 + (sum y sin)^2 / sum sin^2]`.
pub fn lomb_scargle(times: &[f64], y: &[f64], frequency: f64) -> f64 {
    let omega = core::f64::consts::TAU * frequency;
    let mean = tmst_core::mean(y);

    let (sin_2wt, cos_2wt) = times.iter().fold((0.0, 0.0), |(s, c), &t| {
        (s + (2.0 * omega * t).sin(), c + (2.0 * omega * t).cos())
    });
    let tau = sin_2wt.atan2(cos_2wt) / (2.0 * omega);

    let (mut yc, mut ys, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
    for (&t, &v) in times.iter().zip(y) {
        let arg = omega * (t - tau);
        let (s, c) = arg.sin_cos();
        let v = v - mean;
        yc += v * c;
        ys += v * s;
        cc += c * c;
        ss += s * s;
    }

    let cos_term = if cc > 0.0 { yc * yc / cc } else { 0.0 };
    let sin_term = if ss > 0.0 { ys * ys / ss } else { 0.0 };
    0.5 * (cos_term + sin_term)
}

fn scaled_lomb_scargle(times: &[f64], y: &[f64], frequency: f64) -> f64 {
    2.0 / y.len() as f64 * lomb_scargle(times, y, frequency)
}

/// Window geometry of a scalogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalogramConfig {
    /// Window length in periods of the modulation frequency being measured
    pub window_periods: f64,
    /// Step between windows, and between output cells, in seconds
    pub shift_seconds: f64,
}

impl Default for ScalogramConfig {
    fn default() -> Self {
        Self {
            window_periods: 5.0,
            shift_seconds: 0.1,
        }
    }
}

impl ScalogramConfig {
    /// Check that both lengths are positive.
    pub fn validate(&self) -> Result<()> {
        if !(self.window_periods.is_finite() && self.window_periods > 0.0) {
            return Err(Error::configuration(format!(
                "scalogram window_periods must be positive, got {}",
                self.window_periods
            )));
        }
        if !(self.shift_seconds.is_finite() && self.shift_seconds > 0.0) {
            return Err(Error::configuration(format!(
                "scalogram shift_seconds must be positive, got {}",
                self.shift_seconds
            )));
        }
        Ok(())
    }

    /// Number of output cells for a signal of `duration` seconds.
    fn cells(&self, duration: f64) -> usize {
        (duration / self.shift_seconds).round() as usize + 1
    }

    /// `(cell, start, end)` in seconds of every window for `frequency` that
    /// fits inside `duration`. Each window is assigned to the cell nearest
    /// its center.
    fn windows(&self, frequency: f64, duration: f64) -> Vec<(usize, f64, f64)> {
        let length = self.window_periods / frequency;
        (0_u32..)
            .map(|k| f64::from(k) * self.shift_seconds)
            .take_while(|&start| start + length <= duration)
            .map(|start| {
                let cell = ((start + length / 2.0) / self.shift_seconds).round() as usize;
                (cell, start, start + length)
            })
            .collect()
    }
}

/// Transpose per-frequency columns into `[cell][frequency]` rows.
fn cells_by_time(columns: Vec<Vec<Option<f64>>>, n_cells: usize) -> Vec<Vec<Option<f64>>> {
    (0..n_cells)
        .map(|cell| columns.iter().map(|column| column[cell]).collect())
        .collect()
}

fn ensure_cells_finite(values: &[Vec<Option<f64>>], stage: &'static str) -> Result<()> {
    let filled: Vec<f64> = values.iter().flatten().flatten().copied().collect();
    ensure_finite(&filled, stage, 0)
}

/// Time-resolved AM spectrum, summed over channels.
///
/// Cells that no window of a given frequency is centered on are `None`:
/// low modulation frequencies need long windows and leave the edges, or the
/// whole column, empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmScalogram {
    /// Modulation frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Cell times in seconds
    pub times: Vec<f64>,
    /// `values[cell][frequency]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl AmScalogram {
    /// Periodogram of every envelope at each axis frequency, in windows of
    /// `config.window_periods` periods, summed over channels.
    pub fn compute(
        envelopes: &[Envelope],
        sample_rate: f64,
        axis: &ModulationAxis,
        config: &ScalogramConfig,
    ) -> Result<Self> {
        config.validate()?;
        let Some(n_samples) = envelopes.first().map(|e| e.samples.len()) else {
            return Err(Error::insufficient_data("AM scalogram needs at least one envelope"));
        };
        let duration = n_samples as f64 / sample_rate;
        let n_cells = config.cells(duration);

        let columns: Vec<Vec<Option<f64>>> = axis
            .centers
            .par_iter()
            .map(|&frequency| {
                let mut column = vec![None; n_cells];
                for (cell, start, end) in config.windows(frequency, duration) {
                    let first = (start * sample_rate).round() as usize;
                    let last = ((end * sample_rate).round() as usize).min(n_samples);
                    if last <= first + 1 {
                        continue;
                    }
                    let power: f64 = envelopes
                        .iter()
                        .map(|e| periodogram(&e.samples[first..last], &[frequency], sample_rate)[0])
                        .sum();
                    column[cell] = Some(power);
                }
                column
            })
            .collect();

        let values = cells_by_time(columns, n_cells);
        ensure_cells_finite(&values, "am scalogram")?;

        Ok(Self {
            frequencies: axis.centers.clone(),
            times: (0..n_cells).map(|i| i as f64 * config.shift_seconds).collect(),
            values,
        })
    }
}

/// Time-resolved f0 modulation spectrum.
///
/// Cells without a window, or whose window holds fewer than three f0
/// points, are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct F0ModulationScalogram {
    /// Modulation frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Cell times in seconds
    pub times: Vec<f64>,
    /// `values[cell][frequency]`
    pub values: Vec<Vec<Option<f64>>>,
}

impl F0ModulationScalogram {
    /// Scaled Lomb-Scargle power of the cleaned f0 track inside windows of
    /// `config.window_periods` periods, over a signal of `duration` seconds.
    ///
    /// Fails with [`Error::Configuration`] under the same frame-rate limit as
    /// [`F0ModulationSpectrum::compute`].
    pub fn compute(
        trace: &PeriodicityTrace,
        periodicity: &PeriodicityConfig,
        axis: &ModulationAxis,
        config: &ScalogramConfig,
        duration: f64,
    ) -> Result<Self> {
        config.validate()?;
        check_f0_track_rate(1.0 / trace.hop_seconds, axis)?;
        let (times, f0): (Vec<f64>, Vec<f64>) = remove_artifacts(trace, periodicity).into_iter().unzip();
        let n_cells = config.cells(duration);

        let columns: Vec<Vec<Option<f64>>> = axis
            .centers
            .par_iter()
            .map(|&frequency| {
                let mut column = vec![None; n_cells];
                for (cell, start, end) in config.windows(frequency, duration) {
                    let first = times.partition_point(|&t| t < start);
                    let last = times.partition_point(|&t| t < end);
                    if last - first >= MIN_F0_POINTS {
                        column[cell] = Some(scaled_lomb_scargle(
                            &times[first..last],
                            &f0[first..last],
                            frequency,
                        ));
                    }
                }
                column
            })
            .collect();

        let values = cells_by_time(columns, n_cells);
        ensure_cells_finite(&values, "f0 modulation scalogram")?;

        Ok(Self {
            frequencies: axis.centers.clone(),
            times: (0..n_cells).map(|i| i as f64 * config.shift_seconds).collect(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodicity::PeriodicityFrame;
    use std::f64::consts::PI;

    fn frame(time: f64, f0: Option<f64>) -> PeriodicityFrame {
        PeriodicityFrame {
            time,
            period: f0.map(|f| 1.0 / f),
            salience: if f0.is_some() { 0.9 } else { 0.0 },
            aperiodicity: if f0.is_some() { 0.1 } else { 1.0 },
            candidate_period: f0.map(|f| 1.0 / f),
        }
    }

    /// `seconds` of f0 frames at `rate` Hz around 200 Hz with a 4 Hz,
    /// +-5 Hz vibrato.
    fn vibrato_trace(rate: f64, seconds: f64) -> PeriodicityTrace {
        let n = (rate * seconds) as usize;
        PeriodicityTrace {
            frames: (0..n)
                .map(|i| {
                    let t = i as f64 / rate;
                    frame(t, Some(200.0 + 5.0 * (2.0 * PI * 4.0 * t).sin()))
                })
                .collect(),
            hop_seconds: 1.0 / rate,
        }
    }

    #[test]
    fn goertzel_matches_direct_dft() {
        let sr = 100.0;
        let x: Vec<f64> = (0..250).map(|i| (i as f64 * 0.37).sin() + 0.2).collect();
        for f in [0.7, 3.3, 12.5] {
            let w = 2.0 * PI * f / sr;
            let (re, im) = x.iter().enumerate().fold((0.0, 0.0), |(re, im), (n, &v)| {
                (re + v * (w * n as f64).cos(), im - v * (w * n as f64).sin())
            });
            let direct = re * re + im * im;
            let g = goertzel_power(&x, f, sr);
            assert!((g - direct).abs() < 1e-8 * direct.max(1.0), "{g} vs {direct}");
        }
    }

    #[test]
    fn am_spectrum_peaks_at_modulation_rate() {
        let sr = 1000.0;
        let envelope = Envelope {
            center_hz: 1000.0,
            samples: (0..4000)
                .map(|i| 1.0 + 0.5 * (2.0 * PI * 8.0 * i as f64 / sr).sin())
                .collect(),
        };
        let axis = ModulationAxis::from_centers(vec![2.0, 4.0, 8.0, 16.0, 32.0]);
        let spectrum = AmSpectrum::compute(&[envelope.clone(), envelope], sr, &axis).unwrap();

        let peak = (0..5)
            .max_by(|&a, &b| spectrum.total[a].total_cmp(&spectrum.total[b]))
            .unwrap();
        assert_eq!(peak, 2);
        // Sinusoid of amplitude 0.5 over 4 s: 2 * (0.5 * N / 2)^2 / (fs * N) = 0.5 per channel
        assert!((spectrum.per_channel[0][2] - 0.5).abs() < 1e-9);
        assert!((spectrum.total[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn am_spectrum_of_constant_is_zero() {
        let envelope = Envelope {
            center_hz: 500.0,
            samples: vec![0.7; 1000],
        };
        let axis = ModulationAxis::from_centers(vec![1.0, 10.0]);
        let spectrum = AmSpectrum::compute(&[envelope], 1000.0, &axis).unwrap();
        assert!(spectrum.total.iter().all(|&v| v.abs() < 1e-20));
        assert!(AmSpectrum::compute(&[], 1000.0, &axis).is_err());
    }

    #[test]
    fn lomb_scargle_finds_tone_in_gappy_data() {
        // 5 Hz vibrato sampled every 10 ms, with a gap
        let (times, y): (Vec<f64>, Vec<f64>) = (0..200)
            .filter(|i| !(80..110).contains(i))
            .map(|i| {
                let t = i as f64 * 0.01;
                (t, 200.0 + 10.0 * (2.0 * PI * 5.0 * t).sin())
            })
            .unzip();

        let at_peak = lomb_scargle(&times, &y, 5.0);
        let off_peak = lomb_scargle(&times, &y, 13.0);
        assert!(at_peak > 20.0 * off_peak);
    }

    #[test]
    fn artifacts_removed() {
        let config = PeriodicityConfig::default();
        let mut frames = Vec::new();
        // 10-frame run at 200 Hz (100 ms), then an unvoiced gap
        for i in 0..10 {
            frames.push(frame(i as f64 * 0.01, Some(200.0)));
        }
        frames.push(frame(0.10, None));
        // 3-frame run (30 ms): dropped
        for i in 11..14 {
            frames.push(frame(i as f64 * 0.01, Some(150.0)));
        }
        // Out-of-range f0: dropped
        frames.push(frame(0.14, Some(900.0)));
        let trace = PeriodicityTrace {
            frames,
            hop_seconds: 0.01,
        };

        let track = remove_artifacts(&trace, &config);
        assert_eq!(track.len(), 10);
        assert!(track.iter().all(|&(_, f0)| f0 == 200.0));
    }

    #[test]
    fn octave_jump_splits_run() {
        let config = PeriodicityConfig::default();
        let mut frames = Vec::new();
        for i in 0..10 {
            frames.push(frame(i as f64 * 0.01, Some(100.0)));
        }
        // +12 semitones for 5 frames: its own short run, dropped
        for i in 10..15 {
            frames.push(frame(i as f64 * 0.01, Some(200.0)));
        }
        let trace = PeriodicityTrace {
            frames,
            hop_seconds: 0.01,
        };
        let track = remove_artifacts(&trace, &config);
        assert_eq!(track.len(), 10);
    }

    #[test]
    fn interval_mean_of_linear_curve() {
        let xs = [1.0, 2.0, 4.0];
        let ys = [1.0, 2.0, 4.0];
        // Inside the axis the curve is y = x; at the ends it is held
        assert!((interpolate(&xs, &ys, 3.0) - 3.0).abs() < 1e-12);
        assert_eq!(interpolate(&xs, &ys, 0.5), 1.0);
        assert_eq!(interpolate(&xs, &ys, 9.0), 4.0);
        let m = interval_mean(&xs, &ys, (2.0, 4.0));
        assert!(m > 2.0 && m < 4.0);
    }

    #[test]
    fn f0_spectrum_needs_three_points() {
        let axis = ModulationAxis::from_centers(vec![1.0, 2.0, 4.0]);
        let trace = PeriodicityTrace {
            frames: vec![frame(0.0, Some(120.0)), frame(0.01, None)],
            hop_seconds: 0.01,
        };
        let spectrum =
            F0ModulationSpectrum::compute(&trace, &PeriodicityConfig::default(), &axis).unwrap();
        assert_eq!(spectrum.values, vec![0.0; 3]);
        assert!(spectrum.track.is_empty());
    }

    #[test]
    fn f0_spectrum_peaks_at_vibrato_rate() {
        let frames: Vec<PeriodicityFrame> = (0..300)
            .map(|i| {
                let t = i as f64 * 0.01;
                frame(t, Some(200.0 + 5.0 * (2.0 * PI * 4.0 * t).sin()))
            })
            .collect();
        let trace = PeriodicityTrace {
            frames,
            hop_seconds: 0.01,
        };
        let axis = ModulationAxis::from_centers(vec![1.0, 2.0, 4.0, 8.0, 16.0]);
        let spectrum =
            F0ModulationSpectrum::compute(&trace, &PeriodicityConfig::default(), &axis).unwrap();

        let peak = (0..5)
            .max_by(|&a, &b| spectrum.values[a].total_cmp(&spectrum.values[b]))
            .unwrap();
        assert_eq!(spectrum.frequencies[peak], 4.0);
    }

    #[test]
    fn f0_spectrum_rejects_frequencies_above_track_nyquist() {
        // 10 ms frames cannot resolve anything at or above 50 Hz
        let trace = vibrato_trace(100.0, 3.0);
        let axis = ModulationAxis::from_centers(vec![4.0, 20.0, 50.0, 96.0, 150.0, 196.0]);
        let result = F0ModulationSpectrum::compute(&trace, &PeriodicityConfig::default(), &axis);
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(check_f0_track_rate(100.0, &ModulationAxis::from_centers(vec![4.0, 49.9])).is_ok());
    }

    #[test]
    fn dense_track_vibrato_has_no_mirror_peaks() {
        let trace = vibrato_trace(800.0, 3.0);
        let axis = ModulationAxis::from_centers(vec![4.0, 20.0, 50.0, 96.0, 150.0, 196.0]);
        let spectrum =
            F0ModulationSpectrum::compute(&trace, &PeriodicityConfig::default(), &axis).unwrap();

        assert!((spectrum.frame_rate - 800.0).abs() < 1e-9);
        let at_vibrato = spectrum.values[0];
        assert!(spectrum.values[3] < 0.01 * at_vibrato, "96 Hz: {}", spectrum.values[3]);
        assert!(spectrum.values[5] < 0.01 * at_vibrato, "196 Hz: {}", spectrum.values[5]);
    }

    #[test]
    fn f0_spectrum_reads_half_squared_excursion() {
        // A = 5 Hz over a whole number of vibrato periods: A^2 / 2 = 12.5
        let trace = vibrato_trace(800.0, 3.0);
        let axis = ModulationAxis::from_centers(vec![4.0]);
        let spectrum =
            F0ModulationSpectrum::compute(&trace, &PeriodicityConfig::default(), &axis).unwrap();
        assert!((spectrum.values[0] - 12.5).abs() < 0.1, "{}", spectrum.values[0]);
    }

    #[test]
    fn aperiodicity_threshold_gates_candidate_periods() {
        // No dip below the salience threshold, moderate aperiodicity
        let frames: Vec<PeriodicityFrame> = (0..10)
            .map(|i| PeriodicityFrame {
                time: i as f64 * 0.01,
                period: None,
                salience: 0.0,
                aperiodicity: 0.5,
                candidate_period: Some(1.0 / 180.0),
            })
            .collect();
        let trace = PeriodicityTrace {
            frames,
            hop_seconds: 0.01,
        };

        let track = remove_artifacts(&trace, &PeriodicityConfig::default());
        assert_eq!(track.len(), 10);
        assert!(track.iter().all(|&(_, f0)| (f0 - 180.0).abs() < 1e-9));

        let strict = PeriodicityConfig {
            aperiodicity_threshold: 0.3,
            ..PeriodicityConfig::default()
        };
        assert!(remove_artifacts(&trace, &strict).is_empty());
    }

    #[test]
    fn am_scalogram_follows_modulation_rate() {
        let sr = 1000.0;
        let envelope = Envelope {
            center_hz: 1000.0,
            samples: (0..4000)
                .map(|i| 1.0 + 0.5 * (2.0 * PI * 8.0 * i as f64 / sr).sin())
                .collect(),
        };
        let axis = ModulationAxis::from_centers(vec![2.0, 8.0, 32.0]);
        let config = ScalogramConfig {
            window_periods: 6.0,
            ..ScalogramConfig::default()
        };
        let scalogram = AmScalogram::compute(&[envelope], sr, &axis, &config).unwrap();

        assert_eq!(scalogram.times.len(), 41);
        assert_eq!(scalogram.values.len(), 41);
        assert!((scalogram.times[20] - 2.0).abs() < 1e-12);

        let middle = &scalogram.values[20];
        let at_rate = middle[1].unwrap();
        // 6 periods of a 0.5 sinusoid: 0.5^2 * N / (2 fs) with N = 750
        assert!((at_rate - 0.09375).abs() < 1e-3, "{at_rate}");
        assert!(middle[0].unwrap() < 0.01 * at_rate);
        assert!(middle[2].unwrap() < 0.05 * at_rate);

        // Windows never center on the edges
        assert!(scalogram.values[0].iter().all(Option::is_none));
        assert!(scalogram.values[40].iter().all(Option::is_none));
    }

    #[test]
    fn am_scalogram_leaves_overlong_windows_empty() {
        let envelope = Envelope {
            center_hz: 500.0,
            samples: vec![1.0; 2000],
        };
        // 5 periods of 0.5 Hz is 10 s, longer than the 2 s signal
        let axis = ModulationAxis::from_centers(vec![0.5, 10.0]);
        let scalogram =
            AmScalogram::compute(&[envelope], 1000.0, &axis, &ScalogramConfig::default()).unwrap();
        assert!(scalogram.values.iter().all(|cells| cells[0].is_none()));
        assert!(scalogram.values.iter().any(|cells| cells[1].is_some()));
        assert!(AmScalogram::compute(&[], 1000.0, &axis, &ScalogramConfig::default()).is_err());
    }

    #[test]
    fn f0_scalogram_follows_vibrato_rate() {
        let trace = vibrato_trace(800.0, 3.0);
        let axis = ModulationAxis::from_centers(vec![4.0, 16.0]);
        let scalogram = F0ModulationScalogram::compute(
            &trace,
            &PeriodicityConfig::default(),
            &axis,
            &ScalogramConfig::default(),
            3.0,
        )
        .unwrap();

        let cell = &scalogram.values[15];
        let (vibrato, faster) = (cell[0].unwrap(), cell[1].unwrap());
        assert!(vibrato > 10.0 * faster, "{vibrato} vs {faster}");
        assert!((vibrato - 12.5).abs() < 0.5);
    }

    #[test]
    fn f0_scalogram_without_voicing_is_empty() {
        let trace = PeriodicityTrace {
            frames: (0..800).map(|i| frame(i as f64 / 800.0, None)).collect(),
            hop_seconds: 1.0 / 800.0,
        };
        let axis = ModulationAxis::from_centers(vec![4.0, 16.0]);
        let scalogram = F0ModulationScalogram::compute(
            &trace,
            &PeriodicityConfig::default(),
            &axis,
            &ScalogramConfig::default(),
            1.0,
        )
        .unwrap();
        assert!(scalogram.values.iter().flatten().all(Option::is_none));

        let aliased = F0ModulationScalogram::compute(
            &vibrato_trace(100.0, 1.0),
            &PeriodicityConfig::default(),
            &ModulationAxis::from_centers(vec![4.0, 96.0]),
            &ScalogramConfig::default(),
            1.0,
        );
        assert!(matches!(aliased, Err(Error::Configuration(_))));
    }

    #[test]
    fn scalogram_config_validation() {
        assert!(ScalogramConfig::default().validate().is_ok());
        let config = ScalogramConfig {
            window_periods: 0.0,
            ..ScalogramConfig::default()
        };
        assert!(config.validate().is_err());
        let config = ScalogramConfig {
            shift_seconds: f64::NAN,
            ..ScalogramConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
