//! Periodicity / pitch-salience estimation.
//!
//! A YIN-style estimator over sliding frames of the raw waveform. For each
//! frame the squared difference function
//!
//! ```text
//! d(tau) = sum_{j < W} (x[s + j] - x[s + j + tau])^2
//! ```
//!
//! is normalized by its cumulative mean,
//!
//! ```text
//! d'(tau) = d(tau) * tau / sum_{k = 1..tau} d(k)      (d'(0) = 1)
//! ```
//!
//! and the first candidate period whose `d'` drops below the threshold is
//! followed down to its local minimum. Taking the *first* dip rather than
//! the global minimum picks the shortest plausible period and avoids
//! octave-down errors. Salience is `1 - d'` at the chosen period.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_finite};
use crate::filterbank::validate_sample_rate;
use crate::signal::Signal;

/// How frames near the end of the signal are handled when the longest
/// candidate period would read past the last sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Keep every frame whose integration window fits in the signal, and
    /// extend the lag range by repeating the last sample.
    #[default]
    Pad,
    /// Only keep frames for which the window plus the longest period fits.
    Omit,
}

/// Periodicity estimator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicityConfig {
    /// Lowest f0 candidate in Hz.
    pub f0_min_hz: f64,
    /// Highest f0 candidate in Hz.
    pub f0_max_hz: f64,
    /// Normalized-difference threshold a dip must fall below.
    pub threshold: f64,
    /// Frame hop in seconds.
    pub hop_seconds: f64,
    /// Integration window in seconds; `None` uses one period of `f0_min_hz`.
    pub window_seconds: Option<f64>,
    /// End-of-signal frame handling.
    pub boundary: BoundaryPolicy,
    /// Frames whose mean-square amplitude falls below this are reported
    /// unvoiced. The floor is absolute, not relative to the signal level:
    /// the default of 1e-10 (-100 dB re a full-scale square wave) also
    /// silences periodic input recorded that quietly. Set it to 0 to
    /// analyze such material.
    pub silence_floor: f64,
    /// f0 jumps larger than this (in semitones) split voiced runs before the
    /// f0 modulation spectrum is computed.
    pub max_jump_semitones: f64,
    /// Voiced runs shorter than this (in seconds) are discarded before the
    /// f0 modulation spectrum is computed.
    pub min_voiced_duration: f64,
    /// Hop in samples of the dense f0 track behind the f0 modulation
    /// spectrum. The track is sampled at `fs / f0_track_hop`, so every
    /// modulation frequency must stay below half that rate.
    pub f0_track_hop: usize,
    /// Frames whose aperiodicity exceeds this are left out of the f0 track.
    /// Frames without a dip below `threshold` still contribute their
    /// best candidate period when they pass this test.
    pub aperiodicity_threshold: f64,
}

impl Default for PeriodicityConfig {
    fn default() -> Self {
        Self {
            f0_min_hz: 60.0,
            f0_max_hz: 550.0,
            threshold: 0.2,
            hop_seconds: 0.01,
            window_seconds: None,
            boundary: BoundaryPolicy::Pad,
            silence_floor: 1e-10,
            max_jump_semitones: 10.0,
            min_voiced_duration: 0.08,
            f0_track_hop: 20,
            aperiodicity_threshold: 0.8,
        }
    }
}

impl PeriodicityConfig {
    /// Check parameter ranges independent of sample rate.
    pub fn validate(&self) -> Result<()> {
        if !(self.f0_min_hz.is_finite() && self.f0_min_hz > 0.0) {
            return Err(Error::configuration(format!(
                "f0_min_hz must be positive, got {}",
                self.f0_min_hz
            )));
        }
        if !(self.f0_max_hz.is_finite() && self.f0_max_hz > self.f0_min_hz) {
            return Err(Error::configuration(format!(
                "f0_max_hz ({}) must be above f0_min_hz ({})",
                self.f0_max_hz, self.f0_min_hz
            )));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::configuration(format!(
                "periodicity threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if !(self.hop_seconds.is_finite() && self.hop_seconds > 0.0) {
            return Err(Error::configuration(format!(
                "hop_seconds must be positive, got {}",
                self.hop_seconds
            )));
        }
        if let Some(window) = self.window_seconds
            && !(window.is_finite() && window > 0.0)
        {
            return Err(Error::configuration(format!(
                "window_seconds must be positive, got {window}"
            )));
        }
        if !(self.silence_floor.is_finite() && self.silence_floor >= 0.0) {
            return Err(Error::configuration("silence_floor must be non-negative"));
        }
        if !(self.max_jump_semitones.is_finite() && self.max_jump_semitones > 0.0) {
            return Err(Error::configuration("max_jump_semitones must be positive"));
        }
        if !(self.min_voiced_duration.is_finite() && self.min_voiced_duration >= 0.0) {
            return Err(Error::configuration("min_voiced_duration must be non-negative"));
        }
        if self.f0_track_hop == 0 {
            return Err(Error::configuration("f0_track_hop must be at least one sample"));
        }
        if !(self.aperiodicity_threshold.is_finite() && self.aperiodicity_threshold > 0.0) {
            return Err(Error::configuration(format!(
                "aperiodicity_threshold must be positive, got {}",
                self.aperiodicity_threshold
            )));
        }
        Ok(())
    }
}

/// Result of one analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicityFrame {
    /// Frame center time in seconds.
    pub time: f64,
    /// Estimated period in seconds; `None` when no dip fell below the
    /// threshold or the frame is silent.
    pub period: Option<f64>,
    /// Pitch salience in `[0, 1]`; 0 for unvoiced frames.
    pub salience: f64,
    /// Smallest normalized difference over the candidate range (1 for
    /// silent frames).
    pub aperiodicity: f64,
    /// Period in seconds at that smallest normalized difference, whether or
    /// not it fell below the threshold; `None` for silent frames.
    pub candidate_period: Option<f64>,
}

impl PeriodicityFrame {
    /// Fundamental frequency in Hz for voiced frames.
    pub fn f0_hz(&self) -> Option<f64> {
        self.period.map(|p| 1.0 / p)
    }

    /// True when a period was found.
    pub fn is_voiced(&self) -> bool {
        self.period.is_some()
    }

    /// f0 in Hz as it enters the f0 modulation track: the thresholded period
    /// when there is one, the best candidate otherwise, and nothing once the
    /// aperiodicity exceeds `aperiodicity_threshold`.
    pub fn track_f0_hz(&self, aperiodicity_threshold: f64) -> Option<f64> {
        if self.aperiodicity > aperiodicity_threshold {
            return None;
        }
        self.period.or(self.candidate_period).map(|p| 1.0 / p)
    }
}

/// Per-frame periodicity over a whole signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicityTrace {
    /// Frames in time order.
    pub frames: Vec<PeriodicityFrame>,
    /// Frame hop in seconds.
    pub hop_seconds: f64,
}

impl PeriodicityTrace {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterator over voiced frames.
    pub fn voiced(&self) -> impl Iterator<Item = &PeriodicityFrame> {
        self.frames.iter().filter(|f| f.is_voiced())
    }

    /// Share of frames that are voiced, 0 for an empty trace.
    pub fn voiced_fraction(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.voiced().count() as f64 / self.frames.len() as f64
    }

    /// Mean salience over voiced frames, 0 if none is voiced.
    pub fn mean_salience(&self) -> f64 {
        let saliences: Vec<f64> = self.voiced().map(|f| f.salience).collect();
        tmst_core::mean(&saliences)
    }

    /// Median salience over voiced frames, 0 if none is voiced.
    pub fn median_salience(&self) -> f64 {
        median(self.voiced().map(|f| f.salience).collect()).unwrap_or(0.0)
    }

    /// Median f0 in Hz over voiced frames.
    pub fn median_f0(&self) -> Option<f64> {
        median(self.voiced().filter_map(PeriodicityFrame::f0_hz).collect())
    }

    /// `(time, f0)` pairs of voiced frames.
    pub fn f0_track(&self) -> Vec<(f64, f64)> {
        self.frames
            .iter()
            .filter_map(|f| f.f0_hz().map(|f0| (f.time, f0)))
            .collect()
    }
}

pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some(0.5 * (values[mid - 1] + values[mid]))
    }
}

/// Frame geometry of an estimator bound to one sample rate.
#[derive(Debug, Clone)]
pub struct PeriodicityEstimator {
    config: PeriodicityConfig,
    sample_rate: f64,
    tau_min: usize,
    tau_max: usize,
    window: usize,
    hop: usize,
}

impl PeriodicityEstimator {
    /// Bind a configuration to a sample rate.
    ///
    /// Candidate periods run from `max(2, floor(fs / f0_max))` to
    /// `ceil(fs / f0_min)` samples.
    pub fn new(config: PeriodicityConfig, sample_rate: f64) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        config.validate()?;

        let nyquist = sample_rate / 2.0;
        if config.f0_max_hz >= nyquist {
            return Err(Error::configuration(format!(
                "f0_max_hz {} is at or above Nyquist ({nyquist} Hz)",
                config.f0_max_hz
            )));
        }

        let tau_min = ((sample_rate / config.f0_max_hz).floor() as usize).max(2);
        let tau_max = (sample_rate / config.f0_min_hz).ceil() as usize;
        if tau_max <= tau_min {
            return Err(Error::configuration(format!(
                "f0 range {}-{} Hz leaves no candidate periods at {sample_rate} Hz",
                config.f0_min_hz, config.f0_max_hz
            )));
        }
        let window = config
            .window_seconds
            .map_or(tau_max, |w| tmst_core::seconds_to_samples(w, sample_rate))
            .max(1);
        let hop = ((config.hop_seconds * sample_rate).round() as usize).max(1);

        Ok(Self {
            config,
            sample_rate,
            tau_min,
            tau_max,
            window,
            hop,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PeriodicityConfig {
        &self.config
    }

    /// Shortest and longest candidate period in samples.
    pub fn period_range(&self) -> (usize, usize) {
        (self.tau_min, self.tau_max)
    }

    /// Integration window in samples.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Frame hop in samples.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate / self.hop as f64
    }

    /// The same estimator stepping every `config.f0_track_hop` samples, for
    /// the dense f0 track behind the f0 modulation spectrum.
    pub fn f0_track_estimator(&self) -> Self {
        Self {
            hop: self.config.f0_track_hop,
            ..self.clone()
        }
    }

    /// Smallest signal that yields at least one full frame: window plus the
    /// longest candidate period.
    pub fn min_signal_len(&self) -> usize {
        self.window + self.tau_max
    }

    /// Start sample of every frame for a signal of `len` samples.
    pub fn frame_starts(&self, len: usize) -> Vec<usize> {
        let span = match self.config.boundary {
            BoundaryPolicy::Omit => self.window + self.tau_max,
            BoundaryPolicy::Pad => self.window,
        };
        if len < span {
            return Vec::new();
        }
        (0..=len - span).step_by(self.hop).collect()
    }

    /// Estimate periodicity of every frame, in parallel.
    pub fn estimate(&self, signal: &Signal) -> Result<PeriodicityTrace> {
        if (signal.sample_rate() - self.sample_rate).abs() > 1e-9 * self.sample_rate {
            return Err(Error::configuration(format!(
                "sample rate mismatch: estimator bound to {} Hz, signal is {} Hz",
                self.sample_rate,
                signal.sample_rate()
            )));
        }
        let samples = signal.samples();
        let starts = self.frame_starts(samples.len());

        // Pad the lag tail with the last sample
        let padded: Vec<f64> = match (self.config.boundary, samples.last()) {
            (BoundaryPolicy::Pad, Some(&last)) => samples
                .iter()
                .copied()
                .chain(core::iter::repeat_n(last, self.tau_max))
                .collect(),
            _ => samples.to_vec(),
        };

        let frames: Vec<PeriodicityFrame> = starts
            .par_iter()
            .map(|&start| self.analyze_frame(&padded[start..start + self.window + self.tau_max], start))
            .collect();

        let saliences: Vec<f64> = frames.iter().map(|f| f.salience).collect();
        ensure_finite(&saliences, "periodicity", 0)?;

        tracing::debug!(
            frames = frames.len(),
            voiced = frames.iter().filter(|f| f.is_voiced()).count(),
            "periodicity estimated"
        );

        Ok(PeriodicityTrace {
            frames,
            hop_seconds: self.hop as f64 / self.sample_rate,
        })
    }

    /// Cumulative-mean-normalized difference function of one frame, indexed
    /// by lag `0..=tau_max`. `frame` holds `window + tau_max` samples.
    pub fn normalized_difference(&self, frame: &[f64]) -> Vec<f64> {
        let mut cmndf = vec![1.0; self.tau_max + 1];
        let mut cumulative = 0.0;
        for tau in 1..=self.tau_max {
            let d: f64 = (0..self.window)
                .map(|j| {
                    let delta = frame[j] - frame[j + tau];
                    delta * delta
                })
                .sum();
            cumulative += d;
            cmndf[tau] = if cumulative > 0.0 {
                d * tau as f64 / cumulative
            } else {
                1.0
            };
        }
        cmndf
    }

    fn analyze_frame(&self, frame: &[f64], start: usize) -> PeriodicityFrame {
        let time = (start as f64 + self.window as f64 / 2.0) / self.sample_rate;
        if tmst_core::mean_square(&frame[..self.window]) < self.config.silence_floor {
            return PeriodicityFrame {
                time,
                period: None,
                salience: 0.0,
                aperiodicity: 1.0,
                candidate_period: None,
            };
        }

        let cmndf = self.normalized_difference(frame);
        let (best, aperiodicity) = (self.tau_min..=self.tau_max)
            .map(|tau| (tau, cmndf[tau]))
            .fold((self.tau_min, f64::INFINITY), |acc, (tau, v)| if v < acc.1 { (tau, v) } else { acc });
        let candidate_period = Some(parabolic_interpolation(&cmndf, best) / self.sample_rate);

        let Some(first) = (self.tau_min..=self.tau_max).find(|&tau| cmndf[tau] < self.config.threshold)
        else {
            return PeriodicityFrame {
                time,
                period: None,
                salience: 0.0,
                aperiodicity,
                candidate_period,
            };
        };

        let mut tau = first;
        while tau < self.tau_max && cmndf[tau + 1] < cmndf[tau] {
            tau += 1;
        }

        let refined = parabolic_interpolation(&cmndf, tau);
        PeriodicityFrame {
            time,
            period: Some(refined / self.sample_rate),
            salience: (1.0 - cmndf[tau]).clamp(0.0, 1.0),
            aperiodicity,
            candidate_period,
        }
    }
}

/// Refine the position of the minimum at `x` with a parabola through its
/// neighbours. The offset is limited to half a sample.
fn parabolic_interpolation(values: &[f64], x: usize) -> f64 {
    if x == 0 || x + 1 >= values.len() {
        return x as f64;
    }
    let (left, center, right) = (values[x - 1], values[x], values[x + 1]);
    let denominator = 2.0 * (left - 2.0 * center + right);
    if denominator.abs() > 1e-12 {
        x as f64 + ((left - right) / denominator).clamp(-0.5, 0.5)
    } else {
        x as f64
    }
}
