//! Modulation power spectrum (MPS).
//!
//! The MPS is an auditory-frequency x modulation-frequency grid. Each cell
//! holds the power of one modulation band of one auditory channel,
//! normalized so that channels of different loudness are comparable.
//!
//! Rows are assembled by [`MpsBuilder`] from per-channel [`ChannelRow`]s
//! (the raw, pre-normalization band powers) and normalized once every row
//! is present.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::{Error, Result, ensure_finite};
use crate::modulation::ModulationBand;

/// Envelope power below which a channel counts as silent.
///
/// A silent channel contributes an all-zero row instead of dividing by a
/// near-zero power.
pub const SILENT_POWER_FLOOR: f64 = 1e-20;

/// How band powers are normalized into MPS cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MpsNormalization {
    /// Band power divided by the channel's own envelope power `mean(E^2)`.
    #[default]
    ChannelPower,
    /// Band power divided by the mean envelope power across all channels.
    /// Preserves level differences between channels.
    SignalPower,
    /// Modulation depth `sqrt(2 * band power) / mean(E)` (amplitude, not
    /// power).
    ModulationDepth,
}

/// Raw, pre-normalization band powers of one auditory channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRow {
    /// Auditory center frequency in Hz
    pub auditory_hz: f64,
    /// Envelope mean (DC level)
    pub envelope_mean: f64,
    /// Envelope power `mean(E^2)`
    pub envelope_power: f64,
    /// Mean squared amplitude of each modulation band
    pub band_powers: Vec<f64>,
}

impl ChannelRow {
    /// Summarize an envelope and its modulation bands.
    pub fn from_bands(envelope: &Envelope, bands: &[ModulationBand]) -> Self {
        Self {
            auditory_hz: envelope.center_hz,
            envelope_mean: envelope.mean(),
            envelope_power: envelope.power(),
            band_powers: bands.iter().map(ModulationBand::power).collect(),
        }
    }

    /// True when the envelope power is below [`SILENT_POWER_FLOOR`].
    pub fn is_silent(&self) -> bool {
        self.envelope_power < SILENT_POWER_FLOOR
    }

    /// Envelope variance `mean(E^2) - mean(E)^2`, clamped at zero.
    pub fn envelope_variance(&self) -> f64 {
        (self.envelope_power - self.envelope_mean * self.envelope_mean).max(0.0)
    }
}

/// Completed modulation power spectrum.
///
/// All cells are finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mps {
    auditory_hz: Vec<f64>,
    modulation_hz: Vec<f64>,
    values: Vec<Vec<f64>>,
    normalization: MpsNormalization,
    raw_rows: Vec<ChannelRow>,
}

impl Mps {
    /// Auditory center frequencies (row axis).
    pub fn auditory_frequencies(&self) -> &[f64] {
        &self.auditory_hz
    }

    /// Modulation center frequencies (column axis).
    pub fn modulation_frequencies(&self) -> &[f64] {
        &self.modulation_hz
    }

    /// `(n_auditory, n_modulation)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.auditory_hz.len(), self.modulation_hz.len())
    }

    /// Grid as rows of auditory channels: `values()[auditory][modulation]`.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Row of one auditory channel.
    pub fn row(&self, auditory: usize) -> Option<&[f64]> {
        self.values.get(auditory).map(Vec::as_slice)
    }

    /// Single cell.
    pub fn get(&self, auditory: usize, modulation: usize) -> Option<f64> {
        self.values.get(auditory)?.get(modulation).copied()
    }

    /// Normalization used to build the grid.
    pub fn normalization(&self) -> MpsNormalization {
        self.normalization
    }

    /// Raw per-channel rows before normalization.
    pub fn raw_rows(&self) -> &[ChannelRow] {
        &self.raw_rows
    }

    /// Sum of each row.
    pub fn row_sums(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }

    /// Sum over auditory channels for each modulation frequency.
    pub fn modulation_profile(&self) -> Vec<f64> {
        let mut profile = vec![0.0; self.modulation_hz.len()];
        for row in &self.values {
            for (acc, &v) in profile.iter_mut().zip(row) {
                *acc += v;
            }
        }
        profile
    }

    /// Find the cell with the largest value.
    ///
    /// Returns (auditory_hz, modulation_hz, value). Ties resolve to the
    /// lowest auditory, then lowest modulation index.
    pub fn peak(&self) -> (f64, f64, f64) {
        let mut best = (0, 0, f64::NEG_INFINITY);
        for (a, row) in self.values.iter().enumerate() {
            for (m, &v) in row.iter().enumerate() {
                if v > best.2 {
                    best = (a, m, v);
                }
            }
        }
        if best.2 == f64::NEG_INFINITY {
            return (0.0, 0.0, 0.0);
        }
        (self.auditory_hz[best.0], self.modulation_hz[best.1], best.2)
    }

    /// Export as CSV with auditory frequencies as rows and modulation
    /// frequencies as columns.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("auditory_hz");
        for &mf in &self.modulation_hz {
            csv.push_str(&format!(",{:.3}", mf));
        }
        csv.push('\n');

        for (row, &cf) in self.values.iter().zip(&self.auditory_hz) {
            csv.push_str(&format!("{:.1}", cf));
            for &v in row {
                csv.push_str(&format!(",{:.6e}", v));
            }
            csv.push('\n');
        }

        csv
    }
}

/// Assembles an [`Mps`] from per-channel rows.
///
/// Rows may arrive in any order (for example from parallel workers); the
/// grid is only normalized in [`build`](Self::build), once every row is
/// present.
#[derive(Debug, Clone)]
pub struct MpsBuilder {
    modulation_hz: Vec<f64>,
    normalization: MpsNormalization,
    rows: Vec<Option<ChannelRow>>,
}

impl MpsBuilder {
    /// Create a builder for `n_auditory` channels over the given modulation
    /// axis.
    pub fn new(n_auditory: usize, modulation_hz: Vec<f64>, normalization: MpsNormalization) -> Self {
        Self {
            modulation_hz,
            normalization,
            rows: vec![None; n_auditory],
        }
    }

    /// Place the raw row of auditory channel `index`.
    pub fn insert(&mut self, index: usize, row: ChannelRow) -> Result<()> {
        let n_auditory = self.rows.len();
        let slot = self.rows.get_mut(index).ok_or_else(|| {
            Error::configuration(format!(
                "auditory index {index} out of range for {n_auditory} channels"
            ))
        })?;
        if row.band_powers.len() != self.modulation_hz.len() {
            return Err(Error::configuration(format!(
                "row has {} modulation bands, expected {}",
                row.band_powers.len(),
                self.modulation_hz.len()
            )));
        }
        *slot = Some(row);
        Ok(())
    }

    /// Raw row of channel `index`, if inserted.
    pub fn raw_row(&self, index: usize) -> Option<&ChannelRow> {
        self.rows.get(index)?.as_ref()
    }

    /// Normalize and return the completed grid.
    ///
    /// Fails with [`Error::InsufficientData`] when there are no channels or
    /// a row is missing.
    pub fn build(self) -> Result<Mps> {
        if self.rows.is_empty() {
            return Err(Error::insufficient_data("MPS has no auditory channels"));
        }
        let mut raw_rows = Vec::with_capacity(self.rows.len());
        for (index, row) in self.rows.into_iter().enumerate() {
            raw_rows.push(row.ok_or_else(|| {
                Error::insufficient_data(format!("MPS row {index} was never filled"))
            })?);
        }

        let signal_power = raw_rows.iter().map(|r| r.envelope_power).sum::<f64>() / raw_rows.len() as f64;

        let mut values = Vec::with_capacity(raw_rows.len());
        for (index, row) in raw_rows.iter().enumerate() {
            let normalized: Vec<f64> = if row.is_silent() {
                vec![0.0; row.band_powers.len()]
            } else {
                match self.normalization {
                    MpsNormalization::ChannelPower => row
                        .band_powers
                        .iter()
                        .map(|&p| p / row.envelope_power)
                        .collect(),
                    MpsNormalization::SignalPower => row
                        .band_powers
                        .iter()
                        .map(|&p| p / signal_power)
                        .collect(),
                    MpsNormalization::ModulationDepth => row
                        .band_powers
                        .iter()
                        .map(|&p| (2.0 * p).sqrt() / row.envelope_mean)
                        .collect(),
                }
            };
            ensure_finite(&normalized, "mps", index)?;
            values.push(normalized);
        }

        tracing::debug!(
            auditory = raw_rows.len(),
            modulation = self.modulation_hz.len(),
            normalization = ?self.normalization,
            "MPS built"
        );

        Ok(Mps {
            auditory_hz: raw_rows.iter().map(|r| r.auditory_hz).collect(),
            modulation_hz: self.modulation_hz,
            values,
            normalization: self.normalization,
            raw_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(auditory_hz: f64, mean: f64, power: f64, bands: &[f64]) -> ChannelRow {
        ChannelRow {
            auditory_hz,
            envelope_mean: mean,
            envelope_power: power,
            band_powers: bands.to_vec(),
        }
    }

    #[test]
    fn channel_power_normalization() {
        let mut builder = MpsBuilder::new(2, vec![4.0, 8.0], MpsNormalization::ChannelPower);
        builder.insert(1, row(2000.0, 1.0, 4.0, &[1.0, 2.0])).unwrap();
        builder.insert(0, row(500.0, 0.5, 0.5, &[0.1, 0.2])).unwrap();
        assert_eq!(builder.raw_row(1).unwrap().auditory_hz, 2000.0);

        let mps = builder.build().unwrap();
        assert_eq!(mps.shape(), (2, 2));
        assert_eq!(mps.auditory_frequencies(), &[500.0, 2000.0]);
        assert!((mps.get(0, 0).unwrap() - 0.2).abs() < 1e-12);
        assert!((mps.get(1, 1).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(mps.raw_rows()[0].band_powers, vec![0.1, 0.2]);
    }

    #[test]
    fn signal_power_normalization_keeps_levels() {
        let mut builder = MpsBuilder::new(2, vec![4.0], MpsNormalization::SignalPower);
        builder.insert(0, row(500.0, 1.0, 1.0, &[0.5])).unwrap();
        builder.insert(1, row(2000.0, 1.0, 3.0, &[0.5])).unwrap();
        let mps = builder.build().unwrap();
        // Mean channel power is 2
        assert_eq!(mps.values(), &[vec![0.25], vec![0.25]]);
    }

    #[test]
    fn modulation_depth_normalization() {
        let mut builder = MpsBuilder::new(1, vec![4.0], MpsNormalization::ModulationDepth);
        // Sinusoidal envelope 1 + 0.5 sin: band power 0.125, depth 0.5
        builder.insert(0, row(1000.0, 1.0, 1.125, &[0.125])).unwrap();
        let mps = builder.build().unwrap();
        assert!((mps.get(0, 0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn silent_channel_gives_zero_row() {
        for normalization in [
            MpsNormalization::ChannelPower,
            MpsNormalization::SignalPower,
            MpsNormalization::ModulationDepth,
        ] {
            let mut builder = MpsBuilder::new(1, vec![1.0, 2.0, 4.0], normalization);
            builder.insert(0, row(100.0, 0.0, 0.0, &[0.0, 0.0, 0.0])).unwrap();
            let mps = builder.build().unwrap();
            assert_eq!(mps.row(0).unwrap(), &[0.0, 0.0, 0.0]);
            assert_eq!(mps.peak(), (100.0, 1.0, 0.0));
        }
    }

    #[test]
    fn missing_row_is_insufficient() {
        let mut builder = MpsBuilder::new(2, vec![4.0], MpsNormalization::default());
        builder.insert(0, row(500.0, 1.0, 1.0, &[0.5])).unwrap();
        assert!(matches!(builder.build(), Err(Error::InsufficientData(_))));
        assert!(matches!(
            MpsBuilder::new(0, vec![4.0], MpsNormalization::default()).build(),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn insert_validates_shape() {
        let mut builder = MpsBuilder::new(1, vec![4.0, 8.0], MpsNormalization::default());
        assert!(builder.insert(3, row(500.0, 1.0, 1.0, &[0.5, 0.5])).is_err());
        assert!(builder.insert(0, row(500.0, 1.0, 1.0, &[0.5])).is_err());
    }

    #[test]
    fn profile_peak_and_csv() {
        let mut builder = MpsBuilder::new(2, vec![2.0, 4.0], MpsNormalization::ChannelPower);
        builder.insert(0, row(250.0, 1.0, 1.0, &[0.1, 0.3])).unwrap();
        builder.insert(1, row(1000.0, 1.0, 1.0, &[0.2, 0.1])).unwrap();
        let mps = builder.build().unwrap();

        let profile = mps.modulation_profile();
        assert!((profile[0] - 0.3).abs() < 1e-12);
        assert!((profile[1] - 0.4).abs() < 1e-12);
        assert_eq!(mps.peak(), (250.0, 4.0, 0.3));
        assert!((mps.row_sums()[0] - 0.4).abs() < 1e-12);

        let csv = mps.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "auditory_hz,2.000,4.000");
        assert!(lines[1].starts_with("250.0,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn envelope_variance_clamped() {
        let r = row(100.0, 1.0, 1.0 - 1e-17, &[]);
        assert_eq!(r.envelope_variance(), 0.0);
        assert!(!r.is_silent());
    }
}
