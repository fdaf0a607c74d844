//! Analysis preset file format and operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

use tmst_analysis::{
    AnalysisOptions, Analyzer, AuditoryFilterbank, ModulationFilterbank, PeriodicityConfig,
    PhaseAlignment,
};

use crate::error::ConfigError;
use crate::validation::validate_preset;

/// How auditory channels are placed between `low_hz` and `high_hz`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSpacing {
    /// One channel every `n` ERBs starting at `low_hz`
    ErbStep(f64),
    /// A fixed number of channels, equally spaced on the ERB-rate scale
    Channels(usize),
}

impl Default for ChannelSpacing {
    fn default() -> Self {
        ChannelSpacing::ErbStep(1.0)
    }
}

/// `[auditory]` section: the gammatone filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditorySection {
    /// Lowest center frequency in Hz
    pub low_hz: f64,
    /// Highest center frequency in Hz
    pub high_hz: f64,
    /// Channel placement
    pub spacing: ChannelSpacing,
    /// Cross-channel phase alignment
    pub alignment: PhaseAlignment,
}

impl Default for AuditorySection {
    fn default() -> Self {
        Self {
            low_hz: 70.0,
            high_hz: 6700.0,
            spacing: ChannelSpacing::default(),
            alignment: PhaseAlignment::default(),
        }
    }
}

impl AuditorySection {
    /// Build the filterbank for `sample_rate`.
    pub fn build(&self, sample_rate: f64) -> Result<AuditoryFilterbank, ConfigError> {
        let bank = match self.spacing {
            ChannelSpacing::ErbStep(step) => {
                AuditoryFilterbank::erb_spaced(sample_rate, self.low_hz, self.high_hz, step)?
            }
            ChannelSpacing::Channels(n) => {
                AuditoryFilterbank::new(sample_rate, self.low_hz, self.high_hz, n)?
            }
        };
        Ok(bank.with_alignment(self.alignment))
    }
}

/// `[modulation]` section: the modulation filterbank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationSection {
    /// Lowest modulation center frequency in Hz
    pub low_hz: f64,
    /// Highest modulation center frequency in Hz
    pub high_hz: f64,
    /// Number of log-spaced bands
    pub bands: usize,
    /// Quality factor, center over bandwidth
    pub q: f64,
}

impl Default for ModulationSection {
    fn default() -> Self {
        Self {
            low_hz: 0.5,
            high_hz: 200.0,
            bands: 32,
            q: tmst_analysis::modulation::DEFAULT_MODULATION_Q,
        }
    }
}

impl ModulationSection {
    /// Build the filterbank for `sample_rate`.
    pub fn build(&self, sample_rate: f64) -> Result<ModulationFilterbank, ConfigError> {
        Ok(ModulationFilterbank::with_q(
            sample_rate,
            self.low_hz,
            self.high_hz,
            self.bands,
            self.q,
        )?)
    }
}

/// Analysis preset.
///
/// Presets are stored as TOML files with one table per pipeline stage.
/// Missing tables and keys take their defaults.
///
/// # TOML Format
///
/// ```toml
/// name = "speech"
/// description = "Running speech"
///
/// [auditory]
/// low_hz = 70.0
/// high_hz = 6700.0
/// spacing = { erb_step = 1.0 }   # or { channels = 32 }
/// alignment = "delay_compensated"
///
/// [modulation]
/// low_hz = 0.5
/// high_hz = 200.0
/// bands = 32
/// q = 1.0
///
/// [periodicity]
/// f0_min_hz = 60.0
/// f0_max_hz = 550.0
/// threshold = 0.2
/// hop_seconds = 0.01
/// boundary = "pad"
///
/// [output]
/// normalization = "channel_power"
/// am_spectrum = true
/// f0m_spectrum = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisPreset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Auditory filterbank settings.
    #[serde(default)]
    pub auditory: AuditorySection,

    /// Modulation filterbank settings.
    #[serde(default)]
    pub modulation: ModulationSection,

    /// Periodicity estimator settings.
    #[serde(default)]
    pub periodicity: PeriodicityConfig,

    /// Normalization, spectra and retention options.
    #[serde(default)]
    pub output: AnalysisOptions,
}

impl AnalysisPreset {
    /// Create a preset with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            auditory: AuditorySection::default(),
            modulation: ModulationSection::default(),
            periodicity: PeriodicityConfig::default(),
            output: AnalysisOptions::default(),
        }
    }

    /// Create a preset with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the auditory section.
    pub fn with_auditory(mut self, auditory: AuditorySection) -> Self {
        self.auditory = auditory;
        self
    }

    /// Replace the modulation section.
    pub fn with_modulation(mut self, modulation: ModulationSection) -> Self {
        self.modulation = modulation;
        self
    }

    /// Replace the periodicity settings.
    pub fn with_periodicity(mut self, periodicity: PeriodicityConfig) -> Self {
        self.periodicity = periodicity;
        self
    }

    /// Replace the output options.
    pub fn with_output(mut self, output: AnalysisOptions) -> Self {
        self.output = output;
        self
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::read_file(path, e))?;
        let preset = Self::from_toml(&content)?;
        tracing::debug!(name = %preset.name, path = %path.display(), "preset loaded");
        Ok(preset)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check all settings that do not depend on the sample rate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(validate_preset(self)?)
    }

    /// Build both filterbanks for `sample_rate`.
    ///
    /// Fails with [`ConfigError::Validation`] for invalid settings and
    /// [`ConfigError::Analysis`] when a band reaches Nyquist at this rate.
    pub fn build_filterbanks(
        &self,
        sample_rate: f64,
    ) -> Result<(AuditoryFilterbank, ModulationFilterbank), ConfigError> {
        self.validate()?;
        Ok((
            self.auditory.build(sample_rate)?,
            self.modulation.build(sample_rate)?,
        ))
    }

    /// Build a ready-to-use [`Analyzer`] for `sample_rate`.
    ///
    /// Besides the filterbank limits, fails with [`ConfigError::Analysis`]
    /// when the f0 modulation outputs are on and the modulation range
    /// reaches half the f0 track rate at this sample rate.
    pub fn analyzer(&self, sample_rate: f64) -> Result<Analyzer, ConfigError> {
        let (auditory, modulation) = self.build_filterbanks(sample_rate)?;
        let analyzer = Analyzer::new(auditory, modulation, self.periodicity.clone())?
            .with_options(self.output);
        analyzer.check()?;
        tracing::debug!(name = %self.name, sample_rate, "analyzer built from preset");
        Ok(analyzer)
    }
}

impl Default for AnalysisPreset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}
