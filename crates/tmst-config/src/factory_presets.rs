//! Factory presets bundled with the tmst library.
//!
//! These are always available without external files and serve as starting
//! points for common material: running speech, music and hearing-aid output.

use crate::AnalysisPreset;

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &["speech", "music", "hearing_aid"];

/// TOML content for factory presets.
///
/// These are embedded at compile time and always available.
static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("speech", SPEECH_PRESET),
    ("music", MUSIC_PRESET),
    ("hearing_aid", HEARING_AID_PRESET),
];

/// Running speech: 70-6700 Hz at 1 ERB, modulation 0.5-200 Hz.
const SPEECH_PRESET: &str = r#"
name = "Speech"
description = "Running speech: syllabic and voice-pitch modulation"

[auditory]
low_hz = 70.0
high_hz = 6700.0
spacing = { erb_step = 1.0 }
alignment = "delay_compensated"

[modulation]
low_hz = 0.5
high_hz = 200.0
bands = 32
q = 1.0

[periodicity]
f0_min_hz = 60.0
f0_max_hz = 550.0
threshold = 0.2
hop_seconds = 0.01
boundary = "pad"
f0_track_hop = 20
aperiodicity_threshold = 0.8

[output]
normalization = "channel_power"
am_spectrum = true
f0m_spectrum = true
"#;

/// Music: wider f0 range and slower rhythmic modulation.
const MUSIC_PRESET: &str = r#"
name = "Music"
description = "Music: rhythm-rate modulation and a wide pitch range"

[auditory]
low_hz = 50.0
high_hz = 8000.0
spacing = { channels = 48 }
alignment = "delay_compensated"

[modulation]
low_hz = 0.25
high_hz = 64.0
bands = 24
q = 1.0

[periodicity]
f0_min_hz = 40.0
f0_max_hz = 1000.0
threshold = 0.15
hop_seconds = 0.01
boundary = "pad"
max_jump_semitones = 12.0

[output]
normalization = "signal_power"
am_spectrum = true
f0m_spectrum = true
"#;

/// Hearing-aid output: narrower modulation bands and depth normalization.
const HEARING_AID_PRESET: &str = r#"
name = "Hearing Aid"
description = "Device output: modulation depth per channel with sharper bands"

[auditory]
low_hz = 125.0
high_hz = 8000.0
spacing = { erb_step = 1.0 }
alignment = "zero_phase"

[modulation]
low_hz = 1.0
high_hz = 128.0
bands = 8
q = 2.0

[periodicity]
f0_min_hz = 60.0
f0_max_hz = 550.0
threshold = 0.2
hop_seconds = 0.01
boundary = "omit"

[output]
normalization = "modulation_depth"
am_spectrum = true
f0m_spectrum = false
"#;

/// Get all factory presets.
///
/// # Example
///
/// ```rust
/// use tmst_config::factory_presets;
///
/// for preset in factory_presets() {
///     println!("{}: {:?}", preset.name, preset.description);
/// }
/// ```
pub fn factory_presets() -> Vec<AnalysisPreset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(name, toml)| match AnalysisPreset::from_toml(toml) {
            Ok(preset) => Some(preset),
            Err(e) => {
                tracing::warn!(name, error = %e, "factory preset failed to parse");
                None
            }
        })
        .collect()
}

/// Get a factory preset by identifier or display name (case-insensitive).
///
/// # Example
///
/// ```rust
/// use tmst_config::get_factory_preset;
///
/// if let Some(preset) = get_factory_preset("speech") {
///     println!("Found preset: {}", preset.name);
/// }
/// ```
pub fn get_factory_preset(name: &str) -> Option<AnalysisPreset> {
    let name_lower = name.to_lowercase();

    if let Some((_, toml)) = FACTORY_PRESETS_TOML
        .iter()
        .find(|(preset_name, _)| preset_name.to_lowercase() == name_lower)
    {
        return AnalysisPreset::from_toml(toml).ok();
    }

    // Also try matching against the preset's display name
    factory_presets()
        .into_iter()
        .find(|preset| preset.name.to_lowercase() == name_lower)
}

/// Get the identifiers of all factory presets.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a preset name is a factory preset.
///
/// # Example
///
/// ```rust
/// use tmst_config::is_factory_preset;
///
/// assert!(is_factory_preset("speech"));
/// assert!(is_factory_preset("Hearing Aid"));
/// assert!(!is_factory_preset("my_custom_preset"));
/// ```
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}
