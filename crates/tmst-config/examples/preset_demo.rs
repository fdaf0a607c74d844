//! Preset demo: factory presets, TOML editing, and building an analyzer.
//!
//! Run with: cargo run -p tmst-config --example preset_demo

use tmst_analysis::{Filterbank, Signal};
use tmst_config::{
    AnalysisPreset, ChannelSpacing, factory_preset_names, get_factory_preset, is_factory_preset,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // --- Factory presets ---
    println!("=== Factory Presets ===\n");

    for name in factory_preset_names() {
        if let Some(preset) = get_factory_preset(name) {
            println!(
                "{:<12} {:>6.0}-{:<6.0} Hz  mod {:>5.2}-{:<5.0} Hz  {}",
                name,
                preset.auditory.low_hz,
                preset.auditory.high_hz,
                preset.modulation.low_hz,
                preset.modulation.high_hz,
                preset.description.as_deref().unwrap_or("")
            );
        }
    }
    println!("\n'Hearing Aid' is a factory preset: {}", is_factory_preset("Hearing Aid"));

    // --- Editing a preset as TOML ---
    println!("\n=== Custom Preset ===\n");

    let mut preset = get_factory_preset("speech").ok_or("speech preset missing")?;
    preset.name = "Telephone speech".to_string();
    preset.auditory.high_hz = 3400.0;
    preset.auditory.spacing = ChannelSpacing::Channels(18);
    preset.modulation.high_hz = 64.0;
    preset.modulation.bands = 8;
    preset.validate()?;

    let toml = preset.to_toml()?;
    println!("{toml}");
    let reparsed = AnalysisPreset::from_toml(&toml)?;
    println!("Roundtrip identical: {}", reparsed == preset);

    // --- Building an analyzer ---
    println!("\n=== Analyzer at 8 kHz ===\n");

    let sample_rate = 8000.0;
    let analyzer = preset.analyzer(sample_rate)?;
    println!(
        "{} auditory channels, {} modulation bands",
        analyzer.auditory().num_filters(),
        analyzer.modulation().num_filters()
    );

    let samples: Vec<f64> = (0..8000)
        .map(|i| {
            let t = f64::from(i) / sample_rate;
            (1.0 + 0.5 * (std::f64::consts::TAU * 3.0 * t).sin())
                * (std::f64::consts::TAU * 180.0 * t).sin()
        })
        .collect();
    let features = analyzer.analyze_with(&Signal::new(samples, sample_rate)?)?;
    let (cf, mf, value) = features.mps().peak();
    println!("MPS peak {value:.4} at {cf:.0} Hz / {mf:.2} Hz modulation");

    // Too low a rate for the upper channel
    match preset.analyzer(4000.0) {
        Ok(_) => println!("unexpectedly built at 4 kHz"),
        Err(e) => println!("At 4 kHz: {e}"),
    }

    Ok(())
}
