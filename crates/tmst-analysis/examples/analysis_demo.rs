//! Analysis demo: modulation power spectrum and periodicity of a synthetic vowel.
//!
//! Run with: cargo run -p tmst-analysis --example analysis_demo

use std::f64::consts::PI;

use tmst_analysis::features::names;
use tmst_analysis::{
    Analyzer, Filterbank, PeriodicityConfig, Signal, build_auditory_filterbank,
    build_modulation_filterbank,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sample_rate = 16000.0;

    // --- A 120 Hz harmonic complex with 4 Hz syllabic modulation and vibrato ---
    println!("=== Synthetic vowel: f0 120 Hz, 5 Hz vibrato, 4 Hz AM ===\n");

    let n = 2 * sample_rate as usize;
    let mut phase = 0.0;
    let samples: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let f0 = 120.0 * (1.0 + 0.02 * (2.0 * PI * 5.0 * t).sin());
            phase += 2.0 * PI * f0 / sample_rate;
            let envelope = 1.0 + 0.8 * (2.0 * PI * 4.0 * t).sin();
            let voice: f64 = (1..=10).map(|h| (f64::from(h) * phase).sin() / f64::from(h)).sum();
            0.2 * envelope * voice
        })
        .collect();
    let signal = Signal::new(samples, sample_rate)?;

    let auditory = build_auditory_filterbank(sample_rate, 70.0, 6700.0, 24)?;
    let modulation = build_modulation_filterbank(sample_rate, 0.5, 64.0, 8)?;
    println!(
        "Auditory channels: {}, modulation bands: {}, overlap bound: {:.3}",
        auditory.num_filters(),
        modulation.num_filters(),
        modulation.overlap_bound()
    );
    println!(
        "Transient margin: {} samples\n",
        auditory.transient_margin()
    );

    let analyzer = Analyzer::new(auditory, modulation, PeriodicityConfig::default())?;
    let features = analyzer.analyze_with(&signal)?;

    // --- Modulation power spectrum ---
    println!("=== Modulation Power Spectrum (channel power) ===\n");
    let mps = features.mps();
    print!("{:>10}", "cf \\ mf");
    for mf in mps.modulation_frequencies() {
        print!("{mf:>8.1}");
    }
    println!();
    for (cf, row) in mps.auditory_frequencies().iter().zip(mps.values()).step_by(3) {
        print!("{cf:>10.0}");
        for value in row {
            print!("{value:>8.4}");
        }
        println!();
    }
    let (peak_cf, peak_mf, peak_value) = mps.peak();
    println!("\nPeak: {peak_value:.4} at {peak_cf:.0} Hz / {peak_mf:.1} Hz modulation\n");

    // --- Features ---
    println!("=== Features ===\n");
    for (name, value) in features.features() {
        match (value.as_scalar(), value.as_array()) {
            (Some(v), _) => println!("{name:<24} {v:.4}"),
            (_, Some(values)) => println!("{name:<24} [{} values]", values.len()),
            _ => {}
        }
    }

    if let Some(f0) = features.scalar(names::MEDIAN_F0_HZ) {
        println!("\nMedian f0: {f0:.1} Hz");
    }
    if let (Some(spectrum), Some(axis)) = (
        features.array(names::F0M_SPECTRUM),
        features.f0m_spectrum().map(|s| &s.frequencies),
    ) {
        let (index, _) = spectrum
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        println!("f0 modulation peak near {:.1} Hz", axis[index]);
    }

    Ok(())
}
