//! Criterion benchmarks for tmst-core filter primitives
//!
//! Run with: cargo bench -p tmst-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tmst_core::{
    Biquad, GAMMATONE_ERB_FACTOR, GammatoneFilter, butterworth_bandpass_coefficients,
    erb_bandwidth,
};

const SAMPLE_RATE: f64 = 16000.0;
const BLOCK_SIZES: &[usize] = &[1024, 4096, 16384];

fn generate_test_signal(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            (2.0 * std::f64::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_biquad(c: &mut Criterion) {
    let mut group = c.benchmark_group("Biquad");
    let coeffs = butterworth_bandpass_coefficients(2.0, 6.0, SAMPLE_RATE);

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, _| {
                let mut biquad = Biquad::from_coefficients(coeffs);
                b.iter(|| {
                    for &sample in &input {
                        black_box(biquad.process(black_box(sample)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_gammatone(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gammatone");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);

        group.bench_with_input(
            BenchmarkId::new("order4", block_size),
            &block_size,
            |b, _| {
                let mut filter =
                    GammatoneFilter::new(1000.0, GAMMATONE_ERB_FACTOR * erb_bandwidth(1000.0), 4, SAMPLE_RATE);
                b.iter(|| {
                    for &sample in &input {
                        black_box(filter.process_complex(black_box(sample)));
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_biquad, bench_gammatone);
criterion_main!(benches);
