use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arrvee_levels::{Averaging, Band, Coordinator, SpectralAnalyzer};

fn test_signal(len: usize, sample_rate: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate;
            0.5 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                + 0.25 * (2.0 * std::f32::consts::PI * 5_000.0 * t).sin()
        })
        .collect()
}

fn bench_feed(c: &mut Criterion) {
    let signal = test_signal(48_000, 48_000.0);
    let mut coordinator = Coordinator::with_sample_rate(48_000.0).unwrap();

    c.bench_function("feed 1s @ 48k", |b| {
        b.iter(|| coordinator.feed_block(black_box(&signal)))
    });
}

fn bench_readers(c: &mut Criterion) {
    let mut coordinator = Coordinator::with_sample_rate(48_000.0).unwrap();
    coordinator.feed_block(&test_signal(4_096, 48_000.0));
    let monitor = coordinator.monitor();

    c.bench_function("rms 40ms", |b| {
        b.iter(|| monitor.rms(black_box(Band::Low), 0.04))
    });

    let mut linear = vec![0.0; 16];
    c.bench_function("band averages linear/16", |b| {
        b.iter(|| monitor.band_averages(Averaging::Linear, &mut linear, 16).unwrap())
    });

    let mut log = vec![0.0; Averaging::Logarithmic.output_len(17).unwrap()];
    c.bench_function("band averages log/17", |b| {
        b.iter(|| monitor.band_averages(Averaging::Logarithmic, &mut log, 17).unwrap())
    });
}

fn bench_fft_sizes(c: &mut Criterion) {
    for size in [128usize, 1024, 4096] {
        let analyzer = SpectralAnalyzer::new(size).unwrap();
        let block = test_signal(size, 48_000.0);
        c.bench_function(&format!("analyze {}", size), |b| {
            b.iter(|| analyzer.analyze(black_box(&block)).unwrap())
        });
    }
}

criterion_group!(benches, bench_feed, bench_readers, bench_fft_sizes);
criterion_main!(benches);
