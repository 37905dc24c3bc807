//! Latency benchmarks for advisory resolution
//!
//! Each rule of the match ladder is benchmarked separately since later rules
//! scan the whole table.
//!
//! Run with: cargo bench -p cropguard-advisory

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cropguard_advisory::AdvisoryResolver;

fn benchmark_resolution(c: &mut Criterion) {
    let resolver = AdvisoryResolver::default();

    let test_cases = vec![
        ("healthy", ("Apple", "healthy")),
        ("exact", ("Tomato", "Late_blight")),
        ("normalized", ("Corn_(maize)", "Common rust")),
        ("partial", ("potato", "early")),
        ("fallback", ("Grape", "Black_rot")),
    ];

    let mut group = c.benchmark_group("Advisory_Resolution");
    group.sample_size(200);

    for (name, input) in &test_cases {
        group.bench_with_input(BenchmarkId::new("resolve", name), input, |b, (crop, disease)| {
            b.iter(|| resolver.resolve(black_box(crop), black_box(disease)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resolution);
criterion_main!(benches);
