// Benchmarks for the per-request cost path (fingerprint and compression)
// Author: kelexine (https://github.com/kelexine)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use eventforge::cache::{fingerprint, KeyPolicy};
use eventforge::models::GenerationRequest;
use eventforge::policy::CostMode;
use eventforge::prompt::{compose, compress};

fn request() -> GenerationRequest {
    GenerationRequest::titles("Technology", "Conference", "Professional")
        .count(5)
        .context("AI and machine learning for healthcare startups ".repeat(20))
        .tags(["ai", "ml", "health", "startups"])
        .mode(CostMode::Economy)
        .build()
}

fn bench_fingerprint(c: &mut Criterion) {
    let request = request();
    c.bench_function("fingerprint", |b| {
        b.iter(|| fingerprint(black_box(&request), KeyPolicy::default()))
    });
}

fn bench_compress(c: &mut Criterion) {
    let request = request();
    let mut group = c.benchmark_group("compose_and_compress");

    for mode in CostMode::ALL {
        let profile = mode.profile();
        group.bench_function(mode.as_str(), |b| {
            b.iter(|| {
                let sections = compose(black_box(&request), profile);
                compress(&sections, profile.token_ceiling, profile.aggressiveness)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint, bench_compress);
criterion_main!(benches);
