//! Benchmarks for the rule validator and isolation forest

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use medsift::pipeline::{validate, AnomalyScorer, IsolationForest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic_rows(n: usize) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(1234);
    (0..n)
        .map(|_| {
            vec![
                rng.gen_range(18.0..90.0),
                rng.gen_range(45.0..120.0),
                rng.gen_range(150.0..200.0),
                rng.gen_range(16.0..40.0),
            ]
        })
        .collect()
}

fn bench_validate(c: &mut Criterion) {
    let rows = synthetic_rows(10_000);

    c.bench_function("validate_10k_records", |b| {
        b.iter(|| {
            for row in &rows {
                black_box(validate(
                    Some(row[3]),
                    Some(row[0]),
                    Some(row[2]),
                    Some(row[1]),
                ));
            }
        })
    });
}

fn bench_forest_fit(c: &mut Criterion) {
    let rows = synthetic_rows(1_000);
    let forest = IsolationForest::new(0.1, 42);

    c.bench_function("isolation_forest_fit_1k", |b| {
        b.iter(|| black_box(forest.fit_score(&rows).unwrap()))
    });
}

criterion_group!(benches, bench_validate, bench_forest_fit);
criterion_main!(benches);
