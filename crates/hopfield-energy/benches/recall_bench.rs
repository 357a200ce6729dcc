//! Criterion microbenchmarks for hopfield-energy recall.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hopfield_energy::{
    discrete_recall, discrete_recall_batch,
    noise::{flip_fraction, gaussian_matrix, random_patterns},
    ContinuousRecallConfig, EnergyModel, EnergyTransformer, EnergyTransformerConfig,
    ExponentialEnergy, PatternMatrix, QuadraticEnergy,
};
use rand::SeedableRng;

fn rng(seed: u64) -> rand::rngs::StdRng {
    rand::rngs::StdRng::seed_from_u64(seed)
}

fn stored(k: usize, d: usize) -> PatternMatrix {
    PatternMatrix::new(random_patterns(k, d, &mut rng(1))).unwrap()
}

fn bench_energy_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("energy_eval");
    for k in [16, 256, 1024] {
        let p = stored(k, 64);
        let q = p.pattern(0).unwrap().to_owned();
        let quad = QuadraticEnergy::new(p.clone());
        let exp = ExponentialEnergy::new(p, 50.0).unwrap();
        group.bench_with_input(BenchmarkId::new("quadratic", k), &k, |b, _| {
            b.iter(|| black_box(quad.energy(black_box(q.view()))));
        });
        group.bench_with_input(BenchmarkId::new("exponential", k), &k, |b, _| {
            b.iter(|| black_box(exp.energy(black_box(q.view()))));
        });
    }
    group.finish();
}

fn bench_discrete_recall(c: &mut Criterion) {
    let mut group = c.benchmark_group("discrete_recall_1k");
    for d in [32, 64, 128] {
        let p = stored(8, d);
        let model = ExponentialEnergy::new(p.clone(), 1.0).unwrap();
        let q = flip_fraction(p.pattern(0).unwrap(), 0.2, &mut rng(2)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(d), &d, |b, _| {
            b.iter(|| {
                let q = black_box(q.view());
                discrete_recall(black_box(&model), q, 1_000, 7)
            });
        });
    }
    group.finish();
}

fn bench_discrete_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("discrete_batch");
    let p = stored(8, 64);
    let model = QuadraticEnergy::new(p);
    for batch in [4, 32] {
        let queries = random_patterns(batch, 64, &mut rng(3));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, _| {
            b.iter(|| {
                let queries = black_box(queries.view());
                discrete_recall_batch(black_box(&model), queries, 500, 11)
            });
        });
    }
    group.finish();
}

fn bench_transformer_recall(c: &mut Criterion) {
    let mut group = c.benchmark_group("transformer_recall");
    for tokens in [16, 64] {
        let config = EnergyTransformerConfig::builder()
            .token_dim(32)
            .num_heads(4)
            .head_dim(8)
            .num_memories(64)
            .build()
            .unwrap();
        let et = EnergyTransformer::random(&config, 0.05, &mut rng(4)).unwrap();
        let x = gaussian_matrix(tokens, 32, 1.0, &mut rng(5)).unwrap();
        let recall = ContinuousRecallConfig::default();
        group.bench_with_input(BenchmarkId::from_parameter(tokens), &tokens, |b, _| {
            b.iter(|| et.recall(black_box(x.view()), &recall));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_energy_evaluation,
    bench_discrete_recall,
    bench_discrete_batch,
    bench_transformer_recall,
);
criterion_main!(benches);
