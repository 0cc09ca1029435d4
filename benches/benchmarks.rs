//! Benchmarks for Reverie operations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reverie::{
    DriftGenerator, ExperimentConfig, HebbianEngine, PatternAssembler, PatternLayout,
    PoolOptions, Similarity, TrialController, TrialMode, VectorPool,
};
use std::sync::Arc;

fn benchmark_pool_generation(c: &mut Criterion) {
    c.bench_function("pool_generate_8", |b| {
        b.iter(|| {
            let mut pool = VectorPool::with_seed(256, black_box(7));
            pool.add_permuted("items", 8, PoolOptions::default()).unwrap();
            pool.len()
        })
    });
}

fn benchmark_drift_chain(c: &mut Criterion) {
    c.bench_function("drift_chain_50", |b| {
        b.iter(|| {
            let mut gen = DriftGenerator::new(black_box(11), 0.25);
            let seed = gen.seed_vector(256, 51);
            gen.chain(&seed, 50).len()
        })
    });
}

fn benchmark_similarity(c: &mut Criterion) {
    let mut gen = DriftGenerator::new(3, 0.25);
    let a = gen.seed_vector(4096, 409);
    let b_vec = gen.step(&a);

    c.bench_function("overlap_similarity", |bench| {
        bench.iter(|| Similarity::overlap(black_box(&a), black_box(&b_vec)))
    });
}

fn benchmark_training_trial(c: &mut Criterion) {
    let config = ExperimentConfig::default();
    let layout = Arc::new(PatternLayout::standard(
        config.slot_width,
        config.context_channels,
    ));
    let assembler = PatternAssembler::new(Arc::clone(&layout));

    let mut pool = VectorPool::with_seed(config.slot_width, config.seed);
    let items = pool
        .add_permuted("ab", 2, config.pool_options())
        .unwrap()
        .to_vec();
    let mut gen = DriftGenerator::new(config.seed, config.drift_rate);
    let ctx_seed = gen.seed_vector(config.slot_width, config.active_count());
    let chain = gen.chain(&ctx_seed, 5);

    let pattern = assembler
        .pair_pattern("ab_0", &items[0], &items[1], &[chain.get(0)])
        .unwrap();

    let controller = TrialController::from_config(&config);
    let mut engine = HebbianEngine::new(&layout, config.seed);

    c.bench_function("training_trial", |b| {
        b.iter(|| {
            controller
                .run_trial(&mut engine, black_box(&pattern), TrialMode::Train)
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_pool_generation,
    benchmark_drift_chain,
    benchmark_similarity,
    benchmark_training_trial
);
criterion_main!(benches);
