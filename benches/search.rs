//! Benchmarks for layout scoring and the search loop.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use cogstruction::{
    compute::evolution::{EvolutionEngine, FitnessEvaluator, LayoutRng},
    schema::{
        Cog, CogCatalog, FitnessConfig, FitnessKind, IterationConfig, SearchConfig, Slot, SlotSet,
    },
};

fn problem(num_cogs: u32, width: u32, height: u32) -> (Arc<CogCatalog>, Arc<SlotSet>) {
    let cogs = (0..num_cogs)
        .map(|i| {
            Cog::new(
                i + 1,
                (i % 17) as f64 * 11.0,
                (i % 5) as f64 * 3.5,
                (i % 7) as f64 * 0.05,
            )
        })
        .collect();
    let slots = (0..height).flat_map(|y| (0..width).map(move |x| Slot::new(x, y)));
    (
        Arc::new(CogCatalog::new(cogs).expect("catalog")),
        Arc::new(SlotSet::new(slots).expect("slots")),
    )
}

fn bench_fitness(c: &mut Criterion) {
    let mut group = c.benchmark_group("fitness");
    let (catalog, slots) = problem(120, 12, 8);
    let layout = LayoutRng::new(1)
        .random_layout(&catalog, &slots)
        .expect("layout");

    for function in [FitnessKind::AverageAffixConversion, FitnessKind::InversionMatrix] {
        let evaluator = FitnessEvaluator::new(&FitnessConfig {
            function,
            weights: Default::default(),
        })
        .expect("evaluator");

        group.bench_with_input(
            BenchmarkId::from_parameter(function.name()),
            &layout,
            |b, layout| {
                b.iter(|| evaluator.evaluate(black_box(layout)));
            },
        );
    }

    group.finish();
}

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");
    let (catalog, slots) = problem(120, 12, 8);
    let mut rng = LayoutRng::new(2);
    let a = rng.random_layout(&catalog, &slots).expect("layout");
    let b = rng.random_layout(&catalog, &slots).expect("layout");

    group.bench_function("crossover", |bench| {
        bench.iter(|| rng.crossover(black_box(&a), black_box(&b), 1.0));
    });

    let mut layout = a.clone();
    group.bench_function("mutate_one_point", |bench| {
        bench.iter(|| rng.mutate_one_point(black_box(&mut layout)));
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for pop in [50, 200] {
        let (catalog, slots) = problem(80, 10, 6);
        let config = SearchConfig {
            population_size: pop,
            iteration: IterationConfig::default()
                .with_generation_info(10, 10, 5, 0.0)
                .with_mutation_info(pop / 2),
            random_seed: Some(42),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::new("ten_generations", pop), &pop, |b, _| {
            b.iter(|| {
                EvolutionEngine::new(&config, Arc::clone(&catalog), Arc::clone(&slots))
                    .expect("engine")
                    .run()
                    .expect("search")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fitness, bench_operators, bench_search);
criterion_main!(benches);
