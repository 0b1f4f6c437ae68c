//! # Iteration Container Benchmark
//!
//! The steady-state read must cost nothing beyond the slice, and a read
//! after a small perturbation must cost far less than a full sort.
//!
//! Run with: `cargo bench --package cohort_core --bench container_benchmark`

// Benchmarks don't need docs
#![allow(missing_docs)]

use cohort_core::{
    Aspect, Component, ComponentOrder, EntityComparator, EntityId, SubscriptionConfig, ViewId,
    World,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Depth(u32);
impl Component for Depth {}

/// World with `count` entities in one ordered view, already reconciled.
fn ordered_world(count: usize) -> (World, ViewId, Vec<EntityId>) {
    let config = SubscriptionConfig {
        entity_capacity: count + 1,
        view_capacity: count,
        ..SubscriptionConfig::default()
    };
    let mut world = World::new(config);
    let depth = world.register_component::<Depth>();
    let sub = world.subscribe(Aspect::from_types(&[depth], &[], &[]).unwrap());
    let order: Arc<dyn EntityComparator> = Arc::new(ComponentOrder::<Depth>::new(depth));
    let view = world.ordered_view(sub, Some(order)).unwrap();

    let ids: Vec<EntityId> = (0..count)
        .map(|i| {
            let id = world.spawn();
            world.insert(id, Depth((i as u32) * 4)).unwrap();
            id
        })
        .collect();
    world.step();
    world.entities(view).unwrap();
    (world, view, ids)
}

/// Benchmark: clean read, the every-frame path.
fn bench_clean_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_read");

    for count in [1_000, 100_000] {
        let (mut world, view, _) = ordered_world(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(world.entities(view).unwrap().len()));
        });
    }

    group.finish();
}

/// Benchmark: a handful of values change, then one read re-sorts.
fn bench_perturbed_resort(c: &mut Criterion) {
    let mut group = c.benchmark_group("perturbed_resort");

    for count in [1_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let (mut world, view, ids) = ordered_world(count);
                    for (n, id) in ids.iter().step_by(count / 8).enumerate() {
                        if let Some(depth) = world.get_mut::<Depth>(*id) {
                            depth.0 = (n as u32) * 7 + 1;
                        }
                    }
                    world.step();
                    (world, view)
                },
                |(mut world, view)| black_box(world.entities(view).unwrap().len()),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: a tenth of the members leave, then one read compacts.
fn bench_removal_compaction(c: &mut Criterion) {
    let count = 100_000;
    c.bench_function("removal_compaction_100K", |b| {
        b.iter_batched(
            || {
                let (mut world, view, ids) = ordered_world(count);
                for id in ids.iter().step_by(10) {
                    world.despawn(*id);
                }
                world.step();
                (world, view)
            },
            |(mut world, view)| black_box(world.entities(view).unwrap().len()),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_clean_read,
    bench_perturbed_resort,
    bench_removal_compaction,
);

criterion_main!(benches);
