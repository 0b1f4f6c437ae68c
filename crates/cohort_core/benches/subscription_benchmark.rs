//! # Subscription Fan-Out Benchmark
//!
//! A presence change must only cost the subscriptions that care about its
//! type, no matter how many subscriptions exist.
//!
//! Run with: `cargo bench --package cohort_core --bench subscription_benchmark`

// Benchmarks don't need docs and the marker types are never constructed
#![allow(missing_docs)]
#![allow(dead_code)]

use cohort_core::{Aspect, Component, ComponentTypeId, EntityId, SubscriptionConfig, World};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Entities touched per step.
const ENTITY_COUNT: usize = 10_000;

macro_rules! markers {
    ($($name:ident)*) => {
        $(
            struct $name;
            impl Component for $name {}
        )*

        fn register_markers(world: &mut World) -> Vec<ComponentTypeId> {
            vec![$(world.register_component::<$name>()),*]
        }
    };
}

markers!(M0 M1 M2 M3 M4 M5 M6 M7 M8 M9 M10 M11 M12 M13 M14 M15);

struct Hot(u32);
impl Component for Hot {}

/// World with `subscriptions` aspects over marker types, none of which
/// involve `Hot`, plus one that does.
fn fan_out_world(subscriptions: usize) -> (World, Vec<EntityId>) {
    let config = SubscriptionConfig {
        entity_capacity: ENTITY_COUNT + 1,
        ..SubscriptionConfig::default()
    };
    let mut world = World::new(config);
    let markers = register_markers(&mut world);
    let hot = world.register_component::<Hot>();

    for i in 0..subscriptions {
        let a = markers[i % markers.len()];
        let b = markers[(i / markers.len() + i + 1) % markers.len()];
        let aspect = if a == b {
            Aspect::from_types(&[a], &[], &[]).unwrap()
        } else {
            Aspect::from_types(&[a], &[b], &[]).unwrap()
        };
        world.subscribe(aspect);
    }
    world.subscribe(Aspect::from_types(&[hot], &[], &[]).unwrap());

    let ids = (0..ENTITY_COUNT).map(|_| world.spawn()).collect();
    world.step();
    (world, ids)
}

/// Benchmark: toggle `Hot` on every entity; cost should stay flat as
/// unrelated subscriptions grow.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_10K_changes");

    for subscriptions in [8, 64, 256] {
        let (mut world, ids) = fan_out_world(subscriptions);
        let mut on = false;
        group.bench_with_input(
            BenchmarkId::from_parameter(subscriptions),
            &subscriptions,
            |b, _| {
                b.iter(|| {
                    on = !on;
                    for (i, id) in ids.iter().enumerate() {
                        if on {
                            world.insert(*id, Hot(i as u32)).unwrap();
                        } else {
                            world.remove::<Hot>(*id).unwrap();
                        }
                    }
                    black_box(world.step())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: looking up an already interned aspect.
fn bench_register_interned(c: &mut Criterion) {
    let (mut world, _) = fan_out_world(64);
    let markers: Vec<ComponentTypeId> = (0..4).map(ComponentTypeId::new).collect();
    world.subscribe(Aspect::from_types(&markers, &[], &[]).unwrap());

    c.bench_function("register_interned", |b| {
        b.iter(|| black_box(world.subscribe(Aspect::from_types(&markers, &[], &[]).unwrap())));
    });
}

/// Benchmark: spawn, attach and despawn inside one step.
fn bench_churn(c: &mut Criterion) {
    let (mut world, _) = fan_out_world(64);
    c.bench_function("spawn_despawn_churn_1K", |b| {
        b.iter(|| {
            let spawned: Vec<EntityId> = (0..1_000).map(|_| world.spawn()).collect();
            for id in &spawned {
                world.insert(*id, Hot(0)).unwrap();
            }
            for id in &spawned {
                world.despawn(*id);
            }
            black_box(world.step())
        });
    });
}

criterion_group!(benches, bench_fan_out, bench_register_interned, bench_churn);

criterion_main!(benches);
