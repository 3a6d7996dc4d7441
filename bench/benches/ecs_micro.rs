//! ECS microbenchmarks using Criterion.
//!
//! These benchmarks measure individual operations in isolation:
//! - Entity spawn/remove
//! - Column iteration through queries
//! - Component add/remove (migration)
//! - Schedule runs, parallel and sequential

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rusty_world::{
    core::tasks::{Executor, Inline},
    ecs::{Context, Mask, Query, Result, Schedule, Sequential, World, archetype},
};
use rusty_world_bench::components::{Components, populated};

// =============================================================================
// Spawn Benchmarks
// =============================================================================

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("two_components", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                let components = Components::register(&mut world);
                let mask = components.moving();
                for _ in 0..n {
                    black_box(world.spawn(&mask).unwrap().id());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("five_components", count), &count, |b, &n| {
            b.iter(|| {
                let mut world = World::new();
                let components = Components::register(&mut world);
                let mask = components.full();
                for _ in 0..n {
                    black_box(world.spawn(&mask).unwrap().id());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("random_archetypes", count), &count, |b, &n| {
            b.iter(|| black_box(populated(n, 42)));
        });
    }

    group.finish();
}

// =============================================================================
// Iteration Benchmarks
// =============================================================================

fn bench_iter(c: &mut Criterion) {
    let mut group = c.benchmark_group("iter");

    for count in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("integrate", count), &count, |b, &n| {
            let (world, components, _) = populated(n, 7);
            let query = Query::of([components.position, components.velocity]);

            b.iter(|| {
                for archetype in world.matches(&query).iter() {
                    let velocities = archetype.column(components.velocity).unwrap();
                    let mut positions = archetype.column_mut(components.position).unwrap();
                    for (p, v) in positions
                        .f32x2s_mut()
                        .unwrap()
                        .iter_mut()
                        .zip(velocities.f32x2s().unwrap())
                    {
                        p[0] += v[0];
                        p[1] += v[1];
                    }
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("cached_match", count), &count, |b, &n| {
            let (world, components, _) = populated(n, 7);
            let query = Query::builder()
                .uses([components.health])
                .excludes([components.label])
                .build();

            b.iter(|| black_box(world.matches(&query).entity_count()));
        });
    }

    group.finish();
}

// =============================================================================
// Component Migration Benchmarks
// =============================================================================

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");

    for count in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("add_component", count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let mut world = World::new();
                    let components = Components::register(&mut world);
                    let mask = components.moving();
                    let entities: Vec<_> =
                        (0..n).map(|_| world.spawn(&mask).unwrap().id()).collect();
                    (world, components, entities)
                },
                |(mut world, components, entities)| {
                    let health = Mask::of([components.health]);
                    for entity in entities {
                        world.insert_components(entity, &health).unwrap();
                    }
                    world
                },
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("remove_entity", count), &count, |b, &n| {
            b.iter_batched(
                || populated(n, 11),
                |(mut world, _, entities)| {
                    for entity in entities {
                        world.remove_entity(entity).unwrap();
                    }
                    world
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// Schedule Benchmarks
// =============================================================================

fn movement(components: Components) -> impl Fn(&Context<'_>) -> Result<()> + Send + 'static {
    move |ctx: &Context<'_>| {
        for archetype in ctx.archetypes() {
            let velocities = archetype.column(components.velocity)?;
            let mut positions = archetype.column_mut(components.position)?;
            for (p, v) in positions.f32x2s_mut()?.iter_mut().zip(velocities.f32x2s()?) {
                p[0] += v[0];
                p[1] += v[1];
            }
        }
        Ok(())
    }
}

fn damage(components: Components) -> impl Fn(&Context<'_>) -> Result<()> + Send + 'static {
    move |ctx: &Context<'_>| {
        for archetype in ctx.archetypes() {
            let mut health = archetype.column_mut(components.health)?;
            for hp in health.i32s_mut()? {
                *hp = hp.saturating_sub(1);
            }
        }
        Ok(())
    }
}

fn bench_schedule(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule");
    let executor = Executor::new(4);

    for count in [1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &n| {
            let (world, components, _) = populated(n, 3);
            let mut schedule = Schedule::new();
            schedule
                .configure(movement(components))
                .reads([components.velocity])
                .writes([components.position])
                .apply()
                .unwrap();
            schedule
                .configure(damage(components))
                .writes([components.health])
                .apply()
                .unwrap();

            b.iter(|| schedule.run(&world, &executor).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("inline", count), &count, |b, &n| {
            let (world, components, _) = populated(n, 3);
            let mut schedule = Schedule::new();
            let moved = schedule
                .configure(movement(components))
                .reads([components.velocity])
                .writes([components.position])
                .apply()
                .unwrap();
            schedule
                .configure(damage(components))
                .writes([components.health])
                .after([moved])
                .apply()
                .unwrap();

            b.iter(|| schedule.run(&world, &Inline).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &n| {
            let (mut world, components, _) = populated(n, 3);
            let mut schedule = Sequential::new();
            schedule
                .configure(move |world: &mut World, archetypes: &[archetype::Id]| -> Result<()> {
                    for &id in archetypes {
                        let archetype = world.archetype(id)?;
                        let mut health = archetype.column_mut(components.health)?;
                        for hp in health.i32s_mut()? {
                            *hp = hp.saturating_sub(1);
                        }
                    }
                    Ok(())
                })
                .writes([components.health])
                .apply()
                .unwrap();

            b.iter(|| schedule.run(&mut world).unwrap());
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_spawn,
    bench_iter,
    bench_add_remove,
    bench_schedule,
);

criterion_main!(benches);
