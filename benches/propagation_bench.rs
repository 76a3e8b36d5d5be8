//! Global transform propagation benchmarks.
//!
//! Measures a full `update()` on wide and deep dynamic hierarchies, serial
//! versus level-parallel, plus the cost of churn (create + delete) per tick.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use stratum::{ObjectDesc, World, WorldSettings};

fn build_world(parallel: bool, roots: usize, depth: usize) -> World {
    let mut world = World::new(WorldSettings {
        parallel_propagation: parallel,
        ..WorldSettings::default()
    })
    .expect("world");

    for r in 0..roots {
        let mut parent = None;
        for d in 0..depth {
            let mut desc = ObjectDesc::new()
                .with_position(Vec3::new(r as f32, d as f32, 0.0))
                .with_rotation(Quat::from_rotation_z(0.01 * d as f32))
                .dynamic();
            if let Some(p) = parent {
                desc = desc.with_parent(p);
            }
            parent = Some(world.create_object(&desc).expect("create"));
        }
    }
    world
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagation");

    for &(roots, depth) in &[(10_000, 1), (2_000, 5), (100, 100)] {
        for parallel in [false, true] {
            let label = if parallel { "parallel" } else { "serial" };
            let id = BenchmarkId::new(label, format!("{roots}x{depth}"));
            let mut world = build_world(parallel, roots, depth);

            group.bench_function(id, |b| {
                b.iter(|| {
                    world.update();
                    black_box(world.update_counter());
                });
            });
        }
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut world = build_world(true, 1_000, 4);

    c.bench_function("churn/create_delete_100", |b| {
        b.iter(|| {
            let created: Vec<_> = (0..100)
                .map(|i| {
                    world
                        .create_object(&ObjectDesc::new().with_position(Vec3::splat(i as f32)).dynamic())
                        .expect("create")
                })
                .collect();
            for handle in created {
                world.delete_object_delayed(handle, false);
            }
            world.update();
            black_box(world.object_count());
        });
    });
}

criterion_group!(benches, bench_propagation, bench_churn);
criterion_main!(benches);
