//! Criterion benchmarks for the ECS substrate.
//!
//! Measures the hot paths the simulation leans on every tick: spatial churn
//! (spawn/move/despawn), cell reads, and store-intersection queries.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keystorm_ecs::prelude::*;

#[derive(Clone)]
struct Glyph(char);

#[derive(Clone)]
struct Marked;

fn bench_spatial_churn(c: &mut Criterion) {
    c.bench_function("spatial_spawn_move_despawn_1k", |b| {
        b.iter(|| {
            let world = World::new(80, 24);
            let mut entities = Vec::with_capacity(1000);
            for i in 0..1000i32 {
                let e = world.create_entity();
                world.spatial().spawn(e, i % 80, i % 24);
                entities.push(e);
            }
            for (i, &e) in entities.iter().enumerate() {
                world.spatial().move_to(e, (i as i32 * 7) % 80, (i as i32 * 3) % 24);
            }
            for &e in &entities {
                world.spatial().despawn(e);
            }
            black_box(world.spatial().len())
        })
    });
}

fn bench_cell_reads(c: &mut Criterion) {
    let world = World::new(80, 24);
    for i in 0..1000i32 {
        let e = world.create_entity();
        world.spatial().spawn(e, i % 80, i % 24);
    }
    c.bench_function("spatial_get_all_at_full_grid", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for y in 0..24 {
                for x in 0..80 {
                    total += world.spatial().get_all_at(x, y).len();
                }
            }
            black_box(total)
        })
    });
}

fn bench_query_intersection(c: &mut Criterion) {
    let world = World::new(80, 24);
    world.register_component::<Glyph>("glyph");
    world.register_component::<Marked>("marked");
    for i in 0..2000u64 {
        let e = world.create_entity();
        world.store::<Glyph>().insert(e, Glyph('k'));
        if i % 3 == 0 {
            world.store::<Marked>().insert(e, Marked);
        }
    }
    c.bench_function("query_two_store_intersection", |b| {
        b.iter(|| {
            black_box(
                world
                    .query()
                    .with::<Glyph>()
                    .with::<Marked>()
                    .execute()
                    .len(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_spatial_churn,
    bench_cell_reads,
    bench_query_intersection
);
criterion_main!(benches);
