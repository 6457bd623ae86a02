use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hexworld::{World, WorldConfig, WorldProfile};

fn random_coords(n: usize, width: i32, height: i32) -> Vec<(i32, i32)> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    (0..n)
        .map(|_| {
            // Sample past the seam so wrapping is part of the workload.
            let q = rng.random_range(-width..2 * width);
            let r = rng.random_range(-height / 2..height / 2);
            (q, r)
        })
        .collect()
}

fn bench_tile_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tile Queries");

    for &(width, height) in &[(64, 32), (128, 64)] {
        let world = World::with_config(
            WorldConfig::with_size(WorldProfile::Dev, width, height),
            1337,
        );
        let coords = random_coords(4096, width as i32, height as i32);
        // Warm pass so the steady state is measured, not first-fill.
        for &(q, r) in &coords {
            world.tile(q, r);
        }

        group.bench_function(format!("tile_{}x{}", width, height), |b| {
            b.iter(|| {
                for &(q, r) in &coords {
                    black_box(world.tile(q, r));
                }
            });
        });

        group.bench_function(format!("climate_{}x{}", width, height), |b| {
            b.iter(|| {
                for &(q, r) in &coords {
                    black_box(world.climate_at(q, r));
                }
            });
        });
    }

    group.finish();
}

fn bench_world_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("World Generation");
    group.sample_size(10);

    group.bench_function("full_build_48x24", |b| {
        b.iter_batched(
            || WorldConfig::with_size(WorldProfile::Dev, 48, 24),
            |config| {
                let world = World::with_config(config, 1337);
                // Touching one river forces the whole drainage network.
                black_box(world.river_strength(0, 0));
                black_box(world.tile(0, 0));
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_tile_queries, bench_world_generation);
criterion_main!(benches);
