//! Benchmark for the brick collision engine
//!
//! Benchmarks index rebuild time and per-query cost for ghost tests,
//! capsule resolution, and ray picking against a grid world.

use brickworld_collision::{CollisionWorld, GhostCandidate, Ray};
use brickworld_world::{BrickKind, Player, WorldState};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::{Quat, Vec3};
use piece::{PieceDefinition, PieceGeometry, PieceId, PieceLibrary};

const BRICK: PieceId = PieceId(1);

/// Benchmark configuration
struct BenchConfig {
    grid: i32,
    spacing: f32,
    layers: i32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            grid: 20,
            spacing: 40.0,
            layers: 2,
        }
    }
}

fn build_library() -> PieceLibrary {
    let mut lib = PieceLibrary::new();
    lib.insert(
        PieceDefinition::new(
            BRICK,
            "brick-2x2",
            vec![],
            vec![],
            PieceGeometry::cuboid(Vec3::new(-20.0, -12.0, -20.0), Vec3::new(20.0, 12.0, 20.0)),
        )
        .expect("brick geometry"),
    );
    lib
}

/// Dense grid of bricks, `layers` deep.
fn build_world(config: &BenchConfig) -> WorldState {
    let mut world = WorldState::new();
    for layer in 0..config.layers {
        for x in 0..config.grid {
            for z in 0..config.grid {
                world.insert_brick(
                    BRICK,
                    Vec3::new(
                        x as f32 * config.spacing,
                        layer as f32 * 24.0,
                        z as f32 * config.spacing,
                    ),
                    Quat::IDENTITY,
                    0,
                    BrickKind::Normal,
                );
            }
        }
    }
    world
}

fn bench_index_rebuild(c: &mut Criterion) {
    let config = BenchConfig::default();
    let pieces = build_library();
    let world = build_world(&config);
    let mut collision = CollisionWorld::new(&pieces);

    c.bench_function("index_rebuild_800", |b| {
        b.iter(|| {
            collision.rebuild(&pieces, &world);
            black_box(collision.indexed_bricks())
        });
    });
}

fn bench_ghost_test(c: &mut Criterion) {
    let config = BenchConfig::default();
    let pieces = build_library();
    let world = build_world(&config);
    let mut collision = CollisionWorld::new(&pieces);
    collision.rebuild(&pieces, &world);

    let resting = GhostCandidate {
        piece: BRICK,
        position: Vec3::new(10.0 * config.spacing, 48.0 + 12.0, 10.0 * config.spacing),
        rotation: Quat::IDENTITY,
    };
    let overlapping = GhostCandidate {
        piece: BRICK,
        position: Vec3::new(10.0 * config.spacing, 12.0, 10.0 * config.spacing),
        rotation: Quat::IDENTITY,
    };

    c.bench_function("ghost_test_resting", |b| {
        b.iter(|| black_box(collision.test_ghost(&pieces, &world, black_box(&resting))));
    });
    c.bench_function("ghost_test_overlapping", |b| {
        b.iter(|| black_box(collision.test_ghost(&pieces, &world, black_box(&overlapping))));
    });
}

fn bench_capsule_resolve(c: &mut Criterion) {
    let config = BenchConfig::default();
    let pieces = build_library();
    let world = build_world(&config);
    let mut collision = CollisionWorld::new(&pieces);
    collision.rebuild(&pieces, &world);

    c.bench_function("capsule_resolve", |b| {
        b.iter(|| {
            let mut player = Player::at(Vec3::new(400.0, 52.0, 400.0));
            player.velocity = Vec3::new(0.0, -5.0, 0.0);
            collision.resolve_player(&mut player);
            black_box(player.position)
        });
    });
}

fn bench_raycast(c: &mut Criterion) {
    let config = BenchConfig::default();
    let pieces = build_library();
    let world = build_world(&config);
    let mut collision = CollisionWorld::new(&pieces);
    collision.rebuild(&pieces, &world);

    let ray = Ray::new(Vec3::new(400.0, 500.0, 400.0), Vec3::NEG_Y);
    c.bench_function("raycast_grid", |b| {
        b.iter(|| black_box(collision.raycast(&pieces, &world, black_box(&ray))));
    });
}

criterion_group!(
    benches,
    bench_index_rebuild,
    bench_ghost_test,
    bench_capsule_resolve,
    bench_raycast,
);

criterion_main!(benches);
