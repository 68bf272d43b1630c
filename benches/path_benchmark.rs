//! Benchmarks for the pathfinding hot path.
//!
//! Pathfinding is the one part of the engine with a latency budget; these
//! cover the full-tree and destination-directed variants.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use thane::game::{Location, SideId, Sides, TerrainMap, UnitFacts, UnitIndex, UnitRec};
use thane::path::{PathContext, PathQuery};

fn grid(n: i32) -> TerrainMap {
    let mut map = TerrainMap::new();
    for x in 0..n {
        for y in 0..n {
            map.set(Location::new(x, y), "grass");
        }
    }
    map
}

fn hostile(_: SideId, _: SideId) -> bool {
    false
}

fn bench_reachable_40x40(c: &mut Criterion) {
    let terrain = grid(40);
    let units = UnitIndex::new();
    let sides = Sides::new();
    let ctx = PathContext::default();
    let query = PathQuery {
        start: Location::new(20, 20),
        cost: None,
        first_turn_cost: None,
        moves: 8,
        turns: 3,
        max_moves: 8,
        moving_side: None,
        viewing_side: None,
        ignore_zoc: false,
        terrain: &terrain,
        units: &units,
        sides: &sides,
        allies: &hostile,
        refresh: None,
    };

    c.bench_function("reachable_40x40", |b| {
        b.iter(|| black_box(ctx.reachable_hexes(black_box(&query))));
    });
}

fn bench_directed_search_with_zoc(c: &mut Criterion) {
    let terrain = grid(40);
    let mut units = UnitIndex::new();
    // a picket line of enemies across the middle of the map
    for x in (0..40).step_by(3) {
        units.insert(UnitRec::new(
            x as u32 + 1,
            UnitFacts {
                side: 2,
                hidden: false,
                emits_zoc: true,
                location: Location::new(x, 20),
            },
        ));
    }
    let sides = Sides::new();
    let ctx = PathContext::default();
    let query = PathQuery {
        start: Location::new(20, 2),
        cost: None,
        first_turn_cost: None,
        moves: 6,
        turns: 8,
        max_moves: 6,
        moving_side: Some(1),
        viewing_side: None,
        ignore_zoc: false,
        terrain: &terrain,
        units: &units,
        sides: &sides,
        allies: &hostile,
        refresh: None,
    };

    c.bench_function("directed_search_with_zoc", |b| {
        b.iter(|| black_box(ctx.shortest_path(black_box(Location::new(20, 38)), &query)));
    });
}

fn bench_heuristic_cache(c: &mut Criterion) {
    let ctx = PathContext::default();
    c.bench_function("heuristic_distance_cached", |b| {
        // first call populates, the rest hit the memo
        b.iter(|| black_box(ctx.heuristic_distance(Location::new(0, 0), Location::new(12, 12))));
    });
}

criterion_group!(
    benches,
    bench_reachable_40x40,
    bench_directed_search_with_zoc,
    bench_heuristic_cache
);
criterion_main!(benches);
