//! Criterion benchmarks for the Spindle round runtime.
//!
//! Three benchmark groups:
//! - `base_round`: reel spin and scatter pay only
//! - `respin_round`: forced free spins, 10 iterations per round
//! - `weighted_draw`: prefix-sum lookup on a wide weight table

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use spindle_core::rng::LiveRandom;
use spindle_core::runner::Runner;
use spindle_core::test_utils::*;
use spindle_core::weights::WeightTable;

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_base_round(c: &mut Criterion) {
    let t = build_template(&simple_game());
    let mut runner = Runner::new(&t);
    let mut round = test_round(&t, 0);
    let mut seed = 0u64;

    c.bench_function("base_round", |b| {
        b.iter(|| {
            seed = seed.wrapping_add(1);
            round.reset(Box::new(LiveRandom::new(seed)), stake());
            black_box(runner.play_round(&mut round).unwrap());
        })
    });
}

fn bench_respin_round(c: &mut Criterion) {
    let t = build_template(&respin_game(10));
    let mut runner = Runner::new(&t);
    let mut round = t.new_round(Box::new(FixedRandom::new(3)), stake());

    c.bench_function("respin_round", |b| {
        b.iter(|| {
            // FixedRandom(3) always triggers the free spins.
            round.reset(Box::new(FixedRandom::new(3)), stake());
            black_box(runner.play_round(&mut round).unwrap());
        })
    });
}

fn bench_weighted_draw(c: &mut Criterion) {
    let table = WeightTable::new((0..1024u32).collect(), (1..=1024u64).collect()).unwrap();
    let total = table.total_weight();
    let mut index = 0u64;

    c.bench_function("weighted_draw", |b| {
        b.iter(|| {
            index = (index + 7919) % total;
            black_box(table.draw(index).unwrap());
        })
    });
}

criterion_group!(benches, bench_base_round, bench_respin_round, bench_weighted_draw);
criterion_main!(benches);
