#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spindle_core::runner::Runner;
use spindle_core::test_utils::*;

/// Scripted draws for one round of the free spins game.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    iterations: u8,
    draws: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let t = build_template(&respin_game(i64::from(input.iterations % 16)));
    // Out-of-range or exhausted draws abort the round with an error.
    let draws = input.draws.iter().map(|&d| u64::from(d % 10)).collect();
    let mut round = t.new_round(Box::new(SequenceRandom::new(draws)), stake());
    if let Ok(report) = Runner::new(&t).play_round(&mut round) {
        let paid: i64 = round.results().iter().map(|w| w.coins).sum();
        assert_eq!(report.coin_win, paid);
        assert!(round.calls().is_empty());
    }
});
