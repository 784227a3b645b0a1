#![no_main]
use libfuzzer_sys::fuzz_target;
use spindle_core::migration::MigrationRegistry;
use spindle_core::test_utils::*;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes to RoundContext::restore_data.
    // Must not panic -- returning Err is fine.
    let t = build_template(&respin_game(2));
    let mut round = test_round(&t, 0);
    let _ = round.restore_data(data, &MigrationRegistry::with_builtins());
});
