#![no_main]
use libfuzzer_sys::fuzz_target;
use spindle_core::replay::{ReplayLog, replay_and_verify};
use spindle_core::test_utils::*;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error or a log that replays to an
    // error or a result. Never a panic.
    if let Ok(log) = ReplayLog::deserialize(data) {
        let t = build_template(&respin_game(3));
        let _ = replay_and_verify(&t, &log);
    }
});
