//! Cross-crate integration tests for a data-driven game with nested respins.
//!
//! The game is written to disk as mixed RON / TOML / JSON files, loaded with
//! `spindle-data`, played and replayed with `spindle-core`, and simulated
//! with `spindle-stats`.
//!
//! Base game: spin -> pay -> trigger. Three scatters enter `free_spins`
//! (3 iterations of fs_spin -> fs_pay -> fs_trigger). Ten scatters during a
//! free spin enter `bonus_round`, a 2-iteration respin nested inside the free
//! spins frame that pays 7 coins per iteration.

use std::fs;
use std::path::{Path, PathBuf};

use spindle_core::factory::ComponentFactories;
use spindle_core::grid::GridKind;
use spindle_core::replay::{ReplayLog, record_round, replay, replay_and_verify};
use spindle_core::rng::LiveRandom;
use spindle_core::runner::Runner;
use spindle_core::template::GameTemplate;
use spindle_core::test_utils::{FixedRandom, stake};
use spindle_core::validation::validate_determinism;
use spindle_data::{DataLoadError, load_game_data, load_template};
use spindle_stats::{SimConfig, SpinStats, StatsWorker, simulate};

const GAME_RON: &str = r#"#![enable(implicit_some)]
(
    name: "nested_free_spins",
    width: 5,
    height: 3,
    entry: "spin",
    components: [
        (name: "spin", kind: "reels", next: "pay", params: {"reels": "base"}),
        (name: "pay", kind: "scatter_pay", next: "trigger",
         params: {"symbol": "S", "pays": [0, 0, 0, 5, 20, 100]}),
        (name: "trigger", kind: "symbol_trigger",
         params: {"symbols": ["S"], "min_count": 3, "then": "free_spins"}),
        (name: "free_spins", kind: "respin",
         params: {"first": "fs_spin", "iterations": 3}),
        (name: "fs_spin", kind: "reels", next: "fs_pay", params: {"reels": "bonus"}),
        (name: "fs_pay", kind: "scatter_pay", next: "fs_trigger",
         params: {"symbol": "S", "pays": [0, 0, 0, 5, 20, 100]}),
        (name: "fs_trigger", kind: "symbol_trigger",
         params: {"symbols": ["S"], "min_count": 10, "then": "bonus_round"}),
        (name: "bonus_round", kind: "respin",
         params: {"first": "bonus_pay", "iterations": 2}),
        (name: "bonus_pay", kind: "value_trigger",
         params: {"key": "unused", "op": "eq", "value": 0},
         awards: [(kind: "add_coins", params: {"coins": 7})]),
    ],
)"#;

const SYMBOLS_TOML: &str = r#"symbols = ["A", "B", "C", "W", "S"]"#;

fn reels_json() -> String {
    let base = r#"["A", "B", "C", "S", "W", "A", "B", "C"]"#;
    let bonus = r#"["S", "S", "A", "B"]"#;
    format!(
        r#"{{ "base": [{base}, {base}, {base}, {base}, {base}],
             "bonus": [{bonus}, {bonus}, {bonus}, {bonus}, {bonus}] }}"#
    )
}

fn game_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "spindle_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("game.ron"), GAME_RON).unwrap();
    fs::write(dir.join("symbols.toml"), SYMBOLS_TOML).unwrap();
    fs::write(dir.join("reels.json"), reels_json()).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

fn load(suffix: &str) -> GameTemplate {
    let dir = game_dir(suffix);
    let t = load_template(&dir, &ComponentFactories::with_builtins()).unwrap();
    cleanup(&dir);
    t
}

// ===========================================================================
// Test 1: the game directory loads
// ===========================================================================

#[test]
fn game_directory_loads() {
    let dir = game_dir("loads");
    let data = load_game_data(&dir).unwrap();
    assert_eq!(data.config.name, "nested_free_spins");
    assert_eq!(data.config.components.len(), 9);
    assert_eq!(data.registry.symbol_count(), 5);
    assert_eq!(data.registry.reel_set_count(), 2);

    // A second game file in another format is ambiguous.
    fs::write(dir.join("game.toml"), "").unwrap();
    assert!(matches!(
        load_game_data(&dir),
        Err(DataLoadError::ConflictingFormats { .. })
    ));
    cleanup(&dir);
}

// ===========================================================================
// Test 2: forced nested respins
// ===========================================================================
//
// Every draw returns 3. Base stop 3 shows S W A per column (5 scatters, 100
// coins). Bonus stop 3 shows B S S per column (10 scatters, 100 coins), which
// also enters the bonus round on every free spin: 2 x 7 coins.

#[test]
fn forced_nested_respins() {
    let t = load("forced");
    let mut round = t.new_round(Box::new(FixedRandom::new(3)), stake());
    let report = Runner::new(&t).play_round(&mut round).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.coin_win, 100 + 3 * (100 + 2 * 7));
    assert!(round.calls().is_empty());

    let at_depth = |d: u32| round.results().iter().filter(|w| w.depth == d).count();
    assert_eq!(at_depth(0), 1);
    assert_eq!(at_depth(1), 3);
    assert_eq!(at_depth(2), 6);

    // Neither frame's grids nor data outlive it.
    let (_, main) = round.visible_grid(GridKind::Main).unwrap();
    assert_eq!(main.count_any(&[t.registry().symbol("S").unwrap()]), 5);
    assert!(round.find_data(t.id_of("bonus_pay").unwrap()).is_none());
    assert!(round.find_data(t.id_of("fs_spin").unwrap()).is_none());
}

// ===========================================================================
// Test 3: recorded rounds replay from a serialized log
// ===========================================================================

#[test]
fn serialized_logs_replay() {
    let t = load("replay");
    for seed in [1, 17, 256, 9_999] {
        let mut round = t.new_round(Box::new(LiveRandom::new(seed)), stake());
        let report = Runner::new(&t).play_round(&mut round).unwrap();

        let bytes = record_round(&round, t.entry()).serialize().unwrap();
        let log = ReplayLog::deserialize(&bytes).unwrap();
        assert_eq!(log.step_count(), report.steps as usize);

        let (replayed, replayed_report) = replay(&t, &log).unwrap();
        assert_eq!(replayed_report, report, "seed {seed}");
        assert_eq!(replayed.results(), round.results());

        let verified = replay_and_verify(&t, &log).unwrap();
        assert!(verified.is_verified, "seed {seed}");
        assert!(validate_determinism(&t, seed, stake()).unwrap().is_deterministic);
    }
}

// ===========================================================================
// Test 4: batch simulation over the loaded game
// ===========================================================================

#[test]
fn simulation_over_loaded_game() {
    let t = load("simulate");
    let stats = simulate(&t, &SimConfig::new(500, 42, stake())).unwrap();

    assert_eq!(stats.rounds, 500);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.coin_bet, 500);
    assert_eq!(stats.plays_of("spin"), 500);
    assert_eq!(stats.plays_of("trigger"), 500);
    // Every free spin pays at least five scatters, so every trigger is a
    // feature hit.
    assert!(stats.feature_hits > 0);
    assert_eq!(stats.plays_of("free_spins"), stats.feature_hits);
    assert_eq!(stats.plays_of("fs_spin"), 3 * stats.feature_hits);
    assert!(stats.hits >= stats.feature_hits);
    assert!(stats.rtp() > 0.0);
}

// ===========================================================================
// Test 5: a worker fed from many threads agrees with simulate
// ===========================================================================

#[test]
fn worker_matches_simulate() {
    let t = load("worker");
    let worker = StatsWorker::spawn();
    std::thread::scope(|scope| {
        for chunk in 0..4u64 {
            let t = &t;
            let sink = worker.sink();
            scope.spawn(move || {
                let mut runner = Runner::new(t).with_sink(Box::new(sink));
                for i in (chunk * 50)..((chunk + 1) * 50) {
                    let mut round = t.new_round(Box::new(LiveRandom::new(7 + i)), stake());
                    runner.play_round(&mut round).unwrap();
                }
            });
        }
    });
    let via_worker: SpinStats = worker.finish().unwrap();

    let batch = simulate(&t, &SimConfig::new(200, 7, stake()).with_threads(3)).unwrap();
    assert_eq!(via_worker, batch);
}
