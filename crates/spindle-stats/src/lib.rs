//! Simulation statistics for Spindle games.
//!
//! Aggregates finished rounds into [`SpinStats`]: bets, wins, hit counts and
//! per-component play counts. Three ways to feed it:
//!
//! - attach a [`SpinStats`] to a [`Runner`] as a [`StatsSink`];
//! - send [`RoundSummary`] values to a background [`StatsWorker`] through a
//!   [`ChannelSink`];
//! - run a whole batch with [`simulate`], which plays rounds in parallel and
//!   merges the per-thread totals.
//!
//! # Usage
//!
//! ```ignore
//! let stats = simulate(&template, &SimConfig::new(1_000_000, 42, stake))?;
//! println!("rtp {:.4} hit rate {:.4}", stats.rtp(), stats.hit_rate());
//! ```

use std::collections::BTreeMap;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use rayon::prelude::*;
use spindle_core::data::ComponentData;
use spindle_core::fixed::{Coins, Fixed64};
use spindle_core::hooks::StatsSink;
use spindle_core::id::ComponentId;
use spindle_core::rng::LiveRandom;
use spindle_core::round::{RoundContext, RoundError, Stake};
use spindle_core::runner::{RoundReport, RoundStatus, Runner};
use spindle_core::template::GameTemplate;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("statistics worker panicked")]
    WorkerPanicked,
    #[error("could not build simulation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// Round summaries
// ---------------------------------------------------------------------------

/// Everything the aggregator needs from one finished round. Owns its data so
/// it can cross a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub coin_bet: Coins,
    pub cash_bet: Fixed64,
    pub coin_win: Coins,
    pub cash_win: Fixed64,
    pub wins: usize,
    pub steps: u32,
    /// At least one win was paid inside a respin frame.
    pub feature_win: bool,
    /// Plays per component name.
    pub plays: BTreeMap<String, u64>,
}

impl RoundSummary {
    /// Summarize a completed round. `plays` is left empty.
    pub fn from_report(report: &RoundReport, round: &RoundContext) -> Self {
        let stake = round.stake();
        Self {
            coin_bet: stake.coin_bet,
            cash_bet: stake.cash_bet(),
            coin_win: report.coin_win,
            cash_win: report.cash_win,
            wins: report.wins,
            steps: report.steps,
            feature_win: round.results().iter().any(|w| w.depth > 0),
            plays: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpinStats
// ---------------------------------------------------------------------------

/// Running totals over many rounds. Totals only add up, so two instances
/// can be merged in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpinStats {
    pub rounds: u64,
    /// Rounds that aborted with an error. Not counted in `rounds`.
    pub failed: u64,
    pub coin_bet: Coins,
    pub cash_bet: Fixed64,
    pub coin_win: Coins,
    pub cash_win: Fixed64,
    /// Rounds with a positive coin win.
    pub hits: u64,
    pub feature_hits: u64,
    pub max_coin_win: Coins,
    pub steps: u64,
    pub plays: BTreeMap<String, u64>,
    /// Plays of the round in progress, committed when it completes.
    pending: BTreeMap<String, u64>,
}

impl SpinStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, summary: &RoundSummary) {
        self.rounds += 1;
        self.coin_bet = self.coin_bet.saturating_add(summary.coin_bet);
        self.cash_bet = self.cash_bet.saturating_add(summary.cash_bet);
        self.coin_win = self.coin_win.saturating_add(summary.coin_win);
        self.cash_win = self.cash_win.saturating_add(summary.cash_win);
        if summary.coin_win > 0 {
            self.hits += 1;
        }
        if summary.feature_win {
            self.feature_hits += 1;
        }
        self.max_coin_win = self.max_coin_win.max(summary.coin_win);
        self.steps += u64::from(summary.steps);
        for (name, count) in &summary.plays {
            *self.plays.entry(name.clone()).or_insert(0) += count;
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Fold another set of totals into this one.
    pub fn merge(&mut self, other: &SpinStats) {
        self.rounds += other.rounds;
        self.failed += other.failed;
        self.coin_bet = self.coin_bet.saturating_add(other.coin_bet);
        self.cash_bet = self.cash_bet.saturating_add(other.cash_bet);
        self.coin_win = self.coin_win.saturating_add(other.coin_win);
        self.cash_win = self.cash_win.saturating_add(other.cash_win);
        self.hits += other.hits;
        self.feature_hits += other.feature_hits;
        self.max_coin_win = self.max_coin_win.max(other.max_coin_win);
        self.steps += other.steps;
        for (name, count) in &other.plays {
            *self.plays.entry(name.clone()).or_insert(0) += count;
        }
    }

    /// Return to player: coins won per coin bet. Zero before any bet.
    pub fn rtp(&self) -> f64 {
        if self.coin_bet == 0 {
            return 0.0;
        }
        self.coin_win as f64 / self.coin_bet as f64
    }

    /// Share of completed rounds that paid anything.
    pub fn hit_rate(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.hits as f64 / self.rounds as f64
    }

    pub fn feature_rate(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.feature_hits as f64 / self.rounds as f64
    }

    pub fn mean_steps(&self) -> f64 {
        if self.rounds == 0 {
            return 0.0;
        }
        self.steps as f64 / self.rounds as f64
    }

    pub fn plays_of(&self, name: &str) -> u64 {
        self.plays.get(name).copied().unwrap_or(0)
    }
}

impl StatsSink for SpinStats {
    fn on_step(&mut self, _component: ComponentId, name: &str, _data: &dyn ComponentData) {
        *self.pending.entry(name.to_string()).or_insert(0) += 1;
    }

    fn on_round_end(&mut self, report: &RoundReport, round: &RoundContext) {
        let mut summary = RoundSummary::from_report(report, round);
        summary.plays = std::mem::take(&mut self.pending);
        self.record(&summary);
    }

    fn on_round_abort(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// StatsWorker -- aggregation on a background thread
// ---------------------------------------------------------------------------

/// Sink that collects a round's plays and ships the finished summary to a
/// [`StatsWorker`].
pub struct ChannelSink {
    tx: Sender<RoundSummary>,
    plays: BTreeMap<String, u64>,
}

impl ChannelSink {
    pub fn new(tx: Sender<RoundSummary>) -> Self {
        Self {
            tx,
            plays: BTreeMap::new(),
        }
    }
}

impl StatsSink for ChannelSink {
    fn on_step(&mut self, _component: ComponentId, name: &str, _data: &dyn ComponentData) {
        *self.plays.entry(name.to_string()).or_insert(0) += 1;
    }

    fn on_round_end(&mut self, report: &RoundReport, round: &RoundContext) {
        let mut summary = RoundSummary::from_report(report, round);
        summary.plays = std::mem::take(&mut self.plays);
        if self.tx.send(summary).is_err() {
            warn!("statistics worker is gone, dropping round summary");
        }
    }

    fn on_round_abort(&mut self) {
        self.plays.clear();
    }
}

/// Owns a [`SpinStats`] on its own thread and folds in every
/// [`RoundSummary`] it receives. Shares no memory with the rounds.
pub struct StatsWorker {
    tx: Sender<RoundSummary>,
    handle: JoinHandle<SpinStats>,
}

impl StatsWorker {
    pub fn spawn() -> Self {
        let (tx, rx) = unbounded();
        let handle = std::thread::spawn(move || aggregate(rx));
        Self { tx, handle }
    }

    pub fn sender(&self) -> Sender<RoundSummary> {
        self.tx.clone()
    }

    pub fn sink(&self) -> ChannelSink {
        ChannelSink::new(self.sender())
    }

    /// Stop accepting summaries and return the totals. Blocks until every
    /// other sender has been dropped.
    pub fn finish(self) -> Result<SpinStats, StatsError> {
        drop(self.tx);
        self.handle.join().map_err(|_| StatsError::WorkerPanicked)
    }
}

fn aggregate(rx: Receiver<RoundSummary>) -> SpinStats {
    let mut stats = SpinStats::new();
    for summary in rx {
        stats.record(&summary);
    }
    debug!("statistics worker done: {} rounds", stats.rounds);
    stats
}

// ---------------------------------------------------------------------------
// Batch simulation
// ---------------------------------------------------------------------------

/// Configuration for [`simulate`].
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub rounds: u64,
    /// Round `i` is seeded with `seed + i`.
    pub seed: u64,
    pub stake: Stake,
    /// Worker threads. `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl SimConfig {
    pub fn new(rounds: u64, seed: u64, stake: Stake) -> Self {
        Self {
            rounds,
            seed,
            stake,
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }
}

/// Play `config.rounds` independent rounds in parallel and merge their
/// statistics. A round that pauses for a command is resumed with its first
/// option. Failed rounds are counted, not propagated.
pub fn simulate(template: &GameTemplate, config: &SimConfig) -> Result<SpinStats, StatsError> {
    let run = || {
        (0..config.rounds)
            .into_par_iter()
            .fold(SpinStats::new, |mut stats, i| {
                let seed = config.seed.wrapping_add(i);
                if let Err(e) = play_one(template, seed, config.stake, &mut stats) {
                    debug!("round with seed {seed} failed: {e}");
                    stats.record_failure();
                }
                stats
            })
            .reduce(SpinStats::new, |mut a, b| {
                a.merge(&b);
                a
            })
    };

    let stats = match config.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run(),
    };
    debug!(
        "simulated {} rounds of `{}`: rtp {:.4}, {} failed",
        stats.rounds,
        template.name(),
        stats.rtp(),
        stats.failed
    );
    Ok(stats)
}

fn play_one(template: &GameTemplate, seed: u64, stake: Stake, stats: &mut SpinStats) -> Result<(), RoundError> {
    let mut round = template.new_round(Box::new(LiveRandom::new(seed)), stake);
    let mut runner = Runner::new(template).with_sink(Box::new(&mut *stats));
    let mut report = runner.play_round(&mut round)?;
    while let RoundStatus::Waiting { options, .. } = &report.status {
        let Some(first) = options.first().cloned() else {
            break;
        };
        report = runner.resume(&mut round, &first)?;
    }
    drop(runner);
    // Stuck on a command with no options.
    if !report.is_complete() {
        stats.on_round_abort();
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_core::config::{ComponentConfig, GameConfig};
    use spindle_core::test_utils::*;

    fn summary(coin_win: Coins, feature_win: bool) -> RoundSummary {
        RoundSummary {
            coin_bet: 1,
            cash_bet: fixed(0.5),
            coin_win,
            cash_win: fixed(coin_win as f64 * 0.5),
            wins: usize::from(coin_win > 0),
            steps: 2,
            feature_win,
            plays: BTreeMap::from([("spin".to_string(), 1), ("pay".to_string(), 1)]),
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: empty stats report zero rates
    // -----------------------------------------------------------------------
    #[test]
    fn empty_stats() {
        let stats = SpinStats::new();
        assert_eq!(stats.rtp(), 0.0);
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.mean_steps(), 0.0);
        assert_eq!(stats.plays_of("spin"), 0);
    }

    // -----------------------------------------------------------------------
    // Test 2: recording summaries
    // -----------------------------------------------------------------------
    #[test]
    fn record_accumulates() {
        let mut stats = SpinStats::new();
        stats.record(&summary(0, false));
        stats.record(&summary(3, false));
        stats.record(&summary(5, true));
        stats.record(&summary(0, false));
        stats.record_failure();

        assert_eq!(stats.rounds, 4);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.coin_bet, 4);
        assert_eq!(stats.cash_bet, fixed(2.0));
        assert_eq!(stats.coin_win, 8);
        assert_eq!(stats.cash_win, fixed(4.0));
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.feature_hits, 1);
        assert_eq!(stats.max_coin_win, 5);
        assert_eq!(stats.rtp(), 2.0);
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.feature_rate(), 0.25);
        assert_eq!(stats.mean_steps(), 2.0);
        assert_eq!(stats.plays_of("spin"), 4);
    }

    // -----------------------------------------------------------------------
    // Test 3: merging equals recording everything in one place
    // -----------------------------------------------------------------------
    #[test]
    fn merge_matches_sequential() {
        let summaries: Vec<_> = (0..10).map(|i| summary(i % 4, i % 3 == 0)).collect();
        let mut all = SpinStats::new();
        summaries.iter().for_each(|s| all.record(s));

        let mut left = SpinStats::new();
        let mut right = SpinStats::new();
        summaries[..6].iter().for_each(|s| left.record(s));
        summaries[6..].iter().for_each(|s| right.record(s));
        right.record_failure();
        all.record_failure();

        right.merge(&left);
        assert_eq!(right, all);
    }

    // -----------------------------------------------------------------------
    // Test 4: SpinStats as a runner sink
    // -----------------------------------------------------------------------
    #[test]
    fn sink_counts_plays_and_wins() {
        let t = build_template(&simple_game());
        let mut stats = SpinStats::new();
        {
            let mut runner = Runner::new(&t).with_sink(Box::new(&mut stats));
            // Stop 3: five scatters pay 100.
            let mut round = t.new_round(Box::new(FixedRandom::new(3)), stake());
            runner.play_round(&mut round).unwrap();
            // Stop 0: no scatter, nothing paid.
            let mut round = t.new_round(Box::new(FixedRandom::new(0)), stake());
            runner.play_round(&mut round).unwrap();
        }
        assert_eq!(stats.rounds, 2);
        assert_eq!(stats.coin_win, 100);
        assert_eq!(stats.cash_win, fixed(50.0));
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.plays_of("spin"), 2);
        assert_eq!(stats.plays_of("pay"), 2);
        assert_eq!(stats.rtp(), 50.0);
    }

    // -----------------------------------------------------------------------
    // Test 5: the worker aggregates summaries from many threads
    // -----------------------------------------------------------------------
    #[test]
    fn worker_aggregates_across_threads() {
        let worker = StatsWorker::spawn();
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let tx = worker.sender();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        tx.send(summary(i % 2, false)).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        let stats = worker.finish().unwrap();
        assert_eq!(stats.rounds, 100);
        assert_eq!(stats.coin_win, 48);
        assert_eq!(stats.hits, 48);
    }

    // -----------------------------------------------------------------------
    // Test 6: a channel sink and a direct sink agree
    // -----------------------------------------------------------------------
    #[test]
    fn channel_sink_matches_direct_sink() {
        let t = build_template(&respin_game(3));
        let worker = StatsWorker::spawn();
        let mut direct = SpinStats::new();
        {
            let mut runner = Runner::new(&t)
                .with_sink(Box::new(worker.sink()))
                .with_sink(Box::new(&mut direct));
            for seed in 0..50 {
                let mut round = test_round(&t, seed);
                runner.play_round(&mut round).unwrap();
            }
        }
        let via_worker = worker.finish().unwrap();
        assert_eq!(via_worker, direct);
        assert_eq!(via_worker.rounds, 50);
        assert_eq!(via_worker.plays_of("spin"), 50);
    }

    // -----------------------------------------------------------------------
    // Test 7: simulate is deterministic and matches a sequential run
    // -----------------------------------------------------------------------
    #[test]
    fn simulate_matches_sequential() {
        let t = build_template(&respin_game(3));
        let config = SimConfig::new(200, 1_000, stake());
        let parallel = simulate(&t, &config).unwrap();
        let again = simulate(&t, &config.clone().with_threads(2)).unwrap();
        assert_eq!(parallel, again);

        let mut sequential = SpinStats::new();
        for i in 0..200 {
            play_one(&t, 1_000 + i, stake(), &mut sequential).unwrap();
        }
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.rounds, 200);
        assert_eq!(parallel.failed, 0);
        assert_eq!(parallel.plays_of("spin"), 200);
    }

    // -----------------------------------------------------------------------
    // Test 8: failures are counted, not propagated
    // -----------------------------------------------------------------------
    #[test]
    fn simulate_counts_failures() {
        // One step allowed: every round aborts before `pay`.
        let t = build_template(&simple_game().with_max_steps(1));
        let stats = simulate(&t, &SimConfig::new(20, 0, stake())).unwrap();
        assert_eq!(stats.rounds, 0);
        assert_eq!(stats.failed, 20);
        assert_eq!(stats.rtp(), 0.0);
        // `spin` played in every round, but no round finished.
        assert_eq!(stats.plays_of("spin"), 0);
        assert!(stats.plays.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 9: paused rounds resume with their first option
    // -----------------------------------------------------------------------
    #[test]
    fn simulate_resumes_choices() {
        let config = GameConfig::new("choice", 5, 3, "spin")
            .with_component(
                ComponentConfig::new("spin", "reels")
                    .with_param("reels", s("base"))
                    .with_next("choose"),
            )
            .with_component(
                ComponentConfig::new("choose", "player_choice")
                    .with_param("options", map(&[("collect", "pay"), ("skip", "skip")])),
            )
            .with_component(
                ComponentConfig::new("pay", "scatter_pay")
                    .with_param("symbol", s("S"))
                    .with_param("pays", int_list(&[0, 0, 0, 5, 20, 100])),
            )
            .with_component(
                ComponentConfig::new("skip", "scatter_pay")
                    .with_param("symbol", s("S"))
                    .with_param("pays", int_list(&[0])),
            );
        let t = build_template(&config);
        let stats = simulate(&t, &SimConfig::new(30, 5, stake())).unwrap();
        assert_eq!(stats.rounds, 30);
        // "collect" sorts first.
        assert_eq!(stats.plays_of("pay"), 30);
        assert_eq!(stats.plays_of("skip"), 0);
    }

    // -----------------------------------------------------------------------
    // Test 10: an aborted round's plays are not credited to the next round
    // -----------------------------------------------------------------------
    #[test]
    fn aborted_round_plays_discarded() {
        let capped = build_template(&simple_game().with_max_steps(1));
        let t = build_template(&simple_game());
        let worker = StatsWorker::spawn();
        let mut channel = worker.sink();
        let mut direct = SpinStats::new();

        let mut round = capped.new_round(Box::new(FixedRandom::new(3)), stake());
        let failed = Runner::new(&capped)
            .with_sink(Box::new(&mut channel))
            .with_sink(Box::new(&mut direct))
            .play_round(&mut round);
        assert_eq!(failed, Err(RoundError::StepLimit(1)));

        let mut round = t.new_round(Box::new(FixedRandom::new(3)), stake());
        Runner::new(&t)
            .with_sink(Box::new(&mut channel))
            .with_sink(Box::new(&mut direct))
            .play_round(&mut round)
            .unwrap();
        drop(channel);

        let via_worker = worker.finish().unwrap();
        for stats in [&via_worker, &direct] {
            assert_eq!(stats.rounds, 1);
            assert_eq!(stats.coin_win, 100);
            assert_eq!(stats.plays_of("spin"), 1);
            assert_eq!(stats.plays_of("pay"), 1);
        }
    }
}
