//! Round recording and playback for auditing and dispute resolution.
//!
//! A [`ReplayLog`] captures everything that made a round what it was: the
//! entry component, the stake, every random draw and every player command,
//! plus the per-step state hashes as checkpoints. Feeding the draws back
//! through a [`ReplayRandom`] and the commands through
//! [`Runner::resume`] reproduces the round exactly.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::id::ComponentId;
use crate::rng::{Draw, ReplayRandom};
use crate::round::{RoundContext, RoundError, Stake};
use crate::runner::{RoundReport, RoundStatus, Runner};
use crate::serialize::{DeserializeError, SerializeError};
use crate::template::GameTemplate;

// ---------------------------------------------------------------------------
// ReplayError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("replayed round failed: {0}")]
    Round(#[from] RoundError),
    #[error("round completed with {0} recorded commands left over")]
    UnusedCommands(usize),
    #[error("round is still waiting after every recorded command")]
    StillWaiting,
}

// ---------------------------------------------------------------------------
// ReplayMismatch
// ---------------------------------------------------------------------------

/// Details about where replay verification failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    /// Zero-based index of the first step whose hash differs.
    pub step: usize,
    /// Hash from the recording, `None` if the replay ran longer.
    pub expected: Option<u64>,
    /// Hash from the replay, `None` if the replay stopped early.
    pub actual: Option<u64>,
}

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A recorded round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub entry: ComponentId,
    pub coin_bet: i64,
    /// Raw bits of the cash-per-coin rate.
    pub cash_per_coin: i64,
    pub draws: Vec<Draw>,
    pub commands: Vec<String>,
    /// State hash after each step.
    pub checkpoints: Vec<u64>,
}

impl ReplayLog {
    pub fn stake(&self) -> Stake {
        Stake::new(self.coin_bet, Fixed64::from_bits(self.cash_per_coin))
    }

    pub fn step_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Serialize the replay log to bytes (using bitcode).
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(self).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a replay log from bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
    }
}

/// Capture a played round that started at `entry`.
pub fn record_round(round: &RoundContext, entry: ComponentId) -> ReplayLog {
    let stake = round.stake();
    ReplayLog {
        entry,
        coin_bet: stake.coin_bet,
        cash_per_coin: stake.cash_per_coin.to_bits(),
        draws: round.draws().to_vec(),
        commands: round.commands().choices(),
        checkpoints: round.hashes().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The result of replaying a log.
#[derive(Debug)]
pub struct ReplayResult {
    /// Steps the replay executed.
    pub steps: usize,
    /// Whether all hash checkpoints matched.
    pub is_verified: bool,
    /// First mismatch encountered (if any).
    pub first_mismatch: Option<ReplayMismatch>,
    pub report: RoundReport,
}

// ---------------------------------------------------------------------------
// Replay execution
// ---------------------------------------------------------------------------

/// Replay a log, returning the final round and its report.
pub fn replay(template: &GameTemplate, log: &ReplayLog) -> Result<(RoundContext, RoundReport), ReplayError> {
    let mut round = template.new_round(Box::new(ReplayRandom::new(log.draws.clone())), log.stake());
    let mut runner = Runner::new(template);
    let mut report = runner.run(&mut round, log.entry)?;
    let mut commands = log.commands.iter();
    while let RoundStatus::Waiting { .. } = report.status {
        let Some(command) = commands.next() else {
            return Err(ReplayError::StillWaiting);
        };
        report = runner.resume(&mut round, command)?;
    }
    let left = commands.count();
    if left > 0 {
        return Err(ReplayError::UnusedCommands(left));
    }
    Ok((round, report))
}

/// Replay a log and verify hash checkpoints.
pub fn replay_and_verify(template: &GameTemplate, log: &ReplayLog) -> Result<ReplayResult, ReplayError> {
    let (round, report) = replay(template, log)?;
    let actual = round.hashes();
    let first_mismatch = first_divergence(&log.checkpoints, actual);
    if let Some(m) = &first_mismatch {
        log::warn!("replay diverged at step {}", m.step);
    }
    Ok(ReplayResult {
        steps: actual.len(),
        is_verified: first_mismatch.is_none(),
        first_mismatch,
        report,
    })
}

/// First index at which two hash logs differ, including a length mismatch.
pub(crate) fn first_divergence(expected: &[u64], actual: &[u64]) -> Option<ReplayMismatch> {
    let len = expected.len().max(actual.len());
    (0..len).find_map(|step| {
        let e = expected.get(step).copied();
        let a = actual.get(step).copied();
        (e != a).then_some(ReplayMismatch {
            step,
            expected: e,
            actual: a,
        })
    })
}

// ===========================================================================
// Tests
// ===========================================================================
