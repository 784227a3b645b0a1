//! Determinism checking and round state comparison.
//!
//! Provides utilities for comparing two round states to find where they
//! diverge, and for validating that a template produces identical rounds
//! from identical seeds.

use crate::grid::GridKind;
use crate::replay::first_divergence;
use crate::rng::LiveRandom;
use crate::round::{RoundContext, RoundError, Stake};
use crate::runner::Runner;
use crate::template::GameTemplate;

// ---------------------------------------------------------------------------
// State diff types
// ---------------------------------------------------------------------------

/// Per-area match results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundDiff {
    pub steps_match: bool,
    pub grids_match: bool,
    pub values_match: bool,
    pub wins_match: bool,
    pub draws_match: bool,
    pub commands_match: bool,
}

impl RoundDiff {
    pub fn is_identical(&self) -> bool {
        self.steps_match
            && self.grids_match
            && self.values_match
            && self.wins_match
            && self.draws_match
            && self.commands_match
    }
}

/// Compare two rounds area by area.
pub fn diff_rounds(a: &RoundContext, b: &RoundContext) -> RoundDiff {
    let grids_match = [GridKind::Main, GridKind::Other, GridKind::Side]
        .into_iter()
        .all(|kind| {
            a.stacks().stack(kind).len() == b.stacks().stack(kind).len()
                && a.stacks().top_grid(kind) == b.stacks().top_grid(kind)
        });

    RoundDiff {
        steps_match: a.step() == b.step() && a.hashes() == b.hashes(),
        grids_match,
        values_match: a.values.iter().eq(b.values.iter()),
        wins_match: a.coin_win() == b.coin_win()
            && a.cash_win() == b.cash_win()
            && a.results() == b.results(),
        draws_match: a.draws() == b.draws(),
        commands_match: a.commands() == b.commands(),
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    /// Whether the two runs produced identical results.
    pub is_deterministic: bool,
    /// Step at which divergence was first detected (if any).
    pub divergence_step: Option<usize>,
    /// Hash log: (step, hash_run1, hash_run2). Missing hashes read as 0.
    pub hash_log: Vec<(usize, u64, u64)>,
    pub diff: RoundDiff,
}

/// Play the template's round twice from the same seed and stake and report
/// the first step at which the two runs differ.
///
/// A round that pauses for a player command is compared as paused.
pub fn validate_determinism(
    template: &GameTemplate,
    seed: u64,
    stake: Stake,
) -> Result<DeterminismResult, RoundError> {
    let mut round_a = template.new_round(Box::new(LiveRandom::new(seed)), stake);
    let mut round_b = template.new_round(Box::new(LiveRandom::new(seed)), stake);
    Runner::new(template).play_round(&mut round_a)?;
    Runner::new(template).play_round(&mut round_b)?;

    let (ha, hb) = (round_a.hashes(), round_b.hashes());
    let hash_log = (0..ha.len().max(hb.len()))
        .map(|i| {
            (
                i,
                ha.get(i).copied().unwrap_or_default(),
                hb.get(i).copied().unwrap_or_default(),
            )
        })
        .collect();
    let divergence_step = first_divergence(ha, hb).map(|m| m.step);
    let diff = diff_rounds(&round_a, &round_b);
    if let Some(step) = divergence_step {
        log::warn!("rounds from seed {seed} diverge at step {step}");
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_step.is_none() && diff.is_identical(),
        divergence_step,
        hash_log,
        diff,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
