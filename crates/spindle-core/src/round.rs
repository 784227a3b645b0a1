//! The per-round context.
//!
//! A [`RoundContext`] owns everything one round mutates: the grid pool and
//! stacks, the randomness port, the call stack, the round-level data
//! namespace, the value store, the stake, the results and the pending award
//! effects. It is created by
//! [`GameTemplate::new_round`](crate::template::GameTemplate::new_round) and
//! can be [`reset`](RoundContext::reset) and reused for the next round.
//!
//! # Data lookup
//!
//! Plays and award writes use the *current scope*: the innermost call-stack
//! frame, or the round namespace outside any respin. The first time a
//! component is used in a scope it gets a fresh record cloned from its
//! prototype. Read-only lookups ([`RoundContext::find_data`]) search the
//! innermost frame first and fall back outward to the round namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace};

use crate::award::Award;
use crate::callstack::{CallStack, FrameSummary, ScopeGrids};
use crate::command::CommandLog;
use crate::data::{self, BasicData, ComponentData, DataScope};
use crate::fixed::{Coins, Fixed64, coins_to_cash};
use crate::grid::{Grid, GridError, GridKind, GridStacks, Position};
use crate::id::{ComponentId, GridId, StackIndex};
use crate::migration::MigrationRegistry;
use crate::rng::{Draw, RandomSource, RngError};
use crate::serialize::{
    DataSnapshot, DeserializeError, PersistedScope, SerializeError, SnapshotHeader,
};
use crate::sim::StateHash;
use crate::values::ValueStore;
use crate::weights::WeightError;

const GRID_KINDS: [GridKind; 3] = [GridKind::Main, GridKind::Other, GridKind::Side];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Runtime errors. Any of these aborts the current round only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("random source: {0}")]
    Random(#[from] RngError),
    #[error("weighted draw: {0}")]
    Weight(#[from] WeightError),
    #[error("grid: {0}")]
    Grid(#[from] GridError),
    #[error("unknown component index {}", .0.0)]
    UnknownComponent(ComponentId),
    #[error("component `{component}` got a `{actual}` data record")]
    DataKind {
        component: String,
        actual: &'static str,
    },
    #[error("no active respin frame")]
    NoActiveFrame,
    #[error("component {} is not a respin", .0.0)]
    NotRespin(ComponentId),
    #[error("respin {} granted while respin {} is pending", .requested.0, .pending.0)]
    ConflictingRespins {
        pending: ComponentId,
        requested: ComponentId,
    },
    #[error("`{component}`: override `{key}` = `{value}` is invalid")]
    InvalidOverride {
        component: String,
        key: String,
        value: String,
    },
    #[error("round exceeded {0} steps")]
    StepLimit(u32),
    #[error("round is not waiting for a command")]
    NotWaiting,
    #[error("command `{command}` is not one of {options:?}")]
    InvalidCommand {
        command: String,
        options: Vec<String>,
    },
    #[error("round cannot run in state {0:?}")]
    NotRunnable(RoundState),
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// What the player staked on the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stake {
    /// Bet in coins; pays are multiples of it.
    pub coin_bet: Coins,
    pub cash_per_coin: Fixed64,
}

impl Stake {
    pub fn new(coin_bet: Coins, cash_per_coin: Fixed64) -> Self {
        Self {
            coin_bet,
            cash_per_coin,
        }
    }

    pub fn cash_bet(&self) -> Fixed64 {
        coins_to_cash(self.coin_bet, self.cash_per_coin)
    }
}

/// One paid win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinResult {
    pub component: ComponentId,
    pub step: u32,
    /// Call-stack depth the win was paid at.
    pub depth: u32,
    pub coins: Coins,
    pub cash: Fixed64,
    pub positions: Vec<Position>,
}

/// A respin waiting to be entered after the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    pub respin: ComponentId,
    pub iterations: u32,
}

/// A pause for a player decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiting {
    pub component: ComponentId,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Fresh,
    Running,
    Waiting,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// RoundContext
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RoundContext {
    stacks: GridStacks,
    random: Box<dyn RandomSource>,
    calls: CallStack,
    data: DataScope,
    prototypes: Arc<Vec<Box<dyn ComponentData>>>,
    grids: ScopeGrids,
    pub values: ValueStore,
    stake: Stake,
    width: usize,
    height: usize,
    results: Vec<WinResult>,
    coin_win: Coins,
    cash_win: Fixed64,
    step: u32,
    pending_awards: Vec<(ComponentId, Award)>,
    pending_entry: Option<FrameEntry>,
    jumps: BTreeMap<ComponentId, ComponentId>,
    commands: CommandLog,
    command: Option<String>,
    hashes: Vec<u64>,
    pub(crate) state: RoundState,
    pub(crate) current: Option<ComponentId>,
    pub(crate) waiting: Option<Waiting>,
}

impl RoundContext {
    pub fn new(
        prototypes: Arc<Vec<Box<dyn ComponentData>>>,
        width: usize,
        height: usize,
        random: Box<dyn RandomSource>,
        stake: Stake,
    ) -> Self {
        let components = prototypes.len();
        Self {
            stacks: GridStacks::new(),
            random,
            calls: CallStack::new(),
            data: DataScope::new(components),
            prototypes,
            grids: ScopeGrids::default(),
            values: ValueStore::new(),
            stake,
            width,
            height,
            results: Vec::new(),
            coin_win: 0,
            cash_win: Fixed64::ZERO,
            step: 0,
            pending_awards: Vec::new(),
            pending_entry: None,
            jumps: BTreeMap::new(),
            commands: CommandLog::new(),
            command: None,
            hashes: Vec::new(),
            state: RoundState::Fresh,
            current: None,
            waiting: None,
        }
    }

    /// Prepare for a new round, keeping pooled grid buffers.
    pub fn reset(&mut self, random: Box<dyn RandomSource>, stake: Stake) {
        self.stacks.clear();
        self.random = random;
        self.calls.clear();
        self.data.clear();
        self.grids.clear();
        self.values.clear();
        self.stake = stake;
        self.results.clear();
        self.coin_win = 0;
        self.cash_win = Fixed64::ZERO;
        self.step = 0;
        self.pending_awards.clear();
        self.pending_entry = None;
        self.jumps.clear();
        self.commands.clear();
        self.command = None;
        self.hashes.clear();
        self.state = RoundState::Fresh;
        self.current = None;
        self.waiting = None;
    }

    // -- accessors ---------------------------------------------------------

    pub fn random(&mut self) -> &mut dyn RandomSource {
        self.random.as_mut()
    }

    /// Every draw made so far.
    pub fn draws(&self) -> &[Draw] {
        self.random.draws()
    }

    pub fn stake(&self) -> Stake {
        self.stake
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of completed plays.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub(crate) fn advance_step(&mut self) {
        self.step += 1;
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn stacks(&self) -> &GridStacks {
        &self.stacks
    }

    pub fn calls(&self) -> &CallStack {
        &self.calls
    }

    pub fn results(&self) -> &[WinResult] {
        &self.results
    }

    pub fn coin_win(&self) -> Coins {
        self.coin_win
    }

    pub fn cash_win(&self) -> Fixed64 {
        self.cash_win
    }

    pub fn waiting(&self) -> Option<&Waiting> {
        self.waiting.as_ref()
    }

    pub fn commands(&self) -> &CommandLog {
        &self.commands
    }

    /// Per-step state hashes, one per completed play.
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    pub fn component_count(&self) -> usize {
        self.prototypes.len()
    }

    // -- component data ----------------------------------------------------

    /// The round-level namespace.
    pub fn round_data(&self) -> &DataScope {
        &self.data
    }

    fn current_scope(&self) -> &DataScope {
        match self.calls.current_frame() {
            Some(frame) => &frame.data,
            None => &self.data,
        }
    }

    fn current_scope_mut(&mut self) -> &mut DataScope {
        match self.calls.current_frame_mut() {
            Some(frame) => &mut frame.data,
            None => &mut self.data,
        }
    }

    fn prototype(&self, id: ComponentId) -> Result<Box<dyn ComponentData>, RoundError> {
        self.prototypes
            .get(id.index())
            .map(|p| p.clone_data())
            .ok_or(RoundError::UnknownComponent(id))
    }

    /// Remove `id`'s record from the current scope for a play, creating a
    /// fresh one on first use. Hand it back with [`RoundContext::put_data`].
    pub fn take_data(&mut self, id: ComponentId) -> Result<Box<dyn ComponentData>, RoundError> {
        match self.current_scope_mut().take(id) {
            Some(data) => Ok(data),
            None => self.fresh_record(id),
        }
    }

    /// A new record for `id` in the current scope. Overrides already written
    /// to an outer record carry over, so an award aimed at a component before
    /// its frame exists still applies inside the frame.
    fn fresh_record(&self, id: ComponentId) -> Result<Box<dyn ComponentData>, RoundError> {
        let mut fresh = self.prototype(id)?;
        if let Some(outer) = self.find_data(id) {
            fresh.base_mut().overrides = outer.base().overrides.clone();
        }
        Ok(fresh)
    }

    pub fn put_data(&mut self, id: ComponentId, data: Box<dyn ComponentData>) {
        self.current_scope_mut().put(id, data);
    }

    /// `id`'s record in the current scope, created on first use.
    pub fn scope_data_mut(
        &mut self,
        id: ComponentId,
    ) -> Result<&mut (dyn ComponentData + 'static), RoundError> {
        if !self.current_scope().contains(id) {
            let fresh = self.fresh_record(id)?;
            self.current_scope_mut().put(id, fresh);
        }
        self.current_scope_mut()
            .get_mut(id)
            .ok_or(RoundError::UnknownComponent(id))
    }

    /// Innermost record of `id`, searching frames outward then the round.
    pub fn find_data(&self, id: ComponentId) -> Option<&dyn ComponentData> {
        self.calls
            .frames()
            .iter()
            .rev()
            .find_map(|f| f.data.get(id))
            .or_else(|| self.data.get(id))
    }

    // -- grids -------------------------------------------------------------

    fn scope_grids(&self) -> &ScopeGrids {
        match self.calls.current_frame() {
            Some(frame) => &frame.grids,
            None => &self.grids,
        }
    }

    /// Version of `kind` visible to the current step: the latest pushed in
    /// this scope, else the one in place when the innermost frame was
    /// entered, else the stack top.
    pub fn visible_index(&self, kind: GridKind) -> Option<StackIndex> {
        let prior: Vec<StackIndex> = self
            .calls
            .frames()
            .iter()
            .filter_map(|f| f.entry_grids.last(kind))
            .collect();
        self.stacks
            .stack(kind)
            .top_ex(self.scope_grids().get(kind), &prior)
    }

    pub fn visible_grid(&self, kind: GridKind) -> Result<(StackIndex, &Grid), RoundError> {
        let index = self
            .visible_index(kind)
            .ok_or(GridError::EmptyStack(kind))?;
        Ok((index, self.stacks.grid_at(kind, index)?))
    }

    /// A writable, empty grid of the game's size.
    pub fn new_grid(&mut self) -> GridId {
        self.stacks.pool.acquire(self.width, self.height)
    }

    /// A writable copy of the visible version of `kind`.
    pub fn fork_visible(&mut self, kind: GridKind) -> Result<GridId, RoundError> {
        let index = self
            .visible_index(kind)
            .ok_or(GridError::EmptyStack(kind))?;
        Ok(self.stacks.fork(kind, index)?)
    }

    pub fn grid_mut(&mut self, id: GridId) -> Result<&mut Grid, RoundError> {
        Ok(self.stacks.pool.get_mut(id)?)
    }

    /// Freeze `grid` as the newest version of `kind`, recording it on the
    /// producer's data and the current scope.
    pub fn push_grid(
        &mut self,
        kind: GridKind,
        grid: GridId,
        producer: ComponentId,
        data: &mut BasicData,
    ) -> Result<StackIndex, RoundError> {
        let index = self.stacks.push(kind, grid, producer, self.step)?;
        match self.calls.current_frame_mut() {
            Some(frame) => frame.grids.push(kind, index),
            None => self.grids.push(kind, index),
        }
        match kind {
            GridKind::Main => data.used_grids.push(index),
            GridKind::Other => data.used_other_grids.push(index),
            GridKind::Side => {}
        }
        Ok(index)
    }

    // -- wins --------------------------------------------------------------

    fn record_win(&mut self, component: ComponentId, coins: Coins, cash: Fixed64, positions: Vec<Position>) -> usize {
        let index = self.results.len();
        self.results.push(WinResult {
            component,
            step: self.step,
            depth: self.calls.depth() as u32,
            coins,
            cash,
            positions,
        });
        self.coin_win = self.coin_win.saturating_add(coins);
        self.cash_win = self.cash_win.saturating_add(cash);
        if let Some(frame) = self.calls.current_frame_mut() {
            frame.coin_win = frame.coin_win.saturating_add(coins);
            frame.cash_win = frame.cash_win.saturating_add(cash);
        }
        index
    }

    /// Pay `coins` to the playing component.
    pub fn add_win(
        &mut self,
        component: ComponentId,
        data: &mut BasicData,
        coins: Coins,
        positions: Vec<Position>,
    ) -> usize {
        let cash = coins_to_cash(coins, self.stake.cash_per_coin);
        let index = self.record_win(component, coins, cash, positions);
        data::add_win(data, coins, cash);
        data.used_results.push(index);
        index
    }

    /// Pay an award on behalf of `source`, whose record sits in the scope.
    pub fn award_win(&mut self, source: ComponentId, coins: Coins, cash: Fixed64) -> Result<(), RoundError> {
        let index = self.record_win(source, coins, cash, Vec::new());
        let base = self.scope_data_mut(source)?.base_mut();
        data::add_win(base, coins, cash);
        base.used_results.push(index);
        Ok(())
    }

    // -- awards and control flow -------------------------------------------

    pub fn queue_awards(&mut self, source: ComponentId, awards: &[Award]) {
        self.pending_awards
            .extend(awards.iter().cloned().map(|a| (source, a)));
    }

    pub fn take_pending_awards(&mut self) -> Vec<(ComponentId, Award)> {
        std::mem::take(&mut self.pending_awards)
    }

    /// Extend an active frame of `respin`, or schedule entering one after
    /// the current step. At most one entry is pending per step.
    pub fn grant_respin(&mut self, respin: ComponentId, iterations: u32) -> Result<(), RoundError> {
        if self.calls.extend(respin, iterations) {
            debug!("respin {} extended by {iterations}", respin.0);
            return Ok(());
        }
        match &mut self.pending_entry {
            Some(entry) if entry.respin == respin => {
                entry.iterations = entry.iterations.saturating_add(iterations);
            }
            Some(entry) => {
                return Err(RoundError::ConflictingRespins {
                    pending: entry.respin,
                    requested: respin,
                });
            }
            None if iterations == 0 => {
                debug!("respin {} granted zero iterations; not entered", respin.0);
            }
            None => self.pending_entry = Some(FrameEntry { respin, iterations }),
        }
        Ok(())
    }

    pub fn take_pending_entry(&mut self) -> Option<FrameEntry> {
        self.pending_entry.take()
    }

    pub fn set_jump(&mut self, component: ComponentId, target: ComponentId) {
        self.jumps.insert(component, target);
    }

    /// Consume a jump registered for `component`.
    pub fn take_jump(&mut self, component: ComponentId) -> Option<ComponentId> {
        self.jumps.remove(&component)
    }

    pub(crate) fn enter_frame(
        &mut self,
        respin: ComponentId,
        iterations: u32,
        first: ComponentId,
        return_to: Option<ComponentId>,
    ) {
        let mut entry_grids = ScopeGrids::default();
        for kind in GRID_KINDS {
            if let Some(index) = self.visible_index(kind) {
                entry_grids.push(kind, index);
            }
        }
        self.calls
            .enter(respin, iterations, first, return_to, entry_grids, self.prototypes.len());
        debug!(
            "enter respin {} x{iterations} at depth {}",
            respin.0,
            self.calls.depth()
        );
    }

    /// Pop the active frame and credit its wins to the respin component's
    /// record in the enclosing scope.
    pub(crate) fn exit_frame(&mut self) -> Result<FrameSummary, RoundError> {
        let (summary, _frame) = self.calls.exit().ok_or(RoundError::NoActiveFrame)?;
        let base = self.scope_data_mut(summary.respin)?.base_mut();
        base.total_coin_win = base.total_coin_win.saturating_add(summary.coin_win);
        base.total_cash_win = base.total_cash_win.saturating_add(summary.cash_win);
        debug!(
            "exit respin {} after {} iterations, won {} coins",
            summary.respin.0, summary.iterations, summary.coin_win
        );
        Ok(summary)
    }

    pub(crate) fn tick_frame(&mut self) -> Result<bool, RoundError> {
        self.calls.tick().ok_or(RoundError::NoActiveFrame)
    }

    // -- commands ----------------------------------------------------------

    pub(crate) fn accept_command(&mut self, component: ComponentId, command: &str) {
        self.commands.push(self.step, component, command);
        self.command = Some(command.to_string());
    }

    /// The player's pending decision, consumed by the component that asked.
    pub fn take_command(&mut self) -> Option<String> {
        self.command.take()
    }

    // -- hashing -----------------------------------------------------------

    /// Hash of the visible round state.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u32(self.step);
        for kind in GRID_KINDS {
            h.write_u32(self.stacks.stack(kind).len() as u32);
            match self.stacks.top_grid(kind) {
                Some(grid) => {
                    h.write_u32(1);
                    h.write_grid(grid);
                }
                None => h.write_u32(0),
            }
        }
        self.values.hash_into(&mut h);
        h.write_i64(self.coin_win);
        h.write_fixed64(self.cash_win);
        h.write_u32(self.calls.depth() as u32);
        for frame in self.calls.frames() {
            h.write_u32(frame.respin.0);
            h.write_u32(frame.remaining);
        }
        h.finish()
    }

    pub(crate) fn record_hash(&mut self) {
        let hash = self.state_hash();
        trace!("step {} hash {hash:016x}", self.step);
        self.hashes.push(hash);
    }

    // -- persistence -------------------------------------------------------

    /// Persist every data record of the round and its active frames.
    pub fn persist_data(&self) -> Result<Vec<u8>, SerializeError> {
        fn scope(s: &DataScope) -> Result<PersistedScope, SerializeError> {
            s.iter()
                .map(|(id, d)| Ok((id.0, d.to_persisted()?)))
                .collect()
        }
        let snapshot = DataSnapshot {
            header: SnapshotHeader::new(self.step),
            round: scope(&self.data)?,
            frames: self
                .calls
                .frames()
                .iter()
                .map(|f| scope(&f.data))
                .collect::<Result<_, _>>()?,
        };
        snapshot.to_bytes()
    }

    /// Replace the round's data records with a persisted snapshot. The
    /// call stack must have the depth the snapshot was taken at. Nothing is
    /// replaced unless every record loads.
    pub fn restore_data(&mut self, bytes: &[u8], migrations: &MigrationRegistry) -> Result<(), DeserializeError> {
        let snapshot = DataSnapshot::from_bytes(bytes)?;
        if snapshot.frames.len() != self.calls.depth() {
            return Err(DeserializeError::FrameMismatch {
                snapshot: snapshot.frames.len(),
                round: self.calls.depth(),
            });
        }
        let round = self.load_scope(&snapshot.round, migrations)?;
        let frames = snapshot
            .frames
            .iter()
            .map(|s| self.load_scope(s, migrations))
            .collect::<Result<Vec<_>, _>>()?;

        self.data = round;
        for (frame, scope) in self.calls.frames_mut().iter_mut().zip(frames) {
            frame.data = scope;
        }
        Ok(())
    }

    fn load_scope(&self, records: &PersistedScope, migrations: &MigrationRegistry) -> Result<DataScope, DeserializeError> {
        let mut scope = DataScope::new(self.prototypes.len());
        for (index, record) in records {
            let proto = self
                .prototypes
                .get(*index as usize)
                .ok_or(DeserializeError::UnknownComponent(*index))?;
            let mut data = proto.clone_data();
            data.load_persisted(record, migrations)?;
            scope.put(ComponentId(*index), data);
        }
        Ok(scope)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OverrideValue, set_override};
    use crate::test_utils::empty_round;

    fn c(i: u32) -> ComponentId {
        ComponentId(i)
    }

    // -----------------------------------------------------------------------
    // Test 1: first use creates a fresh record from the prototype
    // -----------------------------------------------------------------------
    #[test]
    fn take_data_creates_then_reuses() {
        let mut round = empty_round(2);
        let mut data = round.take_data(c(0)).unwrap();
        data.base_mut().play_count = 4;
        round.put_data(c(0), data);
        assert_eq!(round.take_data(c(0)).unwrap().base().play_count, 4);
        assert!(matches!(
            round.take_data(c(7)),
            Err(RoundError::UnknownComponent(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 2: frames get their own namespace; reads fall back outward
    // -----------------------------------------------------------------------
    #[test]
    fn frame_scope_isolated_with_read_fallback() {
        let mut round = empty_round(3);
        round.scope_data_mut(c(1)).unwrap().base_mut().play_count = 9;

        round.enter_frame(c(2), 2, c(0), None);
        // Visible through the fallback...
        assert_eq!(round.find_data(c(1)).unwrap().base().play_count, 9);
        // ...but a play in the frame starts fresh.
        let mut inner = round.take_data(c(1)).unwrap();
        assert_eq!(inner.base().play_count, 0);
        inner.base_mut().play_count = 1;
        round.put_data(c(1), inner);
        assert_eq!(round.find_data(c(1)).unwrap().base().play_count, 1);

        round.exit_frame().unwrap();
        assert_eq!(round.find_data(c(1)).unwrap().base().play_count, 9);
    }

    // -----------------------------------------------------------------------
    // Test 3: frame wins reach the round totals and the respin's record
    // -----------------------------------------------------------------------
    #[test]
    fn frame_wins_merge_on_exit() {
        let mut round = empty_round(3);
        round.enter_frame(c(2), 1, c(0), Some(c(1)));
        let mut data = BasicData::default();
        round.add_win(c(0), &mut data, 8, vec![]);
        assert_eq!(round.calls().current_frame().unwrap().coin_win, 8);

        let summary = round.exit_frame().unwrap();
        assert_eq!(summary.coin_win, 8);
        assert_eq!(summary.return_to, Some(c(1)));
        assert_eq!(round.coin_win(), 8);
        assert_eq!(round.results()[0].depth, 1);
        assert_eq!(round.find_data(c(2)).unwrap().base().total_coin_win, 8);
    }

    // -----------------------------------------------------------------------
    // Test 4: visible grid inside a fresh frame is the pre-respin grid
    // -----------------------------------------------------------------------
    #[test]
    fn visible_grid_follows_scope() {
        let mut round = empty_round(2);
        let mut data = BasicData::default();

        let g0 = round.new_grid();
        let i0 = round.push_grid(GridKind::Main, g0, c(0), &mut data).unwrap();
        assert_eq!(round.visible_index(GridKind::Main), Some(i0));

        round.enter_frame(c(1), 1, c(0), None);
        assert_eq!(round.visible_index(GridKind::Main), Some(i0));
        let g1 = round.fork_visible(GridKind::Main).unwrap();
        let i1 = round.push_grid(GridKind::Main, g1, c(0), &mut data).unwrap();
        assert_eq!(round.visible_index(GridKind::Main), Some(i1));
        assert_eq!(data.used_grids, vec![i0, i1]);

        round.exit_frame().unwrap();
        // The outer scope keeps seeing its own latest version.
        assert_eq!(round.visible_index(GridKind::Main), Some(i0));
        assert!(matches!(
            round.visible_grid(GridKind::Other),
            Err(RoundError::Grid(GridError::EmptyStack(GridKind::Other)))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 5: grants extend an active frame
    // -----------------------------------------------------------------------
    #[test]
    fn grant_extends_active_frame() {
        let mut round = empty_round(3);
        round.enter_frame(c(2), 1, c(0), None);
        round.grant_respin(c(2), 2).unwrap();
        assert!(round.take_pending_entry().is_none());
        assert_eq!(round.calls().current_frame().unwrap().remaining, 3);

        round.grant_respin(c(1), 0).unwrap();
        assert!(round.take_pending_entry().is_none());
    }

    // -----------------------------------------------------------------------
    // Test 6: persisted data restores into a fresh round
    // -----------------------------------------------------------------------
    #[test]
    fn persist_and_restore_data() {
        let mut round = empty_round(2);
        {
            let base = round.scope_data_mut(c(1)).unwrap().base_mut();
            base.play_count = 5;
            set_override(base, "reels", OverrideValue::Str("bonus".into()));
        }
        let bytes = round.persist_data().unwrap();

        let mut other = empty_round(2);
        other
            .restore_data(&bytes, &MigrationRegistry::with_builtins())
            .unwrap();
        let restored = other.find_data(c(1)).unwrap().base();
        assert_eq!(restored.play_count, 5);
        assert_eq!(
            restored.overrides.get("reels"),
            Some(&OverrideValue::Str("bonus".into()))
        );

        // Depth must match.
        other.enter_frame(c(0), 1, c(1), None);
        assert!(matches!(
            other.restore_data(&bytes, &MigrationRegistry::new()),
            Err(DeserializeError::FrameMismatch { snapshot: 0, round: 1 })
        ));
    }

    // -----------------------------------------------------------------------
    // Test 7: reset clears round state and recycles grids
    // -----------------------------------------------------------------------
    #[test]
    fn reset_clears_everything() {
        let mut round = empty_round(2);
        let mut data = BasicData::default();
        let g = round.new_grid();
        round.push_grid(GridKind::Main, g, c(0), &mut data).unwrap();
        round.add_win(c(0), &mut data, 3, vec![]);
        round.values.set("x", 1);

        round.reset(
            Box::new(crate::rng::LiveRandom::new(1)),
            Stake::new(1, Fixed64::ONE),
        );
        assert_eq!(round.coin_win(), 0);
        assert!(round.results().is_empty());
        assert!(round.values.is_empty());
        assert!(round.stacks().stack(GridKind::Main).is_empty());
        assert_eq!(round.stacks().pool.free_len(), 1);
        assert_eq!(round.state(), RoundState::Fresh);
    }

    // -----------------------------------------------------------------------
    // Test 8: hash tracks visible state
    // -----------------------------------------------------------------------
    #[test]
    fn state_hash_changes_with_values() {
        let mut round = empty_round(1);
        let before = round.state_hash();
        round.values.set("x", 1);
        assert_ne!(before, round.state_hash());
    }

    // -----------------------------------------------------------------------
    // Test 9: a record first created in a frame keeps outer overrides only
    // -----------------------------------------------------------------------
    #[test]
    fn frame_record_inherits_overrides() {
        let mut round = empty_round(3);
        let outer = round.scope_data_mut(c(1)).unwrap();
        outer.base_mut().play_count = 5;
        set_override(outer.base_mut(), "multiplier", OverrideValue::Int(10));

        round.enter_frame(c(2), 1, c(0), None);
        let inner = round.take_data(c(1)).unwrap();
        assert_eq!(inner.base().play_count, 0);
        assert_eq!(
            inner.base().overrides.get("multiplier"),
            Some(&OverrideValue::Int(10))
        );
        round.put_data(c(1), inner);

        // Overrides written inside the frame stay there.
        set_override(
            round.scope_data_mut(c(0)).unwrap().base_mut(),
            "reels",
            OverrideValue::Str("bonus".into()),
        );
        round.exit_frame().unwrap();
        assert!(round.find_data(c(0)).is_none());
        assert_eq!(round.find_data(c(1)).unwrap().base().play_count, 5);
    }
}
