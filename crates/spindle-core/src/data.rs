//! Per-component mutable data.
//!
//! Every component owns one data record per round (plus one per call-stack
//! frame it plays in). Records share a [`BasicData`] base by composition and
//! expose it through the [`ComponentData`] trait; the helpers at the bottom
//! of the base section are free functions over that shared shape.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixed::{Coins, Fixed64};
use crate::grid::Position;
use crate::id::{ComponentId, StackIndex};
use crate::migration::{MigrationError, MigrationRegistry};
use crate::serialize::{DeserializeError, PersistedData, SerializeError};

/// Kind tag of [`BasicData`] records.
pub const BASIC_KIND: &str = "basic";

/// Current persisted version of [`BasicData`].
pub const BASIC_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// OverrideValue
// ---------------------------------------------------------------------------

/// A value an award writes over a component's static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for OverrideValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideValue::Int(v) => write!(f, "{v}"),
            OverrideValue::Str(v) => write!(f, "{v}"),
        }
    }
}

// ---------------------------------------------------------------------------
// BasicData
// ---------------------------------------------------------------------------

/// State every component carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicData {
    /// Main-stack versions pushed during the current step.
    pub used_grids: Vec<StackIndex>,
    /// Other-stack versions pushed during the current step.
    pub used_other_grids: Vec<StackIndex>,
    /// Indices into the round's result list added during the current step.
    pub used_results: Vec<usize>,
    /// Cells the current step acted on.
    pub positions: Vec<Position>,
    pub coin_win: Coins,
    pub cash_win: Fixed64,

    pub total_coin_win: Coins,
    pub total_cash_win: Fixed64,
    pub play_count: u32,

    /// Award-written overrides of static parameters. Survive step resets.
    pub overrides: BTreeMap<String, OverrideValue>,
}

impl BasicData {
    /// Clear the step-scoped fields, keeping allocations.
    pub fn on_new_step(&mut self) {
        self.used_grids.clear();
        self.used_other_grids.clear();
        self.used_results.clear();
        self.positions.clear();
        self.coin_win = 0;
        self.cash_win = Fixed64::ZERO;
    }
}

/// Record a win on the data's step and running totals.
pub fn add_win(base: &mut BasicData, coins: Coins, cash: Fixed64) {
    base.coin_win = base.coin_win.saturating_add(coins);
    base.cash_win = base.cash_win.saturating_add(cash);
    base.total_coin_win = base.total_coin_win.saturating_add(coins);
    base.total_cash_win = base.total_cash_win.saturating_add(cash);
}

/// Integer override for `key`, falling back to `default`.
pub fn override_int(base: &BasicData, key: &str, default: i64) -> i64 {
    match base.overrides.get(key) {
        Some(OverrideValue::Int(v)) => *v,
        _ => default,
    }
}

/// String override for `key`, if any.
pub fn override_str<'a>(base: &'a BasicData, key: &str) -> Option<&'a str> {
    match base.overrides.get(key) {
        Some(OverrideValue::Str(v)) => Some(v),
        _ => None,
    }
}

pub fn set_override(base: &mut BasicData, key: &str, value: OverrideValue) {
    base.overrides.insert(key.to_string(), value);
}

// ---------------------------------------------------------------------------
// Persisted shape of BasicData
// ---------------------------------------------------------------------------

/// Version 1 layout: no play counter, no overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BasicRecordV1 {
    pub used_grids: Vec<StackIndex>,
    pub used_other_grids: Vec<StackIndex>,
    pub used_results: Vec<u32>,
    pub positions: Vec<Position>,
    pub coin_win: i64,
    pub cash_win_bits: i64,
    pub total_coin_win: i64,
    pub total_cash_win_bits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BasicRecord {
    pub used_grids: Vec<StackIndex>,
    pub used_other_grids: Vec<StackIndex>,
    pub used_results: Vec<u32>,
    pub positions: Vec<Position>,
    pub coin_win: i64,
    pub cash_win_bits: i64,
    pub total_coin_win: i64,
    pub total_cash_win_bits: i64,
    pub play_count: u32,
    pub overrides: Vec<(String, OverrideValue)>,
}

impl From<&BasicData> for BasicRecord {
    fn from(d: &BasicData) -> Self {
        Self {
            used_grids: d.used_grids.clone(),
            used_other_grids: d.used_other_grids.clone(),
            used_results: d.used_results.iter().map(|&i| i as u32).collect(),
            positions: d.positions.clone(),
            coin_win: d.coin_win,
            cash_win_bits: d.cash_win.to_bits(),
            total_coin_win: d.total_coin_win,
            total_cash_win_bits: d.total_cash_win.to_bits(),
            play_count: d.play_count,
            overrides: d
                .overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<BasicRecord> for BasicData {
    fn from(r: BasicRecord) -> Self {
        Self {
            used_grids: r.used_grids,
            used_other_grids: r.used_other_grids,
            used_results: r.used_results.into_iter().map(|i| i as usize).collect(),
            positions: r.positions,
            coin_win: r.coin_win,
            cash_win: Fixed64::from_bits(r.cash_win_bits),
            total_coin_win: r.total_coin_win,
            total_cash_win: Fixed64::from_bits(r.total_cash_win_bits),
            play_count: r.play_count,
            overrides: r.overrides.into_iter().collect(),
        }
    }
}

/// Upgrade a version-1 basic record to version 2.
pub fn migrate_basic_v1(data: &[u8]) -> Result<Vec<u8>, MigrationError> {
    let failed = |reason: String| MigrationError::MigrationFailed {
        from: 1,
        to: 2,
        reason,
    };
    let old: BasicRecordV1 = bitcode::deserialize(data).map_err(|e| failed(e.to_string()))?;
    let new = BasicRecord {
        used_grids: old.used_grids,
        used_other_grids: old.used_other_grids,
        used_results: old.used_results,
        positions: old.positions,
        coin_win: old.coin_win,
        cash_win_bits: old.cash_win_bits,
        total_coin_win: old.total_coin_win,
        total_cash_win_bits: old.total_cash_win_bits,
        play_count: 0,
        overrides: Vec::new(),
    };
    bitcode::serialize(&new).map_err(|e| failed(e.to_string()))
}

// ---------------------------------------------------------------------------
// ComponentData trait
// ---------------------------------------------------------------------------

/// Mutable per-round state of one component.
///
/// Implementations embed a [`BasicData`] and add their own fields. Records
/// are deep-cloned through [`ComponentData::clone_data`]; no field may be
/// shared between a record and its clone.
pub trait ComponentData: fmt::Debug + Send + Sync {
    fn base(&self) -> &BasicData;

    fn base_mut(&mut self) -> &mut BasicData;

    /// Reset step-scoped state. Called by the orchestrator before each play.
    fn on_new_step(&mut self) {
        self.base_mut().on_new_step();
    }

    fn clone_data(&self) -> Box<dyn ComponentData>;

    /// Stable tag of the persisted form.
    fn kind(&self) -> &'static str;

    fn to_persisted(&self) -> Result<PersistedData, SerializeError>;

    fn load_persisted(
        &mut self,
        data: &PersistedData,
        migrations: &MigrationRegistry,
    ) -> Result<(), DeserializeError>;

    /// Downcast to `&dyn Any` for type-safe access to concrete data types.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to `&mut dyn Any` for type-safe mutable access to concrete data types.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn ComponentData> {
    fn clone(&self) -> Self {
        self.clone_data()
    }
}

impl ComponentData for BasicData {
    fn base(&self) -> &BasicData {
        self
    }

    fn base_mut(&mut self) -> &mut BasicData {
        self
    }

    fn clone_data(&self) -> Box<dyn ComponentData> {
        Box::new(self.clone())
    }

    fn kind(&self) -> &'static str {
        BASIC_KIND
    }

    fn to_persisted(&self) -> Result<PersistedData, SerializeError> {
        PersistedData::encode(BASIC_KIND, BASIC_VERSION, &BasicRecord::from(self))
    }

    fn load_persisted(
        &mut self,
        data: &PersistedData,
        migrations: &MigrationRegistry,
    ) -> Result<(), DeserializeError> {
        let record: BasicRecord = data.decode(BASIC_KIND, BASIC_VERSION, migrations)?;
        *self = record.into();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Downcast a record to its concrete type.
pub fn downcast_mut<T: 'static>(data: &mut dyn ComponentData) -> Option<&mut T> {
    data.as_any_mut().downcast_mut::<T>()
}

pub fn downcast_ref<T: 'static>(data: &dyn ComponentData) -> Option<&T> {
    data.as_any().downcast_ref::<T>()
}

// ---------------------------------------------------------------------------
// DataScope
// ---------------------------------------------------------------------------

/// One component-data namespace: the round's, or a call-stack frame's.
/// Slots are indexed by [`ComponentId`].
#[derive(Debug, Clone, Default)]
pub struct DataScope {
    slots: Vec<Option<Box<dyn ComponentData>>>,
}

impl DataScope {
    pub fn new(components: usize) -> Self {
        Self {
            slots: (0..components).map(|_| None).collect(),
        }
    }

    fn ensure(&mut self, id: ComponentId) {
        if id.index() >= self.slots.len() {
            self.slots.resize_with(id.index() + 1, || None);
        }
    }

    pub fn get(&self, id: ComponentId) -> Option<&dyn ComponentData> {
        self.slots.get(id.index())?.as_deref()
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut (dyn ComponentData + 'static)> {
        self.slots.get_mut(id.index())?.as_deref_mut()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.get(id).is_some()
    }

    /// Remove a record, leaving the slot empty.
    pub fn take(&mut self, id: ComponentId) -> Option<Box<dyn ComponentData>> {
        self.slots.get_mut(id.index())?.take()
    }

    pub fn put(&mut self, id: ComponentId, data: Box<dyn ComponentData>) {
        self.ensure(id);
        self.slots[id.index()] = Some(data);
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &dyn ComponentData)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|d| (ComponentId(i as u32), d)))
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
