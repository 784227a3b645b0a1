//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{AwardConfig, ComponentConfig, ConfigValue, GameConfig};
use crate::data::{BasicData, ComponentData};
use crate::factory::ComponentFactories;
use crate::fixed::Fixed64;
use crate::registry::{Registry, RegistryBuilder};
use crate::rng::{Draw, LiveRandom, RandomSource, RngError};
use crate::round::{RoundContext, Stake};
use crate::template::GameTemplate;
use crate::weights::{TableValue, WeightTable};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Scripted randomness
// ===========================================================================

/// Returns the same value for every draw. Fails when it does not fit.
#[derive(Debug, Clone)]
pub struct FixedRandom {
    value: u64,
    draws: Vec<Draw>,
}

impl FixedRandom {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            draws: Vec::new(),
        }
    }
}

impl RandomSource for FixedRandom {
    fn next(&mut self, n: u64) -> Result<u64, RngError> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        if self.value >= n {
            return Err(RngError::ValueOutOfRange {
                ordinal: self.draws.len(),
                value: self.value,
                range: n,
            });
        }
        self.draws.push(Draw {
            range: n,
            value: self.value,
        });
        Ok(self.value)
    }

    fn draws(&self) -> &[Draw] {
        &self.draws
    }
}

/// Returns the scripted values in order, then fails.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<u64>,
    draws: Vec<Draw>,
}

impl SequenceRandom {
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            draws: Vec::new(),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next(&mut self, n: u64) -> Result<u64, RngError> {
        if n == 0 {
            return Err(RngError::EmptyRange);
        }
        let ordinal = self.draws.len();
        let value = *self
            .values
            .get(ordinal)
            .ok_or(RngError::TraceExhausted(ordinal))?;
        if value >= n {
            return Err(RngError::ValueOutOfRange {
                ordinal,
                value,
                range: n,
            });
        }
        self.draws.push(Draw { range: n, value });
        Ok(value)
    }

    fn draws(&self) -> &[Draw] {
        &self.draws
    }
}

// ===========================================================================
// Rounds
// ===========================================================================

/// One coin staked at half a cash unit per coin.
pub fn stake() -> Stake {
    Stake::new(1, fixed(0.5))
}

/// A 5x3 round over `components` plain components, without a template.
pub fn empty_round(components: usize) -> RoundContext {
    let prototypes: Vec<Box<dyn ComponentData>> = (0..components)
        .map(|_| Box::new(BasicData::default()) as Box<dyn ComponentData>)
        .collect();
    RoundContext::new(
        Arc::new(prototypes),
        5,
        3,
        Box::new(FixedRandom::new(0)),
        stake(),
    )
}

/// A fresh round of `template` with live randomness.
pub fn test_round(template: &GameTemplate, seed: u64) -> RoundContext {
    template.new_round(Box::new(LiveRandom::new(seed)), stake())
}

// ===========================================================================
// Registry
// ===========================================================================

/// Symbols `A B C W S` (codes 0..=4), reel sets `base` and `bonus`, and the
/// tables `upgrade`, `branches` and `coins`.
pub fn test_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    for name in ["A", "B", "C", "W", "S"] {
        b.register_symbol(name);
    }
    let strip = |symbols: &[&str]| symbols.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    b.register_reels(
        "base",
        vec![strip(&["A", "B", "C", "S", "W", "A", "B", "C"]); 5],
    );
    b.register_reels("bonus", vec![strip(&["S", "S", "A", "B"]); 5]);
    b.register_table(
        "upgrade",
        table(&[(TableValue::Str("W".into()), 3), (TableValue::Str("A".into()), 1)]),
    );
    b.register_table(
        "branches",
        table(&[
            (TableValue::Str("left".into()), 1),
            (TableValue::Str("right".into()), 1),
        ]),
    );
    b.register_table(
        "coins",
        table(&[
            (TableValue::Int(1), 5),
            (TableValue::Int(2), 3),
            (TableValue::Int(5), 1),
        ]),
    );
    b.build().expect("test registry is valid")
}

fn table(pairs: &[(TableValue, u64)]) -> WeightTable<TableValue> {
    WeightTable::from_pairs(pairs.iter().cloned()).expect("test table is valid")
}

// ===========================================================================
// Games
// ===========================================================================

pub fn s(v: &str) -> ConfigValue {
    ConfigValue::Str(v.into())
}

pub fn int(v: i64) -> ConfigValue {
    ConfigValue::Int(v)
}

pub fn list(values: &[&str]) -> ConfigValue {
    ConfigValue::List(values.iter().map(|v| s(v)).collect())
}

pub fn int_list(values: &[i64]) -> ConfigValue {
    ConfigValue::List(values.iter().map(|&v| int(v)).collect())
}

pub fn map(pairs: &[(&str, &str)]) -> ConfigValue {
    ConfigValue::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), s(v)))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// `spin` (base reels) then `pay` (scatter pays on `S`).
pub fn simple_game() -> GameConfig {
    GameConfig::new("simple", 5, 3, "spin")
        .with_component(
            ComponentConfig::new("spin", "reels")
                .with_param("reels", s("base"))
                .with_next("pay"),
        )
        .with_component(
            ComponentConfig::new("pay", "scatter_pay")
                .with_param("symbol", s("S"))
                .with_param("pays", int_list(&[0, 0, 0, 5, 20, 100])),
        )
}

/// A base game whose three-scatter trigger enters `free_spins`, a respin of
/// `iterations` rounds of `fs_spin` (bonus reels) then `fs_pay`.
pub fn respin_game(iterations: i64) -> GameConfig {
    GameConfig::new("respin", 5, 3, "spin")
        .with_component(
            ComponentConfig::new("spin", "reels")
                .with_param("reels", s("base"))
                .with_next("pay"),
        )
        .with_component(
            ComponentConfig::new("pay", "scatter_pay")
                .with_param("symbol", s("S"))
                .with_param("pays", int_list(&[0, 0, 0, 5, 20, 100]))
                .with_next("trigger"),
        )
        .with_component(
            ComponentConfig::new("trigger", "symbol_trigger")
                .with_param("symbols", list(&["S"]))
                .with_param("min_count", int(3))
                .with_param("then", s("free_spins"))
                .with_award(
                    AwardConfig::new("add_value")
                        .with_param("key", s("triggers"))
                        .with_param("delta", int(1)),
                ),
        )
        .with_component(
            ComponentConfig::new("free_spins", "respin")
                .with_param("first", s("fs_spin"))
                .with_param("iterations", int(iterations)),
        )
        .with_component(
            ComponentConfig::new("fs_spin", "reels")
                .with_param("reels", s("bonus"))
                .with_next("fs_pay"),
        )
        .with_component(
            ComponentConfig::new("fs_pay", "scatter_pay")
                .with_param("symbol", s("S"))
                .with_param("pays", int_list(&[0, 0, 0, 5, 20, 100])),
        )
}

pub fn build_template(config: &GameConfig) -> GameTemplate {
    GameTemplate::build(config, test_registry(), &ComponentFactories::with_builtins())
        .expect("test game is valid")
}

/// Play the component called `name` once in the round's current scope,
/// outside the runner. Queued awards are left pending.
pub fn play_once(
    template: &GameTemplate,
    round: &mut RoundContext,
    name: &str,
) -> Result<crate::component::Step, crate::round::RoundError> {
    let id = template.id_of(name).expect("component exists");
    let component = template.component(id).expect("component exists");
    let mut data = round.take_data(id)?;
    data.on_new_step();
    let outcome = component.play(round, data.as_mut());
    round.put_data(id, data);
    outcome
}
