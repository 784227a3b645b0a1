//! Weighted collector.
//!
//! Each play draws an increment from `table` (weight table of integers),
//! restricted to the increments that keep the level within `cap`. Reaching
//! `cap` fills the collector: awards fire and the round branches to
//! `on_full` when set. A full collector, or one with no eligible increment,
//! is a no-op.
//!
//! Params: `table`, `cap`, optional `value_key` (mirror the level into the
//! round values), optional `on_full`.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::component::{BasicComponent, Component, LoadEnv, Next, Step};
use crate::components::typed_data;
use crate::config::{ComponentConfig, ConfigError};
use crate::data::{BasicData, BasicRecord, ComponentData};
use crate::id::ComponentId;
use crate::migration::MigrationRegistry;
use crate::round::{RoundContext, RoundError};
use crate::serialize::{DeserializeError, PersistedData, SerializeError};
use crate::weights::WeightTable;

pub const KIND: &str = "collector";

const DATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorData {
    pub basic: BasicData,
    pub level: i64,
    pub full: bool,
}

#[derive(Serialize, Deserialize)]
struct CollectorRecord {
    base: BasicRecord,
    level: i64,
    full: bool,
}

impl ComponentData for CollectorData {
    fn base(&self) -> &BasicData {
        &self.basic
    }

    fn base_mut(&mut self) -> &mut BasicData {
        &mut self.basic
    }

    fn clone_data(&self) -> Box<dyn ComponentData> {
        Box::new(self.clone())
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn to_persisted(&self) -> Result<PersistedData, SerializeError> {
        let record = CollectorRecord {
            base: BasicRecord::from(&self.basic),
            level: self.level,
            full: self.full,
        };
        PersistedData::encode(KIND, DATA_VERSION, &record)
    }

    fn load_persisted(
        &mut self,
        data: &PersistedData,
        migrations: &MigrationRegistry,
    ) -> Result<(), DeserializeError> {
        let record: CollectorRecord = data.decode(KIND, DATA_VERSION, migrations)?;
        self.basic = record.base.into();
        self.level = record.level;
        self.full = record.full;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct Collector {
    basic: BasicComponent,
    table: WeightTable<i64>,
    cap: i64,
    value_key: Option<String>,
    on_full: Option<ComponentId>,
}

impl Collector {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            table: WeightTable::uniform(Vec::new()),
            cap: 0,
            value_key: None,
            on_full: None,
        }))
    }

    /// Increments that keep `level` within the cap.
    fn eligible(&self, level: i64) -> Vec<i64> {
        self.table
            .values()
            .iter()
            .copied()
            .filter(|&inc| level.saturating_add(inc) <= self.cap)
            .collect()
    }
}

impl Component for Collector {
    fn basic(&self) -> &BasicComponent {
        &self.basic
    }

    fn basic_mut(&mut self) -> &mut BasicComponent {
        &mut self.basic
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn init(&mut self, env: &LoadEnv) -> Result<(), ConfigError> {
        self.basic.init(env)?;
        let p = self.basic.params();
        self.table = env
            .registry
            .require_table(p.owner(), p.str("table")?)?
            .map_values(|v| v.as_int().filter(|&inc| inc > 0))
            .ok_or_else(|| p.invalid("table", "a table of positive integers"))?;
        self.cap = p.int("cap")?;
        if self.cap <= 0 {
            return Err(p.invalid("cap", "a positive integer"));
        }
        self.value_key = p.opt_str("value_key")?.map(str::to_string);
        self.on_full = self.basic.successor_param(env, "on_full")?;
        Ok(())
    }

    fn new_data(&self) -> Box<dyn ComponentData> {
        Box::new(CollectorData::default())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let data = typed_data::<CollectorData>(self.name(), data)?;
        if data.full {
            return Ok(Step::NoOp);
        }
        let table = self.table.intersect_values(&self.eligible(data.level));
        if table.total_weight() == 0 {
            return Ok(Step::NoOp);
        }
        let inc = *table.draw_random(round.random())?;
        data.level += inc;
        if let Some(key) = &self.value_key {
            round.values.set(key, data.level);
        }
        if data.level < self.cap {
            return Ok(Step::Advance(Next::Default));
        }
        data.full = true;
        self.basic.fire_awards(round);
        Ok(BasicComponent::branch(self.on_full))
    }

    fn successors(&self) -> Vec<ComponentId> {
        self.default_next().into_iter().chain(self.on_full).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AwardConfig, GameConfig};
    use crate::data::downcast_ref;
    use crate::test_utils::*;

    fn game() -> GameConfig {
        GameConfig::new("collect", 5, 3, "meter")
            .with_component(
                ComponentConfig::new("meter", "collector")
                    .with_param("table", s("coins"))
                    .with_param("cap", int(6))
                    .with_param("value_key", s("meter"))
                    .with_param("on_full", s("bonus"))
                    .with_award(AwardConfig::new("add_coins").with_param("coins", int(50))),
            )
            .with_component(
                ComponentConfig::new("bonus", "value_trigger")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", int(0)),
            )
    }

    fn level(round: &RoundContext, t: &crate::template::GameTemplate) -> i64 {
        let data = round.find_data(t.id_of("meter").unwrap()).unwrap();
        downcast_ref::<CollectorData>(data).unwrap().level
    }

    #[test]
    fn fills_then_branches() {
        let t = build_template(&game());
        // coins table: 1 (w5), 2 (w3), 5 (w1); total 9.
        // 8 -> 5 (level 5), then only 1 fits: no draw (level 6, full).
        let mut round = t.new_round(Box::new(SequenceRandom::new(vec![8])), stake());

        assert_eq!(play_once(&t, &mut round, "meter").unwrap(), Step::Advance(Next::Default));
        assert_eq!(level(&round, &t), 5);
        assert_eq!(round.values.get("meter"), Some(5));

        let bonus = t.id_of("bonus").unwrap();
        assert_eq!(play_once(&t, &mut round, "meter").unwrap(), Step::Advance(Next::To(bonus)));
        assert_eq!(level(&round, &t), 6);
        assert_eq!(round.draws().len(), 1);

        crate::award::evaluate_pending(&mut round).unwrap();
        assert_eq!(round.coin_win(), 50);

        assert_eq!(play_once(&t, &mut round, "meter").unwrap(), Step::NoOp);
    }

    #[test]
    fn increments_restricted_to_cap() {
        let c = Collector {
            basic: BasicComponent::new(&ComponentConfig::new("c", KIND)),
            table: WeightTable::from_pairs([(1, 5), (2, 3), (5, 1)]).unwrap(),
            cap: 6,
            value_key: None,
            on_full: None,
        };
        assert_eq!(c.eligible(0), vec![1, 2, 5]);
        assert_eq!(c.eligible(4), vec![1, 2]);
        assert!(c.eligible(6).is_empty());
    }
}
