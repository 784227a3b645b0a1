//! Branch to a component picked by weighted draw.
//!
//! Params: `table` (weight table of component names), optional `no_repeat`
//! (exclude targets already picked in this scope). With every target
//! excluded the step is a no-op.

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

pub const KIND: &str = "weight_branch";

const DATA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightBranchData {
    pub basic: BasicData,
    /// Targets picked so far, oldest first.
    pub history: Vec<ComponentId>,
}

#[derive(Serialize, Deserialize)]
struct WeightBranchRecord {
    base: BasicRecord,
    history: Vec<ComponentId>,
}

impl ComponentData for WeightBranchData {
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
        let record = WeightBranchRecord {
            base: BasicRecord::from(&self.basic),
            history: self.history.clone(),
        };
        PersistedData::encode(KIND, DATA_VERSION, &record)
    }

    fn load_persisted(
        &mut self,
        data: &PersistedData,
        migrations: &MigrationRegistry,
    ) -> Result<(), DeserializeError> {
        let record: WeightBranchRecord = data.decode(KIND, DATA_VERSION, migrations)?;
        self.basic = record.base.into();
        self.history = record.history;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WeightBranch {
    basic: BasicComponent,
    table: WeightTable<ComponentId>,
    no_repeat: bool,
}

impl WeightBranch {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            table: WeightTable::uniform(Vec::new()),
            no_repeat: false,
        }))
    }
}

impl Component for WeightBranch {
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
        let table_name = p.str("table")?;
        let table = env.registry.require_table(p.owner(), table_name)?;
        let mut targets = Vec::with_capacity(table.len());
        for value in table.values() {
            let name = value
                .as_str()
                .ok_or_else(|| p.invalid("table", "a table of component names"))?;
            targets.push(env.component_id(p.owner(), name)?);
        }
        self.table = WeightTable::new(targets, table.weights().to_vec()).map_err(|source| {
            ConfigError::Table {
                name: table_name.to_string(),
                source,
            }
        })?;
        self.no_repeat = p.bool_or("no_repeat", false)?;
        Ok(())
    }

    fn new_data(&self) -> Box<dyn ComponentData> {
        Box::new(WeightBranchData::default())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let data = typed_data::<WeightBranchData>(self.name(), data)?;
        let table = if self.no_repeat {
            self.table.exclude_values(&data.history)
        } else {
            self.table.clone()
        };
        if table.total_weight() == 0 {
            return Ok(Step::NoOp);
        }
        let target = *table.draw_random(round.random())?;
        data.history.push(target);
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::To(target)))
    }

    fn successors(&self) -> Vec<ComponentId> {
        self.default_next()
            .into_iter()
            .chain(self.table.values().iter().copied())
            .collect()
    }
}
