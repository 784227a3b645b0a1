//! Branch on how many of a set of symbols are visible.
//!
//! Params: `symbols`, `min_count`, optional `then` / `else` targets. Awards
//! fire when the trigger hits.

use crate::component::{BasicComponent, Component, LoadEnv, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::ComponentData;
use crate::grid::GridKind;
use crate::id::{ComponentId, SymbolCode};
use crate::round::{RoundContext, RoundError};

pub const KIND: &str = "symbol_trigger";

#[derive(Debug, Clone)]
pub struct SymbolTrigger {
    basic: BasicComponent,
    symbols: Vec<SymbolCode>,
    min_count: usize,
    then: Option<ComponentId>,
    otherwise: Option<ComponentId>,
}

impl SymbolTrigger {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            symbols: Vec::new(),
            min_count: 1,
            then: None,
            otherwise: None,
        }))
    }
}

impl Component for SymbolTrigger {
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
        self.symbols = env.registry.require_symbols(p.owner(), &p.str_list("symbols")?)?;
        self.min_count = p.count("min_count")? as usize;
        if self.min_count == 0 {
            return Err(p.invalid("min_count", "a positive integer"));
        }
        self.then = self.basic.successor_param(env, "then")?;
        self.otherwise = self.basic.successor_param(env, "else")?;
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let positions = {
            let (_, grid) = round.visible_grid(GridKind::Main)?;
            grid.positions_of(&self.symbols)
        };
        if positions.len() < self.min_count {
            return Ok(BasicComponent::branch(self.otherwise));
        }
        data.base_mut().positions = positions;
        self.basic.fire_awards(round);
        Ok(BasicComponent::branch(self.then))
    }

    fn successors(&self) -> Vec<ComponentId> {
        self.default_next()
            .into_iter()
            .chain(self.then)
            .chain(self.otherwise)
            .collect()
    }
}
