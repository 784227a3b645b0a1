//! Replace target symbols on the visible grid through a weighted draw.
//!
//! Params: `targets` (symbols to replace), `table` (weight table of symbol
//! names), optional `mode`: `once` draws one symbol for every target cell,
//! `per_cell` draws for each cell.

use crate::component::{BasicComponent, Component, LoadEnv, Next, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::ComponentData;
use crate::grid::GridKind;
use crate::id::SymbolCode;
use crate::round::{RoundContext, RoundError};
use crate::weights::WeightTable;

pub const KIND: &str = "replace_symbols";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Once,
    PerCell,
}

#[derive(Debug, Clone)]
pub struct ReplaceSymbols {
    basic: BasicComponent,
    targets: Vec<SymbolCode>,
    table: WeightTable<SymbolCode>,
    mode: Mode,
}

impl ReplaceSymbols {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            targets: Vec::new(),
            table: WeightTable::uniform(Vec::new()),
            mode: Mode::Once,
        }))
    }
}

impl Component for ReplaceSymbols {
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
        self.targets = env.registry.require_symbols(p.owner(), &p.str_list("targets")?)?;
        self.table = env.registry.require_symbol_table(p.owner(), p.str("table")?)?;
        if self.table.total_weight() == 0 {
            return Err(ConfigError::InvalidRange {
                owner: p.owner().to_string(),
                reason: "replacement table has zero total weight".into(),
            });
        }
        self.mode = match p.opt_str("mode")?.unwrap_or("once") {
            "once" => Mode::Once,
            "per_cell" => Mode::PerCell,
            _ => return Err(p.invalid("mode", "`once` or `per_cell`")),
        };
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let positions = {
            let (_, grid) = round.visible_grid(GridKind::Main)?;
            grid.positions_of(&self.targets)
        };
        if positions.is_empty() {
            return Ok(Step::NoOp);
        }

        let replacements: Vec<SymbolCode> = match self.mode {
            Mode::Once => {
                let symbol = *self.table.draw_random(round.random())?;
                vec![symbol; positions.len()]
            }
            Mode::PerCell => positions
                .iter()
                .map(|_| self.table.draw_random(round.random()).copied())
                .collect::<Result<_, _>>()?,
        };

        let id = round.fork_visible(GridKind::Main)?;
        let grid = round.grid_mut(id)?;
        for (pos, &symbol) in positions.iter().zip(&replacements) {
            grid.set(pos.x as usize, pos.y as usize, symbol)?;
        }

        let base = data.base_mut();
        round.push_grid(GridKind::Main, id, self.basic.id, base)?;
        base.positions = positions;
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::Default))
    }
}
