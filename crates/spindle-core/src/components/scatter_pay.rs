//! Pay for a symbol anywhere on the visible grid.
//!
//! Params: `symbol`, `pays` (multiplier of the coin bet indexed by symbol
//! count; counts past the end use the last entry), optional `multiplier`
//! (default 1, overridable).

use crate::component::{BasicComponent, Component, LoadEnv, Next, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::{ComponentData, override_int};
use crate::grid::GridKind;
use crate::id::SymbolCode;
use crate::round::{RoundContext, RoundError};

pub const KIND: &str = "scatter_pay";

#[derive(Debug, Clone)]
pub struct ScatterPay {
    basic: BasicComponent,
    symbol: SymbolCode,
    pays: Vec<i64>,
    multiplier: i64,
}

impl ScatterPay {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            symbol: SymbolCode(0),
            pays: Vec::new(),
            multiplier: 1,
        }))
    }

    fn pay_for(&self, count: usize) -> i64 {
        self.pays
            .get(count)
            .or_else(|| self.pays.last())
            .copied()
            .unwrap_or(0)
    }
}

impl Component for ScatterPay {
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
        self.symbol = env.registry.require_symbol(p.owner(), p.str("symbol")?)?;
        self.pays = p.int_list("pays")?;
        if self.pays.iter().any(|&v| v < 0) {
            return Err(p.invalid("pays", "a list of non-negative integers"));
        }
        self.multiplier = p.opt_int("multiplier")?.unwrap_or(1);
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let positions = {
            let (_, grid) = round.visible_grid(GridKind::Main)?;
            grid.positions_of(&[self.symbol])
        };
        let base = data.base_mut();
        let multiplier = override_int(base, "multiplier", self.multiplier);
        let coins = self
            .pay_for(positions.len())
            .saturating_mul(multiplier)
            .saturating_mul(round.stake().coin_bet);
        if coins <= 0 {
            return Ok(Step::NoOp);
        }
        base.positions = positions.clone();
        round.add_win(self.basic.id, base, coins, positions);
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::Default))
    }
}
