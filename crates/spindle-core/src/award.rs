//! Declarative side effects attached to components.
//!
//! Awards are resolved from [`AwardConfig`] once at load time and evaluated
//! many times. A component queues its awards on the round when its trigger
//! fires; the orchestrator evaluates the queue, strictly in order, right
//! after `play` returns.

use crate::component::LoadEnv;
use crate::config::{AwardConfig, ConfigError, ConfigValue, Params};
use crate::data::{OverrideValue, set_override};
use crate::fixed::{Coins, Fixed64, coins_to_cash, f64_to_fixed64};
use crate::id::ComponentId;
use crate::round::{RoundContext, RoundError};

/// A resolved award.
#[derive(Debug, Clone, PartialEq)]
pub enum Award {
    /// Enter the respin loop of `respin`, or extend its active frame.
    GrantRespin { respin: ComponentId, iterations: u32 },
    /// Pay a fixed number of coins.
    AddCoins(Coins),
    /// Pay a fixed cash amount.
    AddCash(Fixed64),
    SetValue { key: String, value: i64 },
    AddValue { key: String, delta: i64 },
    /// Replace the successor of `component` the next time it resolves one.
    Jump {
        component: ComponentId,
        target: ComponentId,
    },
    /// Write over a static parameter of `component` in the current scope.
    Override {
        component: ComponentId,
        key: String,
        value: OverrideValue,
    },
}

impl Award {
    /// Resolve an award attached to component `owner`.
    pub fn resolve(
        owner: &str,
        owner_id: ComponentId,
        config: &AwardConfig,
        env: &LoadEnv,
    ) -> Result<Award, ConfigError> {
        let label = format!("{owner}/{}", config.kind);
        let p = Params::new(&label, &config.params);
        let component_or_owner = |key: &str| -> Result<ComponentId, ConfigError> {
            match p.opt_str(key)? {
                Some(name) => env.component_id(owner, name),
                None => Ok(owner_id),
            }
        };

        let award = match config.kind.as_str() {
            "respin" => Award::GrantRespin {
                respin: env.component_id(owner, p.str("respin")?)?,
                iterations: p.count("iterations")?,
            },
            "add_coins" => Award::AddCoins(p.int("coins")?),
            "add_cash" => {
                let cash = match p.get("cash") {
                    Some(ConfigValue::Float(v)) => f64_to_fixed64(*v),
                    Some(ConfigValue::Int(v)) => Fixed64::saturating_from_num(*v),
                    Some(_) => return Err(p.invalid("cash", "a number")),
                    None => return Err(p.missing("cash")),
                };
                Award::AddCash(cash)
            }
            "set_value" => Award::SetValue {
                key: p.str("key")?.to_string(),
                value: p.int("value")?,
            },
            "add_value" => Award::AddValue {
                key: p.str("key")?.to_string(),
                delta: p.int("delta")?,
            },
            "jump" => Award::Jump {
                component: component_or_owner("component")?,
                target: env.component_id(owner, p.str("target")?)?,
            },
            "override" => {
                let value = match p.get("value") {
                    Some(ConfigValue::Int(v)) => OverrideValue::Int(*v),
                    Some(ConfigValue::Str(s)) => OverrideValue::Str(s.clone()),
                    Some(_) => return Err(p.invalid("value", "an integer or a string")),
                    None => return Err(p.missing("value")),
                };
                Award::Override {
                    component: component_or_owner("component")?,
                    key: p.str("key")?.to_string(),
                    value,
                }
            }
            other => {
                return Err(ConfigError::UnknownAwardKind {
                    component: owner.to_string(),
                    kind: other.to_string(),
                });
            }
        };
        Ok(award)
    }

    /// Edges this award adds to the component graph.
    pub fn jump_edge(&self) -> Option<(ComponentId, ComponentId)> {
        match self {
            Award::Jump { component, target } => Some((*component, *target)),
            _ => None,
        }
    }
}

/// Apply `awards` from `source`, in order.
pub fn evaluate(source: ComponentId, awards: &[Award], round: &mut RoundContext) -> Result<(), RoundError> {
    for award in awards {
        apply(source, award, round)?;
    }
    Ok(())
}

/// Drain and apply everything queued on the round.
pub fn evaluate_pending(round: &mut RoundContext) -> Result<(), RoundError> {
    let pending = round.take_pending_awards();
    for (source, award) in &pending {
        apply(*source, award, round)?;
    }
    Ok(())
}

fn apply(source: ComponentId, award: &Award, round: &mut RoundContext) -> Result<(), RoundError> {
    log::trace!("award {award:?} from component {}", source.0);
    match award {
        Award::GrantRespin { respin, iterations } => round.grant_respin(*respin, *iterations)?,
        Award::AddCoins(coins) => {
            let cash = coins_to_cash(*coins, round.stake().cash_per_coin);
            round.award_win(source, *coins, cash)?;
        }
        Award::AddCash(cash) => round.award_win(source, 0, *cash)?,
        Award::SetValue { key, value } => round.values.set(key, *value),
        Award::AddValue { key, delta } => {
            round.values.add(key, *delta);
        }
        Award::Jump { component, target } => round.set_jump(*component, *target),
        Award::Override {
            component,
            key,
            value,
        } => {
            let data = round.scope_data_mut(*component)?;
            set_override(data.base_mut(), key, value.clone());
        }
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
