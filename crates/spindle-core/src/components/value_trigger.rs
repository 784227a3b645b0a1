//! Branch on a round value.
//!
//! Params: `key`, `op` (`eq ne lt le gt ge`), `value`, optional `then` /
//! `else`. A missing key reads as 0. Awards fire when the comparison holds.

use crate::component::{BasicComponent, Component, LoadEnv, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::ComponentData;
use crate::id::ComponentId;
use crate::round::{RoundContext, RoundError};

pub const KIND: &str = "value_trigger";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Compare {
    pub fn parse(op: &str) -> Option<Self> {
        Some(match op {
            "eq" => Compare::Eq,
            "ne" => Compare::Ne,
            "lt" => Compare::Lt,
            "le" => Compare::Le,
            "gt" => Compare::Gt,
            "ge" => Compare::Ge,
            _ => return None,
        })
    }

    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Compare::Eq => lhs == rhs,
            Compare::Ne => lhs != rhs,
            Compare::Lt => lhs < rhs,
            Compare::Le => lhs <= rhs,
            Compare::Gt => lhs > rhs,
            Compare::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueTrigger {
    basic: BasicComponent,
    key: String,
    op: Compare,
    value: i64,
    then: Option<ComponentId>,
    otherwise: Option<ComponentId>,
}

impl ValueTrigger {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            key: String::new(),
            op: Compare::Eq,
            value: 0,
            then: None,
            otherwise: None,
        }))
    }
}

impl Component for ValueTrigger {
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
        self.key = p.str("key")?.to_string();
        self.op = Compare::parse(p.str("op")?)
            .ok_or_else(|| p.invalid("op", "one of eq, ne, lt, le, gt, ge"))?;
        self.value = p.int("value")?;
        self.then = self.basic.successor_param(env, "then")?;
        self.otherwise = self.basic.successor_param(env, "else")?;
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, _data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        if !self.op.holds(round.values.get_or_zero(&self.key), self.value) {
            return Ok(BasicComponent::branch(self.otherwise));
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Next;
    use crate::config::GameConfig;
    use crate::test_utils::*;

    fn game(op: &str) -> GameConfig {
        GameConfig::new("values", 5, 3, "check")
            .with_component(
                ComponentConfig::new("check", "value_trigger")
                    .with_param("key", s("level"))
                    .with_param("op", s(op))
                    .with_param("value", int(3))
                    .with_param("then", s("high"))
                    .with_param("else", s("low")),
            )
            .with_component(
                ComponentConfig::new("high", "value_trigger")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", int(0)),
            )
            .with_component(
                ComponentConfig::new("low", "value_trigger")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", int(0)),
            )
    }

    #[test]
    fn compare_ops() {
        assert!(Compare::Ge.holds(3, 3));
        assert!(!Compare::Gt.holds(3, 3));
        assert!(Compare::Ne.holds(1, 3));
        assert!(Compare::Le.holds(-1, 3));
        assert_eq!(Compare::parse("between"), None);
    }

    #[test]
    fn branches_on_round_value() {
        let t = build_template(&game("ge"));
        let high = t.id_of("high").unwrap();
        let low = t.id_of("low").unwrap();

        let mut round = test_round(&t, 0);
        assert_eq!(play_once(&t, &mut round, "check").unwrap(), Step::Advance(Next::To(low)));
        round.values.set("level", 5);
        assert_eq!(play_once(&t, &mut round, "check").unwrap(), Step::Advance(Next::To(high)));
    }

    #[test]
    fn unknown_op_rejected() {
        let err = crate::template::GameTemplate::build(
            &game("between"),
            test_registry(),
            &crate::factory::ComponentFactories::with_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParam { .. }));
    }
}
