//! Kind name → component constructor.
//!
//! Built once, passed to [`GameTemplate::build`](crate::template::GameTemplate::build)
//! and never mutated afterwards. Games with custom components start from
//! [`ComponentFactories::with_builtins`] and register their own kinds.

use std::collections::BTreeMap;

use crate::component::Component;
use crate::components;
use crate::config::{ComponentConfig, ConfigError};

pub type ComponentCtor = fn(&ComponentConfig) -> Result<Box<dyn Component>, ConfigError>;

#[derive(Debug, Clone, Default)]
pub struct ComponentFactories {
    ctors: BTreeMap<String, ComponentCtor>,
}

impl ComponentFactories {
    /// An empty set. Nothing can be built until kinds are registered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut f = Self::new();
        f.register(components::reels::KIND, components::reels::Reels::create);
        f.register(
            components::replace_symbols::KIND,
            components::replace_symbols::ReplaceSymbols::create,
        );
        f.register(components::scatter_pay::KIND, components::scatter_pay::ScatterPay::create);
        f.register(
            components::symbol_trigger::KIND,
            components::symbol_trigger::SymbolTrigger::create,
        );
        f.register(
            components::value_trigger::KIND,
            components::value_trigger::ValueTrigger::create,
        );
        f.register(
            components::weight_branch::KIND,
            components::weight_branch::WeightBranch::create,
        );
        f.register(components::collector::KIND, components::collector::Collector::create);
        f.register(components::respin::KIND, components::respin::Respin::create);
        f.register(
            components::player_choice::KIND,
            components::player_choice::PlayerChoice::create,
        );
        f
    }

    /// Register `kind`, replacing any previous constructor.
    pub fn register(&mut self, kind: &str, ctor: ComponentCtor) {
        self.ctors.insert(kind.to_string(), ctor);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.ctors.keys().map(String::as_str)
    }

    pub fn create(&self, config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        let ctor = self
            .ctors
            .get(&config.kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                component: config.name.clone(),
                kind: config.kind.clone(),
            })?;
        ctor(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_cover_every_kind() {
        let f = ComponentFactories::with_builtins();
        let kinds: Vec<&str> = f.kinds().collect();
        assert_eq!(kinds.len(), 9);
        for kind in [
            "reels",
            "replace_symbols",
            "scatter_pay",
            "symbol_trigger",
            "value_trigger",
            "weight_branch",
            "collector",
            "respin",
            "player_choice",
        ] {
            assert!(f.contains(kind), "missing {kind}");
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let f = ComponentFactories::new();
        let err = f.create(&ComponentConfig::new("spin", "reels")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownKind {
                component: "spin".into(),
                kind: "reels".into()
            }
        );
    }
}
