//! The component trait: one unit of game behavior.
//!
//! A component is built from its [`ComponentConfig`] by a factory, resolves
//! every symbolic reference once in [`Component::init`], and is then
//! immutable. All per-round state lives in its [`ComponentData`] record,
//! which the orchestrator hands to [`Component::play`].

use std::collections::BTreeMap;

use crate::award::Award;
use crate::config::{ComponentConfig, ConfigError, Params};
use crate::data::{BasicData, ComponentData};
use crate::id::ComponentId;
use crate::registry::Registry;
use crate::round::{RoundContext, RoundError};

// ---------------------------------------------------------------------------
// Step outcome
// ---------------------------------------------------------------------------

/// Where the round goes after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The statically configured default successor.
    Default,
    /// A branch target.
    To(ComponentId),
    /// End the round, or the current respin iteration inside a frame.
    End,
}

/// Outcome of [`Component::play`]. Failures are `Err(RoundError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Advance(Next),
    /// Nothing to do. The orchestrator moves to the default successor.
    NoOp,
    /// Pause the round until the player picks one of these options.
    Await(Vec<String>),
}

// ---------------------------------------------------------------------------
// Load environment
// ---------------------------------------------------------------------------

/// Everything a component may consult while resolving its configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoadEnv<'a> {
    pub registry: &'a Registry,
    pub names: &'a BTreeMap<String, ComponentId>,
    pub width: usize,
    pub height: usize,
}

impl LoadEnv<'_> {
    pub fn component_id(&self, owner: &str, name: &str) -> Result<ComponentId, ConfigError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnresolvedComponent {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// BasicComponent
// ---------------------------------------------------------------------------

/// Identity, successor and awards shared by every component.
#[derive(Debug, Clone)]
pub struct BasicComponent {
    pub id: ComponentId,
    pub config: ComponentConfig,
    pub next: Option<ComponentId>,
    pub awards: Vec<Award>,
}

impl BasicComponent {
    pub fn new(config: &ComponentConfig) -> Self {
        Self {
            id: ComponentId(0),
            config: config.clone(),
            next: None,
            awards: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn params(&self) -> Params<'_> {
        self.config.params()
    }

    /// Resolve own id, default successor and awards.
    pub fn init(&mut self, env: &LoadEnv) -> Result<(), ConfigError> {
        self.id = env.component_id(&self.config.name, &self.config.name)?;
        self.next = match &self.config.next {
            Some(next) => Some(env.component_id(&self.config.name, next)?),
            None => None,
        };
        self.awards = self
            .config
            .awards
            .iter()
            .map(|a| Award::resolve(&self.config.name, self.id, a, env))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Resolve an optional parameter naming another component.
    pub fn successor_param(&self, env: &LoadEnv, key: &str) -> Result<Option<ComponentId>, ConfigError> {
        match self.params().opt_str(key)? {
            Some(name) => Ok(Some(env.component_id(self.name(), name)?)),
            None => Ok(None),
        }
    }

    /// Queue the configured awards for evaluation after this step.
    pub fn fire_awards(&self, round: &mut RoundContext) {
        round.queue_awards(self.id, &self.awards);
    }

    /// `Advance(To(target))` when a branch target is configured, else the
    /// default successor.
    pub fn branch(target: Option<ComponentId>) -> Step {
        match target {
            Some(id) => Step::Advance(Next::To(id)),
            None => Step::Advance(Next::Default),
        }
    }
}

// ---------------------------------------------------------------------------
// Component trait
// ---------------------------------------------------------------------------

/// A node of the game graph.
///
/// `play` receives the round and this component's data record for the
/// current scope. Step-scoped fields of the record have already been reset.
/// A play performs one logical unit of work, pushes new grid versions
/// through the round rather than editing stacked ones, and queues awards
/// instead of applying them.
pub trait Component: std::fmt::Debug + Send + Sync {
    fn basic(&self) -> &BasicComponent;

    fn basic_mut(&mut self) -> &mut BasicComponent;

    /// The registered kind name, e.g. `"reels"`.
    fn kind(&self) -> &'static str;

    /// Resolve names against the registry and the component graph. Called
    /// once at load time; never consulted again during play.
    fn init(&mut self, env: &LoadEnv) -> Result<(), ConfigError>;

    /// A fresh data record.
    fn new_data(&self) -> Box<dyn ComponentData> {
        Box::new(BasicData::default())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError>;

    fn id(&self) -> ComponentId {
        self.basic().id
    }

    fn name(&self) -> &str {
        self.basic().name()
    }

    fn default_next(&self) -> Option<ComponentId> {
        self.basic().next
    }

    /// Every component this one may route to, for the load-time graph check.
    fn successors(&self) -> Vec<ComponentId> {
        self.default_next().into_iter().collect()
    }

    /// First component of the loop this component runs as a respin.
    fn respin_entry(&self) -> Option<ComponentId> {
        None
    }

    fn is_respin_boundary(&self) -> bool {
        self.respin_entry().is_some()
    }

    fn awards(&self) -> &[Award] {
        &self.basic().awards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AwardConfig;
    use crate::registry::RegistryBuilder;

    fn env_names() -> BTreeMap<String, ComponentId> {
        [("spin", 0), ("pay", 1)]
            .into_iter()
            .map(|(n, i)| (n.to_string(), ComponentId(i)))
            .collect()
    }

    #[test]
    fn basic_init_resolves_id_next_and_awards() {
        let registry = RegistryBuilder::new().build().unwrap();
        let names = env_names();
        let env = LoadEnv {
            registry: &registry,
            names: &names,
            width: 5,
            height: 3,
        };
        let cfg = ComponentConfig::new("spin", "reels")
            .with_next("pay")
            .with_award(AwardConfig::new("add_coins").with_param("coins", crate::config::ConfigValue::Int(5)));
        let mut basic = BasicComponent::new(&cfg);
        basic.init(&env).unwrap();
        assert_eq!(basic.id, ComponentId(0));
        assert_eq!(basic.next, Some(ComponentId(1)));
        assert_eq!(basic.awards, vec![Award::AddCoins(5)]);
    }

    #[test]
    fn basic_init_rejects_dangling_next() {
        let registry = RegistryBuilder::new().build().unwrap();
        let names = env_names();
        let env = LoadEnv {
            registry: &registry,
            names: &names,
            width: 5,
            height: 3,
        };
        let mut basic = BasicComponent::new(&ComponentConfig::new("spin", "reels").with_next("nowhere"));
        assert_eq!(
            basic.init(&env),
            Err(ConfigError::UnresolvedComponent {
                owner: "spin".into(),
                name: "nowhere".into()
            })
        );
    }

    #[test]
    fn branch_helper() {
        assert_eq!(BasicComponent::branch(None), Step::Advance(Next::Default));
        assert_eq!(
            BasicComponent::branch(Some(ComponentId(4))),
            Step::Advance(Next::To(ComponentId(4)))
        );
    }
}
