//! The immutable, load-time game template.
//!
//! [`GameTemplate::build`] turns a [`GameConfig`] and a frozen [`Registry`]
//! into resolved components. Every name is checked here; no round ever
//! starts against a template that failed to build. A template is `Sync`,
//! so rounds on many threads can share one.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use crate::award::Award;
use crate::component::{Component, LoadEnv};
use crate::config::{ConfigError, GameConfig};
use crate::data::ComponentData;
use crate::factory::ComponentFactories;
use crate::graph::FlowGraph;
use crate::id::ComponentId;
use crate::registry::Registry;
use crate::rng::RandomSource;
use crate::round::{RoundContext, Stake};

#[derive(Debug)]
pub struct GameTemplate {
    name: String,
    width: usize,
    height: usize,
    entry: ComponentId,
    max_steps: u32,
    registry: Registry,
    components: Vec<Box<dyn Component>>,
    names: BTreeMap<String, ComponentId>,
    prototypes: Arc<Vec<Box<dyn ComponentData>>>,
    graph: FlowGraph,
}

impl GameTemplate {
    pub fn build(
        config: &GameConfig,
        registry: Registry,
        factories: &ComponentFactories,
    ) -> Result<Self, ConfigError> {
        // Cell coordinates are stored as u16.
        let max_side = usize::from(u16::MAX);
        if config.width == 0
            || config.height == 0
            || config.width > max_side
            || config.height > max_side
        {
            return Err(ConfigError::InvalidGridSize {
                width: config.width,
                height: config.height,
            });
        }
        if config.components.is_empty() {
            return Err(ConfigError::NoComponents);
        }

        let mut names = BTreeMap::new();
        for (i, c) in config.components.iter().enumerate() {
            if names.insert(c.name.clone(), ComponentId(i as u32)).is_some() {
                return Err(ConfigError::Duplicate {
                    what: "component",
                    name: c.name.clone(),
                });
            }
        }

        let mut components = config
            .components
            .iter()
            .map(|c| factories.create(c))
            .collect::<Result<Vec<_>, _>>()?;

        let env = LoadEnv {
            registry: &registry,
            names: &names,
            width: config.width,
            height: config.height,
        };
        for component in &mut components {
            component.init(&env)?;
        }
        let entry = env.component_id(&config.name, &config.entry)?;

        // Respin grants must target respin components.
        for component in &components {
            for award in component.awards() {
                if let Award::GrantRespin { respin, .. } = award {
                    let target = &components[respin.index()];
                    if !target.is_respin_boundary() {
                        return Err(ConfigError::NotRespin {
                            owner: component.name().to_string(),
                            name: target.name().to_string(),
                        });
                    }
                }
            }
        }

        let graph = flow_graph(&components);
        graph.check_cycles(|id| components[id.index()].name())?;

        let prototypes: Vec<Box<dyn ComponentData>> =
            components.iter().map(|c| c.new_data()).collect();

        debug!(
            "game `{}`: {} components, {} edges, entry `{}`",
            config.name,
            components.len(),
            graph.edge_count(),
            config.entry
        );

        Ok(Self {
            name: config.name.clone(),
            width: config.width,
            height: config.height,
            entry,
            max_steps: config.max_steps,
            registry,
            components,
            names,
            prototypes: Arc::new(prototypes),
            graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn entry(&self) -> ComponentId {
        self.entry
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn component(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(id.index()).map(|c| c.as_ref())
    }

    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(|c| c.as_ref())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn id_of(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&str> {
        self.component(id).map(|c| c.name())
    }

    /// A fresh round sharing this template's data prototypes.
    pub fn new_round(&self, random: Box<dyn RandomSource>, stake: Stake) -> RoundContext {
        RoundContext::new(
            Arc::clone(&self.prototypes),
            self.width,
            self.height,
            random,
            stake,
        )
    }
}

fn flow_graph(components: &[Box<dyn Component>]) -> FlowGraph {
    let mut graph = FlowGraph::new(components.len());
    for component in components {
        let id = component.id();
        for next in component.successors() {
            graph.add_edge(id, next);
        }
        if let Some(first) = component.respin_entry() {
            graph.add_edge(id, first);
            graph.mark_bounded(id);
        }
        for award in component.awards() {
            if let Award::GrantRespin { respin, .. } = award {
                graph.add_edge(id, *respin);
            }
            if let Some((from, to)) = award.jump_edge() {
                graph.add_edge(from, to);
            }
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AwardConfig, ComponentConfig, ConfigValue};
    use crate::test_utils::{simple_game, test_registry};

    fn s(v: &str) -> ConfigValue {
        ConfigValue::Str(v.into())
    }

    fn build(config: &GameConfig) -> Result<GameTemplate, ConfigError> {
        GameTemplate::build(config, test_registry(), &ComponentFactories::with_builtins())
    }

    // -----------------------------------------------------------------------
    // Test 1: a valid game resolves names to ids
    // -----------------------------------------------------------------------
    #[test]
    fn builds_simple_game() {
        let t = build(&simple_game()).unwrap();
        assert_eq!(t.component_count(), 2);
        assert_eq!(t.entry(), ComponentId(0));
        assert_eq!(t.id_of("pay"), Some(ComponentId(1)));
        assert_eq!(t.name_of(ComponentId(0)), Some("spin"));
        assert_eq!(t.component(ComponentId(0)).unwrap().kind(), "reels");
        assert_eq!(t.component(ComponentId(0)).unwrap().default_next(), Some(ComponentId(1)));
    }

    // -----------------------------------------------------------------------
    // Test 2: structural errors
    // -----------------------------------------------------------------------
    #[test]
    fn rejects_bad_structure() {
        assert_eq!(
            build(&GameConfig::new("g", 5, 3, "spin")).unwrap_err(),
            ConfigError::NoComponents
        );
        assert!(matches!(
            build(&GameConfig::new("g", 0, 3, "spin")),
            Err(ConfigError::InvalidGridSize { .. })
        ));
        assert!(matches!(
            build(&GameConfig::new("g", 5, 70_000, "spin")),
            Err(ConfigError::InvalidGridSize { width: 5, height: 70_000 })
        ));
        assert!(matches!(
            build(&GameConfig::new("g", 65_536, 1, "spin")),
            Err(ConfigError::InvalidGridSize { .. })
        ));

        let dup = simple_game().with_component(ComponentConfig::new("pay", "scatter_pay"));
        assert!(matches!(build(&dup), Err(ConfigError::Duplicate { .. })));

        let mut bad_entry = simple_game();
        bad_entry.entry = "nowhere".into();
        assert!(matches!(
            build(&bad_entry),
            Err(ConfigError::UnresolvedComponent { .. })
        ));

        let unknown = GameConfig::new("g", 5, 3, "x").with_component(ComponentConfig::new("x", "slot_machine"));
        assert!(matches!(build(&unknown), Err(ConfigError::UnknownKind { .. })));
    }

    // -----------------------------------------------------------------------
    // Test 3: successor cycles need a respin boundary
    // -----------------------------------------------------------------------
    #[test]
    fn cycle_without_respin_rejected() {
        let config = GameConfig::new("g", 5, 3, "a")
            .with_component(
                ComponentConfig::new("a", "value_trigger")
                    .with_next("b")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", ConfigValue::Int(0)),
            )
            .with_component(
                ComponentConfig::new("b", "value_trigger")
                    .with_next("a")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", ConfigValue::Int(0)),
            );
        assert_eq!(
            build(&config).unwrap_err(),
            ConfigError::Cycle(vec!["a".into(), "b".into()])
        );

        // A jump award closes a loop just like a successor does.
        let config = GameConfig::new("g", 5, 3, "a")
            .with_component(
                ComponentConfig::new("a", "value_trigger")
                    .with_next("b")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", ConfigValue::Int(0)),
            )
            .with_component(
                ComponentConfig::new("b", "value_trigger")
                    .with_param("key", s("k"))
                    .with_param("op", s("eq"))
                    .with_param("value", ConfigValue::Int(0))
                    .with_award(AwardConfig::new("jump").with_param("target", s("a"))),
            );
        assert!(matches!(build(&config), Err(ConfigError::Cycle(_))));
    }

    // -----------------------------------------------------------------------
    // Test 4: respin grants must target respin components
    // -----------------------------------------------------------------------
    #[test]
    fn grant_to_non_respin_rejected() {
        let config = simple_game().with_component(
            ComponentConfig::new("grant", "value_trigger")
                .with_param("key", s("k"))
                .with_param("op", s("eq"))
                .with_param("value", ConfigValue::Int(0))
                .with_award(
                    AwardConfig::new("respin")
                        .with_param("respin", s("pay"))
                        .with_param("iterations", ConfigValue::Int(2)),
                ),
        );
        assert_eq!(
            build(&config).unwrap_err(),
            ConfigError::NotRespin {
                owner: "grant".into(),
                name: "pay".into()
            }
        );
    }

    // -----------------------------------------------------------------------
    // Test 5: rounds share the template's prototypes
    // -----------------------------------------------------------------------
    #[test]
    fn new_round_sized_from_template() {
        let t = build(&simple_game()).unwrap();
        let round = t.new_round(
            Box::new(crate::rng::LiveRandom::new(1)),
            Stake::new(1, crate::fixed::Fixed64::ONE),
        );
        assert_eq!(round.component_count(), 2);
        assert_eq!((round.width(), round.height()), (5, 3));
    }

    #[test]
    fn template_is_sync() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<GameTemplate>();
    }
}
