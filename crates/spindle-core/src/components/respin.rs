//! Respin boundary.
//!
//! Playing a respin grants its own loop `iterations` runs; the orchestrator
//! then enters a fresh frame starting at `first`. When the frame is used up
//! the round continues at this component's default successor.
//!
//! Params: `first`, `iterations` (overridable).

use crate::award::Award;
use crate::component::{BasicComponent, Component, LoadEnv, Next, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::{ComponentData, override_int};
use crate::id::ComponentId;
use crate::round::{RoundContext, RoundError};

pub const KIND: &str = "respin";

#[derive(Debug, Clone)]
pub struct Respin {
    basic: BasicComponent,
    first: ComponentId,
    iterations: u32,
}

impl Respin {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            first: ComponentId(0),
            iterations: 0,
        }))
    }
}

impl Component for Respin {
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
        self.first = env.component_id(p.owner(), p.str("first")?)?;
        if self.first == self.basic.id {
            return Err(ConfigError::InvalidRange {
                owner: p.owner().to_string(),
                reason: "a respin cannot loop onto itself".into(),
            });
        }
        self.iterations = p.count("iterations")?;
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let requested = override_int(data.base(), "iterations", i64::from(self.iterations));
        let iterations = u32::try_from(requested).map_err(|_| RoundError::InvalidOverride {
            component: self.name().to_string(),
            key: "iterations".into(),
            value: requested.to_string(),
        })?;
        round.queue_awards(
            self.basic.id,
            &[Award::GrantRespin {
                respin: self.basic.id,
                iterations,
            }],
        );
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::Default))
    }

    fn respin_entry(&self) -> Option<ComponentId> {
        Some(self.first)
    }
}
