//! Pause the round for a player decision.
//!
//! Params: `options`, a map from command to the component it routes to.
//! The first play awaits; the orchestrator replays the component with the
//! accepted command, which routes to that option's target.

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

pub const KIND: &str = "player_choice";

const DATA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceData {
    pub basic: BasicData,
    /// Commands accepted in this scope, oldest first.
    pub choices: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ChoiceRecord {
    base: BasicRecord,
    choices: Vec<String>,
}

impl ComponentData for ChoiceData {
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
        let record = ChoiceRecord {
            base: BasicRecord::from(&self.basic),
            choices: self.choices.clone(),
        };
        PersistedData::encode(KIND, DATA_VERSION, &record)
    }

    fn load_persisted(
        &mut self,
        data: &PersistedData,
        migrations: &MigrationRegistry,
    ) -> Result<(), DeserializeError> {
        let record: ChoiceRecord = data.decode(KIND, DATA_VERSION, migrations)?;
        self.basic = record.base.into();
        self.choices = record.choices;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone)]
pub struct PlayerChoice {
    basic: BasicComponent,
    /// Sorted by command.
    options: Vec<(String, ComponentId)>,
}

impl PlayerChoice {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            options: Vec::new(),
        }))
    }

    fn commands(&self) -> Vec<String> {
        self.options.iter().map(|(c, _)| c.clone()).collect()
    }
}

impl Component for PlayerChoice {
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
        let options = p.str_map("options")?;
        if options.is_empty() {
            return Err(p.invalid("options", "at least one option"));
        }
        self.options = options
            .into_iter()
            .map(|(command, target)| Ok((command.to_string(), env.component_id(p.owner(), target)?)))
            .collect::<Result<_, ConfigError>>()?;
        self.options.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(())
    }

    fn new_data(&self) -> Box<dyn ComponentData> {
        Box::new(ChoiceData::default())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let data = typed_data::<ChoiceData>(self.name(), data)?;
        let Some(command) = round.take_command() else {
            return Ok(Step::Await(self.commands()));
        };
        let target = self
            .options
            .iter()
            .find(|(c, _)| *c == command)
            .map(|(_, id)| *id)
            .ok_or_else(|| RoundError::InvalidCommand {
                command: command.clone(),
                options: self.commands(),
            })?;
        data.choices.push(command);
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::To(target)))
    }

    fn successors(&self) -> Vec<ComponentId> {
        self.default_next()
            .into_iter()
            .chain(self.options.iter().map(|(_, id)| *id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::data::downcast_ref;
    use crate::test_utils::*;

    fn game() -> GameConfig {
        let leaf = |name: &str| {
            ComponentConfig::new(name, "value_trigger")
                .with_param("key", s("k"))
                .with_param("op", s("eq"))
                .with_param("value", int(0))
        };
        GameConfig::new("choice", 5, 3, "choose")
            .with_component(
                ComponentConfig::new("choose", "player_choice")
                    .with_param("options", map(&[("take", "collect"), ("gamble", "risk")])),
            )
            .with_component(leaf("collect"))
            .with_component(leaf("risk"))
    }

    #[test]
    fn awaits_without_command() {
        let t = build_template(&game());
        let mut round = test_round(&t, 0);
        assert_eq!(
            play_once(&t, &mut round, "choose").unwrap(),
            Step::Await(vec!["gamble".into(), "take".into()])
        );
        assert!(round.draws().is_empty());
    }

    #[test]
    fn command_routes_and_is_recorded() {
        let t = build_template(&game());
        let choose = t.id_of("choose").unwrap();
        let mut round = test_round(&t, 0);
        round.accept_command(choose, "gamble");
        assert_eq!(
            play_once(&t, &mut round, "choose").unwrap(),
            Step::Advance(Next::To(t.id_of("risk").unwrap()))
        );
        let data = downcast_ref::<ChoiceData>(round.find_data(choose).unwrap()).unwrap();
        assert_eq!(data.choices, vec!["gamble".to_string()]);
        // The command is consumed.
        assert!(matches!(play_once(&t, &mut round, "choose").unwrap(), Step::Await(_)));
    }

    #[test]
    fn unknown_command_rejected() {
        let t = build_template(&game());
        let choose = t.id_of("choose").unwrap();
        let mut round = test_round(&t, 0);
        round.accept_command(choose, "fold");
        assert!(matches!(
            play_once(&t, &mut round, "choose"),
            Err(RoundError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn successors_are_option_targets() {
        let t = build_template(&game());
        let choose = t.component(t.id_of("choose").unwrap()).unwrap();
        assert_eq!(
            choose.successors(),
            vec![t.id_of("risk").unwrap(), t.id_of("collect").unwrap()]
        );
    }
}
