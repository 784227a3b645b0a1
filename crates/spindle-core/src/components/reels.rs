//! Spin a reel set into a fresh main grid.
//!
//! Params: `reels` (default set), optional `alternatives` (other sets an
//! award may select by overriding `reels`).

use crate::component::{BasicComponent, Component, LoadEnv, Next, Step};
use crate::config::{ComponentConfig, ConfigError};
use crate::data::{ComponentData, override_str};
use crate::grid::{ColumnMeta, GridKind};
use crate::registry::ReelSet;
use crate::round::{RoundContext, RoundError};

pub const KIND: &str = "reels";

#[derive(Debug, Clone)]
pub struct Reels {
    basic: BasicComponent,
    /// Default set first.
    sets: Vec<(String, ReelSet)>,
}

impl Reels {
    pub fn create(config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        Ok(Box::new(Self {
            basic: BasicComponent::new(config),
            sets: Vec::new(),
        }))
    }

    fn select(&self, name: Option<&str>) -> Result<&ReelSet, RoundError> {
        match name {
            None => Ok(&self.sets[0].1),
            Some(name) => self
                .sets
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, set)| set)
                .ok_or_else(|| RoundError::InvalidOverride {
                    component: self.basic.name().to_string(),
                    key: "reels".into(),
                    value: name.to_string(),
                }),
        }
    }
}

impl Component for Reels {
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
        let mut names = vec![p.str("reels")?];
        if p.get("alternatives").is_some() {
            names.extend(p.str_list("alternatives")?);
        }

        self.sets.clear();
        for name in names {
            let set = env.registry.require_reels(p.owner(), name)?;
            if set.columns() != env.width {
                return Err(ConfigError::InvalidRange {
                    owner: p.owner().to_string(),
                    reason: format!(
                        "reel set `{name}` has {} columns, grid has {}",
                        set.columns(),
                        env.width
                    ),
                });
            }
            self.sets.push((name.to_string(), set.clone()));
        }
        Ok(())
    }

    fn play(&self, round: &mut RoundContext, data: &mut dyn ComponentData) -> Result<Step, RoundError> {
        let base = data.base_mut();
        let set = self.select(override_str(base, "reels"))?;
        let height = round.height();

        let mut stops = Vec::with_capacity(set.columns());
        for strip in &set.strips {
            stops.push(round.random().next(strip.len() as u64)? as usize);
        }

        let id = round.new_grid();
        let grid = round.grid_mut(id)?;
        for (x, (strip, &stop)) in set.strips.iter().zip(&stops).enumerate() {
            for y in 0..height {
                grid.set(x, y, strip[(stop + y) % strip.len()])?;
            }
            grid.set_column_meta(
                x,
                ColumnMeta {
                    stop: Some(stop as u32),
                    strip_len: Some(strip.len() as u32),
                },
            );
        }
        round.push_grid(GridKind::Main, id, self.basic.id, base)?;
        self.basic.fire_awards(round);
        Ok(Step::Advance(Next::Default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{OverrideValue, set_override};
    use crate::id::{ComponentId, SymbolCode};
    use crate::test_utils::*;
    use crate::config::GameConfig;

    fn game() -> GameConfig {
        GameConfig::new("reels", 5, 3, "spin").with_component(
            ComponentConfig::new("spin", "reels")
                .with_param("reels", s("base"))
                .with_param("alternatives", list(&["bonus"])),
        )
    }

    #[test]
    fn spin_fills_columns_from_stops() {
        let t = build_template(&game());
        let mut round = t.new_round(Box::new(SequenceRandom::new(vec![0, 3, 7, 1, 2])), stake());
        assert_eq!(play_once(&t, &mut round, "spin").unwrap(), Step::Advance(Next::Default));

        let (_, grid) = round.visible_grid(GridKind::Main).unwrap();
        // base strip: A B C S W A B C
        assert_eq!(grid.column(0), &[SymbolCode(0), SymbolCode(1), SymbolCode(2)]);
        assert_eq!(grid.column(1), &[SymbolCode(4), SymbolCode(3), SymbolCode(0)]);
        // Stop 7 wraps around the strip.
        assert_eq!(grid.column(2), &[SymbolCode(2), SymbolCode(0), SymbolCode(1)]);
        assert_eq!(grid.column_meta(2).unwrap().stop, Some(7));
        assert_eq!(grid.column_meta(2).unwrap().strip_len, Some(8));

        let data = round.find_data(ComponentId(0)).unwrap();
        assert_eq!(data.base().used_grids.len(), 1);
    }

    #[test]
    fn override_selects_alternative_set() {
        let t = build_template(&game());
        let mut round = t.new_round(Box::new(FixedRandom::new(0)), stake());
        set_override(
            round.scope_data_mut(ComponentId(0)).unwrap().base_mut(),
            "reels",
            OverrideValue::Str("bonus".into()),
        );
        play_once(&t, &mut round, "spin").unwrap();
        let (_, grid) = round.visible_grid(GridKind::Main).unwrap();
        // bonus strip: S S A B
        assert_eq!(grid.count(SymbolCode(4)), 10);
        assert_eq!(round.draws().iter().map(|d| d.range).collect::<Vec<_>>(), vec![4; 5]);

        set_override(
            round.scope_data_mut(ComponentId(0)).unwrap().base_mut(),
            "reels",
            OverrideValue::Str("missing".into()),
        );
        assert!(matches!(
            play_once(&t, &mut round, "spin"),
            Err(RoundError::InvalidOverride { .. })
        ));
    }

    #[test]
    fn width_mismatch_rejected() {
        let mut config = game();
        config.width = 4;
        let err = crate::template::GameTemplate::build(
            &config,
            test_registry(),
            &crate::factory::ComponentFactories::with_builtins(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRange { .. }));
    }
}
