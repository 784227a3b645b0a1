//! Static game configuration as authored by designers.
//!
//! Everything here is plain serde data. Names are resolved to ids and
//! tables once, in [`crate::template::GameTemplate::build`], and never
//! looked up again during play.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::weights::WeightError;

/// Default cap on component plays per round.
pub const DEFAULT_MAX_STEPS: u32 = 50_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Load-time configuration errors. Fatal: no round runs against a template
/// that failed to build.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("game has no components")]
    NoComponents,
    #[error("grid size {width}x{height} is invalid")]
    InvalidGridSize { width: usize, height: usize },
    #[error("duplicate {what} `{name}`")]
    Duplicate { what: &'static str, name: String },
    #[error("component `{component}`: unknown kind `{kind}`")]
    UnknownKind { component: String, kind: String },
    #[error("component `{component}`: unknown award kind `{kind}`")]
    UnknownAwardKind { component: String, kind: String },
    #[error("`{owner}`: missing parameter `{key}`")]
    MissingParam { owner: String, key: String },
    #[error("`{owner}`: parameter `{key}` must be {expected}")]
    InvalidParam {
        owner: String,
        key: String,
        expected: &'static str,
    },
    #[error("`{owner}`: {reason}")]
    InvalidRange { owner: String, reason: String },
    #[error("`{owner}`: unknown symbol `{name}`")]
    UnresolvedSymbol { owner: String, name: String },
    #[error("`{owner}`: unknown weight table `{name}`")]
    UnresolvedTable { owner: String, name: String },
    #[error("`{owner}`: unknown reel set `{name}`")]
    UnresolvedReels { owner: String, name: String },
    #[error("`{owner}`: unknown component `{name}`")]
    UnresolvedComponent { owner: String, name: String },
    #[error("`{owner}`: component `{name}` is not a respin")]
    NotRespin { owner: String, name: String },
    #[error("successor cycle without a respin boundary: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("weight table `{name}`: {source}")]
    Table {
        name: String,
        #[source]
        source: WeightError,
    },
}

// ---------------------------------------------------------------------------
// ConfigValue
// ---------------------------------------------------------------------------

/// A loosely typed parameter value. Components validate the shape they need
/// in `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
    Map(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Int(v) => write!(f, "{v}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => write!(f, "{v}"),
            ConfigValue::List(items) => write!(f, "[{} items]", items.len()),
            ConfigValue::Map(map) => write!(f, "{{{} keys}}", map.len()),
        }
    }
}

// ---------------------------------------------------------------------------
// Game / component / award configuration
// ---------------------------------------------------------------------------

/// Top-level game definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Component a round starts at.
    pub entry: String,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    pub components: Vec<ComponentConfig>,
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

impl GameConfig {
    pub fn new(name: &str, width: usize, height: usize, entry: &str) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            entry: entry.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: ComponentConfig) -> Self {
        self.components.push(component);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// One node of the component graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    pub kind: String,
    /// Default successor. `None` ends the round (or the respin iteration).
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub awards: Vec<AwardConfig>,
    #[serde(default)]
    pub params: BTreeMap<String, ConfigValue>,
}

impl ComponentConfig {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            next: None,
            awards: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(next.to_string());
        self
    }

    pub fn with_param(mut self, key: &str, value: ConfigValue) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn with_award(mut self, award: AwardConfig) -> Self {
        self.awards.push(award);
        self
    }

    pub fn params(&self) -> Params<'_> {
        Params::new(&self.name, &self.params)
    }
}

/// A declarative side effect attached to a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardConfig {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, ConfigValue>,
}

impl AwardConfig {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: ConfigValue) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Typed accessors over a parameter map that report errors against the
/// owning component.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    owner: &'a str,
    map: &'a BTreeMap<String, ConfigValue>,
}

impl<'a> Params<'a> {
    pub fn new(owner: &'a str, map: &'a BTreeMap<String, ConfigValue>) -> Self {
        Self { owner, map }
    }

    pub fn owner(&self) -> &'a str {
        self.owner
    }

    pub fn missing(&self, key: &str) -> ConfigError {
        ConfigError::MissingParam {
            owner: self.owner.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(&self, key: &str, expected: &'static str) -> ConfigError {
        ConfigError::InvalidParam {
            owner: self.owner.to_string(),
            key: key.to_string(),
            expected,
        }
    }

    pub fn get(&self, key: &str) -> Option<&'a ConfigValue> {
        self.map.get(key)
    }

    pub fn str(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.opt_str(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| self.invalid(key, "a string")),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64, ConfigError> {
        self.opt_int(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn opt_int(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(v) => v.as_int().map(Some).ok_or_else(|| self.invalid(key, "an integer")),
        }
    }

    /// A non-negative integer that fits in `u32`.
    pub fn count(&self, key: &str) -> Result<u32, ConfigError> {
        let v = self.int(key)?;
        u32::try_from(v).map_err(|_| self.invalid(key, "a non-negative integer"))
    }

    pub fn opt_count(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        match self.opt_int(key)? {
            None => Ok(None),
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| self.invalid(key, "a non-negative integer")),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.map.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| self.invalid(key, "a boolean")),
        }
    }

    pub fn str_list(&self, key: &str) -> Result<Vec<&'a str>, ConfigError> {
        let list = self
            .map
            .get(key)
            .ok_or_else(|| self.missing(key))?
            .as_list()
            .ok_or_else(|| self.invalid(key, "a list of strings"))?;
        list.iter()
            .map(|v| v.as_str().ok_or_else(|| self.invalid(key, "a list of strings")))
            .collect()
    }

    pub fn int_list(&self, key: &str) -> Result<Vec<i64>, ConfigError> {
        let list = self
            .map
            .get(key)
            .ok_or_else(|| self.missing(key))?
            .as_list()
            .ok_or_else(|| self.invalid(key, "a list of integers"))?;
        list.iter()
            .map(|v| v.as_int().ok_or_else(|| self.invalid(key, "a list of integers")))
            .collect()
    }

    /// A map of string to string, e.g. option name to component name.
    pub fn str_map(&self, key: &str) -> Result<Vec<(&'a str, &'a str)>, ConfigError> {
        let map = self
            .map
            .get(key)
            .ok_or_else(|| self.missing(key))?
            .as_map()
            .ok_or_else(|| self.invalid(key, "a map of strings"))?;
        map.iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|s| (k.as_str(), s))
                    .ok_or_else(|| self.invalid(key, "a map of strings"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ComponentConfig {
        ComponentConfig::new("bg-pay", "scatter_pay")
            .with_next("end")
            .with_param("symbol", ConfigValue::Str("SC".into()))
            .with_param("pays", ConfigValue::List(vec![ConfigValue::Int(0), ConfigValue::Int(5)]))
            .with_param("limit", ConfigValue::Int(-3))
    }

    #[test]
    fn typed_accessors() {
        let cfg = sample();
        let p = cfg.params();
        assert_eq!(p.str("symbol").unwrap(), "SC");
        assert_eq!(p.int_list("pays").unwrap(), vec![0, 5]);
        assert_eq!(p.opt_int("absent").unwrap(), None);
        assert!(p.bool_or("absent", true).unwrap());
    }

    #[test]
    fn accessor_errors_name_owner_and_key() {
        let cfg = sample();
        let p = cfg.params();
        assert_eq!(
            p.int("symbol"),
            Err(ConfigError::InvalidParam {
                owner: "bg-pay".into(),
                key: "symbol".into(),
                expected: "an integer",
            })
        );
        assert!(matches!(p.str("table"), Err(ConfigError::MissingParam { .. })));
        assert!(matches!(p.count("limit"), Err(ConfigError::InvalidParam { .. })));
    }

    #[test]
    fn game_config_from_json_defaults() {
        let json = r#"{
            "name": "demo",
            "width": 5,
            "height": 3,
            "entry": "spin",
            "components": [
                { "name": "spin", "kind": "reels", "params": { "reels": "base", "fast": true } }
            ]
        }"#;
        let game: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(game.max_steps, DEFAULT_MAX_STEPS);
        let spin = &game.components[0];
        assert_eq!(spin.next, None);
        assert!(spin.awards.is_empty());
        assert_eq!(spin.params["fast"], ConfigValue::Bool(true));
        assert_eq!(spin.params["reels"], ConfigValue::Str("base".into()));
    }

    #[test]
    fn untagged_values_nest() {
        let json = r#"{ "options": { "left": "pick-a", "right": "pick-b" }, "w": [1, 2] }"#;
        let map: BTreeMap<String, ConfigValue> = serde_json::from_str(json).unwrap();
        let p = Params::new("choice", &map);
        assert_eq!(
            p.str_map("options").unwrap(),
            vec![("left", "pick-a"), ("right", "pick-b")]
        );
        assert_eq!(p.int_list("w").unwrap(), vec![1, 2]);
    }
}
