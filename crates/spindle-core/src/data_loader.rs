//! Data-driven game loading from JSON.
//!
//! Feature-gated behind `data-loader`. A single JSON document carries the
//! game definition together with its paytable:
//!
//! ```json
//! {
//!   "game": { "name": "demo", "width": 5, "height": 3, "entry": "spin", "components": [] },
//!   "symbols": ["A", "B", "S"],
//!   "tables": { "coins": [{ "value": 1, "weight": 5 }] },
//!   "reels": { "base": [["A", "B", "S"]] }
//! }
//! ```

use std::collections::BTreeMap;

use crate::config::{ConfigError, GameConfig};
use crate::factory::ComponentFactories;
use crate::registry::RegistryBuilder;
use crate::template::GameTemplate;
use crate::weights::{TableValue, WeightTable};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// One weighted entry of a table.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct TableEntryData {
    pub value: TableValue,
    pub weight: u64,
}

/// Paytable content: symbols, weight tables and reel sets.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RegistryData {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<TableEntryData>>,
    /// Reel sets by name, one strip of symbol names per column.
    #[serde(default)]
    pub reels: BTreeMap<String, Vec<Vec<String>>>,
}

/// Top-level document.
#[derive(Debug, serde::Deserialize)]
pub struct GameData {
    pub game: GameConfig,
    #[serde(flatten)]
    pub registry: RegistryData,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a game document from a JSON string.
pub fn load_game_json(json: &str) -> Result<GameData, DataLoadError> {
    Ok(serde_json::from_str(json)?)
}

/// Load a game document from JSON bytes.
pub fn load_game_json_bytes(bytes: &[u8]) -> Result<GameData, DataLoadError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Load a JSON game document and build its template with the built-in
/// component kinds.
pub fn load_template_json(json: &str) -> Result<GameTemplate, DataLoadError> {
    let data = load_game_json(json)?;
    let registry = build_registry(data.registry)?.build()?;
    Ok(GameTemplate::build(
        &data.game,
        registry,
        &ComponentFactories::with_builtins(),
    )?)
}

/// Register paytable content. Symbols go first so reel strips can name them.
pub fn build_registry(data: RegistryData) -> Result<RegistryBuilder, ConfigError> {
    let mut builder = RegistryBuilder::new();

    // Phase 1: symbols
    for symbol in &data.symbols {
        builder.register_symbol(symbol);
    }

    // Phase 2: weight tables
    for (name, entries) in data.tables {
        let table = WeightTable::from_pairs(entries.into_iter().map(|e| (e.value, e.weight)))
            .map_err(|source| ConfigError::Table {
                name: name.clone(),
                source,
            })?;
        builder.register_table(&name, table);
    }

    // Phase 3: reel sets, resolved against the symbols when built
    for (name, strips) in data.reels {
        builder.register_reels(&name, strips);
    }

    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================
