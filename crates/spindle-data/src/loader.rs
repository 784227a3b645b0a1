//! Loading pipeline: finds the game files, deserializes them, builds the
//! registry and the template.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_game_data`] and [`load_template`].

use log::debug;
use serde::de::DeserializeOwned;
use spindle_core::config::{ConfigError, GameConfig};
use spindle_core::factory::ComponentFactories;
use spindle_core::registry::{Registry, RegistryBuilder};
use spindle_core::template::GameTemplate;
use spindle_core::weights::WeightTable;
use std::path::{Path, PathBuf};

use crate::schema::{ReelsFile, TablesFile};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The files parsed but do not describe a valid game.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Turn any deserializer error into a [`DataLoadError::Parse`] for `path`.
fn parse_err<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> DataLoadError + '_ {
    move |e| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(parse_err(path)),
        Format::Json => serde_json::from_str(&content).map_err(parse_err(path)),
        Format::Toml => toml::from_str(&content).map_err(parse_err(path)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(parse_err(path)),
        Format::Json => serde_json::from_str(&content).map_err(parse_err(path)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(parse_err(path))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: format!("missing key '{toml_key}' in TOML file"),
                })?
                .clone();
            array.try_into::<Vec<T>>().map_err(parse_err(path))
        }
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// A parsed game directory: the component graph and its paytable.
#[derive(Debug)]
pub struct GameData {
    pub config: GameConfig,
    pub registry: Registry,
}

/// Load every game file found in `dir`.
///
/// `game.*` is required. `symbols.*`, `tables.*` and `reels.*` are optional;
/// symbols register first so reel strips can name them.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let game_path = require_data_file(dir, "game")?;
    let config: GameConfig = deserialize_file(&game_path)?;

    let mut builder = RegistryBuilder::new();

    // Phase 1: symbols
    if let Some(path) = find_data_file(dir, "symbols")? {
        let symbols: Vec<String> = deserialize_list(&path, "symbols")?;
        for symbol in &symbols {
            builder.register_symbol(symbol);
        }
        debug!("{}: {} symbols", path.display(), symbols.len());
    }

    // Phase 2: weight tables
    if let Some(path) = find_data_file(dir, "tables")? {
        let tables: TablesFile = deserialize_file(&path)?;
        debug!("{}: {} tables", path.display(), tables.len());
        for (name, entries) in tables {
            let table = WeightTable::from_pairs(entries.into_iter().map(|e| e.into_pair()))
                .map_err(|source| ConfigError::Table {
                    name: name.clone(),
                    source,
                })?;
            builder.register_table(&name, table);
        }
    }

    // Phase 3: reel sets, resolved against the symbols when built
    if let Some(path) = find_data_file(dir, "reels")? {
        let reels: ReelsFile = deserialize_file(&path)?;
        debug!("{}: {} reel sets", path.display(), reels.len());
        for (name, strips) in reels {
            builder.register_reels(&name, strips);
        }
    }

    let registry = builder.build()?;
    debug!(
        "loaded game `{}` from {}: {} components",
        config.name,
        dir.display(),
        config.components.len()
    );
    Ok(GameData { config, registry })
}

/// Load a game directory and build its template.
pub fn load_template(dir: &Path, factories: &ComponentFactories) -> Result<GameTemplate, DataLoadError> {
    let data = load_game_data(dir)?;
    Ok(GameTemplate::build(&data.config, data.registry, factories)?)
}

// ===========================================================================
// Tests
// ===========================================================================
