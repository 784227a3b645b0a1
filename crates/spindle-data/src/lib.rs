//! Spindle Data -- loads game definitions from RON, TOML or JSON files.
//!
//! A game directory holds one required `game.*` file and optional
//! `symbols.*`, `tables.*` and `reels.*` files. Each file may use any of
//! the three formats; the format is taken from the extension.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_game_data, load_template};
