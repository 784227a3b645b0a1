//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for the paytable files that sit
//! next to `game.*`: weight tables and reel sets. Symbols are a plain
//! list (wrapped under a `symbols` key in TOML). They are
//! deserialized from RON, JSON, or TOML data files and then registered into
//! a [`RegistryBuilder`](spindle_core::registry::RegistryBuilder) by the
//! loader. The game file itself is a plain
//! [`GameConfig`](spindle_core::config::GameConfig).

use std::collections::BTreeMap;

use serde::Deserialize;
use spindle_core::weights::TableValue;

// ===========================================================================
// Weight tables
// ===========================================================================

/// A weighted table entry, supporting both short tuple form and full form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TableEntryData {
    /// Short form: `("W", 3)` or `(5, 1)`.
    Short(TableValue, u64),
    /// Full form with explicit fields.
    Full { value: TableValue, weight: u64 },
}

impl TableEntryData {
    pub fn into_pair(self) -> (TableValue, u64) {
        match self {
            TableEntryData::Short(value, weight) => (value, weight),
            TableEntryData::Full { value, weight } => (value, weight),
        }
    }
}

/// Contents of `tables.*`: table name to entries.
pub type TablesFile = BTreeMap<String, Vec<TableEntryData>>;

// ===========================================================================
// Reel sets
// ===========================================================================

/// Contents of `reels.*`: reel set name to one strip of symbol names per
/// column.
pub type ReelsFile = BTreeMap<String, Vec<Vec<String>>>;

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_entries_ron() {
        let src = r#"{
            "upgrade": [("W", 3), ("A", 1)],
            "coins": [(value: 1, weight: 5), (value: 5, weight: 1)],
        }"#;
        let tables: TablesFile = ron::from_str(src).unwrap();
        assert_eq!(
            tables["upgrade"][0].clone().into_pair(),
            (TableValue::Str("W".into()), 3)
        );
        assert_eq!(
            tables["coins"][1].clone().into_pair(),
            (TableValue::Int(5), 1)
        );
    }

    #[test]
    fn table_entries_json() {
        let src = r#"{ "coins": [[1, 5], { "value": 2, "weight": 3 }] }"#;
        let tables: TablesFile = serde_json::from_str(src).unwrap();
        let pairs: Vec<_> = tables["coins"].iter().cloned().map(TableEntryData::into_pair).collect();
        assert_eq!(
            pairs,
            vec![(TableValue::Int(1), 5), (TableValue::Int(2), 3)]
        );
    }

    #[test]
    fn table_entries_toml() {
        let src = r#"
            [[coins]]
            value = 1
            weight = 5

            [[coins]]
            value = "jackpot"
            weight = 1
        "#;
        let tables: TablesFile = toml::from_str(src).unwrap();
        assert_eq!(tables["coins"].len(), 2);
        assert_eq!(
            tables["coins"][1].clone().into_pair(),
            (TableValue::Str("jackpot".into()), 1)
        );
    }

    #[test]
    fn reel_sets() {
        let reels: ReelsFile = ron::from_str(r#"{ "base": [["A", "B"], ["S"]] }"#).unwrap();
        assert_eq!(reels["base"].len(), 2);

        let reels: ReelsFile = toml::from_str(r#"base = [["A", "B"], ["S"]]"#).unwrap();
        assert_eq!(reels["base"][1], vec!["S"]);
    }
}
