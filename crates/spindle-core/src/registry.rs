//! Paytable registry: symbols, weight tables and reel sets.
//!
//! Built once through [`RegistryBuilder`] and frozen; components resolve
//! everything they need from it during `init` and keep their own copies.

use std::collections::BTreeMap;

use crate::config::ConfigError;
use crate::id::{EMPTY_SYMBOL, SymbolCode};
use crate::weights::{TableValue, WeightTable};

/// One reel strip per grid column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelSet {
    pub strips: Vec<Vec<SymbolCode>>,
}

impl ReelSet {
    pub fn columns(&self) -> usize {
        self.strips.len()
    }
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    symbols: Vec<String>,
    symbol_codes: BTreeMap<String, SymbolCode>,
    tables: BTreeMap<String, WeightTable<TableValue>>,
    reels: BTreeMap<String, Vec<Vec<String>>>,
    duplicates: Vec<(&'static str, String)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a symbol. Codes are assigned in registration order.
    pub fn register_symbol(&mut self, name: &str) -> SymbolCode {
        if let Some(code) = self.symbol_codes.get(name) {
            self.duplicates.push(("symbol", name.to_string()));
            return *code;
        }
        let code = SymbolCode(self.symbols.len() as i32);
        self.symbols.push(name.to_string());
        self.symbol_codes.insert(name.to_string(), code);
        code
    }

    /// Phase 1: Register a weight table.
    pub fn register_table(&mut self, name: &str, table: WeightTable<TableValue>) {
        if self.tables.insert(name.to_string(), table).is_some() {
            self.duplicates.push(("weight table", name.to_string()));
        }
    }

    /// Phase 1: Register a reel set by symbol names; resolved in `build`.
    pub fn register_reels(&mut self, name: &str, strips: Vec<Vec<String>>) {
        if self.reels.insert(name.to_string(), strips).is_some() {
            self.duplicates.push(("reel set", name.to_string()));
        }
    }

    /// Phase 2: Replace an existing table by name.
    pub fn mutate_table<F>(&mut self, name: &str, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut WeightTable<TableValue>),
    {
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnresolvedTable {
                owner: "registry".to_string(),
                name: name.to_string(),
            })?;
        f(table);
        Ok(())
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolCode> {
        self.symbol_codes.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, ConfigError> {
        if let Some((what, name)) = self.duplicates.into_iter().next() {
            return Err(ConfigError::Duplicate { what, name });
        }

        let mut reels = BTreeMap::new();
        for (name, strips) in self.reels {
            let owner = format!("reels `{name}`");
            let mut resolved = Vec::with_capacity(strips.len());
            for strip in strips {
                if strip.is_empty() {
                    return Err(ConfigError::InvalidRange {
                        owner,
                        reason: "reel strip is empty".to_string(),
                    });
                }
                let codes = strip
                    .iter()
                    .map(|s| {
                        self.symbol_codes
                            .get(s)
                            .copied()
                            .ok_or_else(|| ConfigError::UnresolvedSymbol {
                                owner: owner.clone(),
                                name: s.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                resolved.push(codes);
            }
            reels.insert(name, ReelSet { strips: resolved });
        }

        Ok(Registry {
            symbols: self.symbols,
            symbol_codes: self.symbol_codes,
            tables: self.tables,
            reels,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug, Default)]
pub struct Registry {
    symbols: Vec<String>,
    symbol_codes: BTreeMap<String, SymbolCode>,
    tables: BTreeMap<String, WeightTable<TableValue>>,
    reels: BTreeMap<String, ReelSet>,
}

impl Registry {
    pub fn symbol(&self, name: &str) -> Option<SymbolCode> {
        self.symbol_codes.get(name).copied()
    }

    pub fn symbol_name(&self, code: SymbolCode) -> Option<&str> {
        if code == EMPTY_SYMBOL {
            return None;
        }
        usize::try_from(code.0)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .map(String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&WeightTable<TableValue>> {
        self.tables.get(name)
    }

    pub fn reels(&self, name: &str) -> Option<&ReelSet> {
        self.reels.get(name)
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn reel_set_count(&self) -> usize {
        self.reels.len()
    }

    pub fn require_symbol(&self, owner: &str, name: &str) -> Result<SymbolCode, ConfigError> {
        self.symbol(name).ok_or_else(|| ConfigError::UnresolvedSymbol {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn require_symbols(&self, owner: &str, names: &[&str]) -> Result<Vec<SymbolCode>, ConfigError> {
        names.iter().map(|n| self.require_symbol(owner, n)).collect()
    }

    pub fn require_table(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<&WeightTable<TableValue>, ConfigError> {
        self.table(name).ok_or_else(|| ConfigError::UnresolvedTable {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// A table whose values are all symbol names, resolved to codes.
    pub fn require_symbol_table(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<WeightTable<SymbolCode>, ConfigError> {
        let table = self.require_table(owner, name)?;
        for value in table.values() {
            let symbol = value.as_str().ok_or_else(|| ConfigError::InvalidParam {
                owner: owner.to_string(),
                key: name.to_string(),
                expected: "a table of symbol names",
            })?;
            self.require_symbol(owner, symbol)?;
        }
        table
            .map_values(|v| v.as_str().and_then(|s| self.symbol(s)))
            .ok_or_else(|| ConfigError::UnresolvedTable {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    pub fn require_reels(&self, owner: &str, name: &str) -> Result<&ReelSet, ConfigError> {
        self.reels(name).ok_or_else(|| ConfigError::UnresolvedReels {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}
