//! Persisted-data version migration framework.
//!
//! Provides a registry of migration functions that transform a record's
//! payload from one format version to the next, per data kind, so records
//! written by older builds still load after a data type gains fields.

use std::collections::BTreeMap;

use crate::data::{BASIC_KIND, migrate_basic_v1};
use crate::serialize::DeserializeError;

/// Errors that can occur during migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path for `{kind}` from version {from} to version {to}")]
    NoMigrationPath { kind: String, from: u32, to: u32 },
    #[error("migration from version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
    #[error("deserialization error: {0}")]
    DeserializeError(#[from] DeserializeError),
}

/// A function that transforms a payload from one version to the next.
pub type MigrationFn = fn(&[u8]) -> Result<Vec<u8>, MigrationError>;

/// Registry of migration functions keyed by data kind and source version.
///
/// Each registered function migrates a payload from `version N` to
/// `version N+1`. The registry chains these steps across multiple versions.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<(String, u32), MigrationFn>,
}

impl MigrationRegistry {
    /// Create an empty migration registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the migrations of the built-in data kinds.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(BASIC_KIND, 1, migrate_basic_v1);
        reg
    }

    /// Register a migration for `kind` from `from_version` to `from_version + 1`.
    pub fn register(&mut self, kind: &str, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert((kind.to_string(), from_version), migrate);
    }

    /// Check whether a complete migration path exists from `from` to `to`.
    pub fn can_migrate(&self, kind: &str, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&(kind.to_string(), v)))
    }

    /// Migrate a payload of `kind` from version `from` to version `to`.
    ///
    /// Chains registered migration functions sequentially.
    /// Returns the original data unchanged if `from == to`.
    pub fn migrate(
        &self,
        kind: &str,
        data: &[u8],
        from: u32,
        to: u32,
    ) -> Result<Vec<u8>, MigrationError> {
        let no_path = || MigrationError::NoMigrationPath {
            kind: kind.to_string(),
            from,
            to,
        };
        if from == to {
            return Ok(data.to_vec());
        }
        if from > to {
            return Err(no_path());
        }

        let mut current_data = data.to_vec();
        for version in from..to {
            let migrate_fn = self
                .migrations
                .get(&(kind.to_string(), version))
                .ok_or_else(no_path)?;
            current_data = migrate_fn(&current_data)?;
        }
        Ok(current_data)
    }

    /// Number of registered migration steps.
    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
