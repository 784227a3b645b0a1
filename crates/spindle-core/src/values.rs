//! Round-scoped named integer values.
//!
//! Components exchange scalar state (collected counts, feature levels,
//! multipliers) through this store. It lives on the
//! [`RoundContext`](crate::round::RoundContext) and is cleared with it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::StateHash;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStore {
    values: BTreeMap<String, i64>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    /// Value of `key`, or 0 when unset.
    pub fn get_or_zero(&self, key: &str) -> i64 {
        self.get(key).unwrap_or(0)
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    /// Add `delta` (saturating) and return the new value.
    pub fn add(&mut self, key: &str, delta: i64) -> i64 {
        let slot = self.values.entry(key.to_string()).or_insert(0);
        *slot = slot.saturating_add(delta);
        *slot
    }

    pub fn remove(&mut self, key: &str) -> Option<i64> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn hash_into(&self, hash: &mut StateHash) {
        hash.write_u32(self.values.len() as u32);
        for (key, value) in &self.values {
            hash.write_str(key);
            hash.write_i64(*value);
        }
    }
}
