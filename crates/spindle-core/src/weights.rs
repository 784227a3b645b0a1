//! Weighted choice tables.
//!
//! A [`WeightTable`] maps values to non-negative integer weights and turns a
//! single random index in `[0, total_weight)` into a value. Derived tables
//! (exclusion / intersection) are computed on demand and never touch the
//! source table.

use serde::{Deserialize, Serialize};

use crate::rng::{RandomSource, RngError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeightError {
    #[error("weight table has zero total weight")]
    Empty,
    #[error("random index {index} outside total weight {total}")]
    IndexOutOfRange { index: u64, total: u64 },
    #[error("weight table has {values} values but {weights} weights")]
    LengthMismatch { values: usize, weights: usize },
    #[error("total weight overflows u64")]
    Overflow,
    #[error(transparent)]
    Random(#[from] RngError),
}

// ---------------------------------------------------------------------------
// Table values
// ---------------------------------------------------------------------------

/// Value stored in a registry weight table. Components check the variant
/// they need at load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableValue {
    Int(i64),
    Str(String),
}

impl TableValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TableValue::Int(v) => Some(*v),
            TableValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TableValue::Str(s) => Some(s),
            TableValue::Int(_) => None,
        }
    }
}

impl std::fmt::Display for TableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableValue::Int(v) => write!(f, "{v}"),
            TableValue::Str(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// WeightTable
// ---------------------------------------------------------------------------

/// Ordered `(value, weight)` pairs with a cached prefix-sum array.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable<V> {
    values: Vec<V>,
    weights: Vec<u64>,
    /// `cumulative[i]` = sum of `weights[..=i]`.
    cumulative: Vec<u64>,
}

impl<V> WeightTable<V> {
    /// Build a table from parallel value/weight lists.
    pub fn new(values: Vec<V>, weights: Vec<u64>) -> Result<Self, WeightError> {
        if values.len() != weights.len() {
            return Err(WeightError::LengthMismatch {
                values: values.len(),
                weights: weights.len(),
            });
        }
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut sum = 0u64;
        for &w in &weights {
            sum = sum.checked_add(w).ok_or(WeightError::Overflow)?;
            cumulative.push(sum);
        }
        Ok(Self {
            values,
            weights,
            cumulative,
        })
    }

    /// Build a table from `(value, weight)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (V, u64)>) -> Result<Self, WeightError> {
        let (values, weights) = pairs.into_iter().unzip();
        Self::new(values, weights)
    }

    /// A table in which every value has weight 1.
    pub fn uniform(values: Vec<V>) -> Self {
        let cumulative = (1..=values.len() as u64).collect();
        let weights = vec![1; values.len()];
        Self {
            values,
            weights,
            cumulative,
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn weights(&self) -> &[u64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = (&V, u64)> {
        self.values.iter().zip(self.weights.iter().copied())
    }

    /// Map a random index in `[0, total_weight)` to a value.
    ///
    /// A single-value table with positive weight returns its value for any
    /// index.
    pub fn draw(&self, random_index: u64) -> Result<&V, WeightError> {
        let total = self.total_weight();
        if total == 0 {
            return Err(WeightError::Empty);
        }
        if self.values.len() == 1 {
            return Ok(&self.values[0]);
        }
        if random_index >= total {
            return Err(WeightError::IndexOutOfRange {
                index: random_index,
                total,
            });
        }
        // First slot whose cumulative weight exceeds the index. Zero-weight
        // slots share their predecessor's cumulative value and are skipped.
        let slot = self.cumulative.partition_point(|&c| c <= random_index);
        Ok(&self.values[slot])
    }

    /// Draw using the randomness port. Single-value tables do not consume a
    /// draw.
    pub fn draw_random(&self, rng: &mut dyn RandomSource) -> Result<&V, WeightError> {
        let total = self.total_weight();
        if total == 0 {
            return Err(WeightError::Empty);
        }
        if self.values.len() == 1 {
            return Ok(&self.values[0]);
        }
        let index = rng.next(total)?;
        self.draw(index)
    }

    /// Like [`WeightTable::draw_random`] but returns the value's position.
    pub fn draw_index_random(&self, rng: &mut dyn RandomSource) -> Result<usize, WeightError> {
        let total = self.total_weight();
        if total == 0 {
            return Err(WeightError::Empty);
        }
        if self.values.len() == 1 {
            return Ok(0);
        }
        let index = rng.next(total)?;
        Ok(self.cumulative.partition_point(|&c| c <= index))
    }
}

impl<V: Clone + PartialEq> WeightTable<V> {
    /// A new table without the given values.
    pub fn exclude_values(&self, excluded: &[V]) -> Self {
        self.filtered(|v| !excluded.contains(v))
    }

    /// A new table keeping only the given values.
    pub fn intersect_values(&self, kept: &[V]) -> Self {
        self.filtered(|v| kept.contains(v))
    }

    /// Weight of a value, 0 if absent.
    pub fn weight_of(&self, value: &V) -> u64 {
        self.iter()
            .filter(|(v, _)| *v == value)
            .map(|(_, w)| w)
            .sum()
    }

    fn filtered(&self, keep: impl Fn(&V) -> bool) -> Self {
        let mut values = Vec::new();
        let mut weights = Vec::new();
        let mut cumulative = Vec::new();
        let mut sum = 0u64;
        for (v, w) in self.iter() {
            if keep(v) {
                values.push(v.clone());
                weights.push(w);
                // Cannot overflow: a subset of an already validated sum.
                sum += w;
                cumulative.push(sum);
            }
        }
        Self {
            values,
            weights,
            cumulative,
        }
    }

    /// Convert values, keeping weights.
    pub fn map_values<U>(
        &self,
        mut f: impl FnMut(&V) -> Option<U>,
    ) -> Option<WeightTable<U>> {
        let values = self.values.iter().map(&mut f).collect::<Option<Vec<U>>>()?;
        Some(WeightTable {
            values,
            weights: self.weights.clone(),
            cumulative: self.cumulative.clone(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
