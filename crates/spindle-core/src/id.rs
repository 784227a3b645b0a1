use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a grid stored in a [`crate::grid::GridPool`].
    pub struct GridId;
}

/// Identifies a component within a game template. Assigned in declaration
/// order at load time, so it doubles as an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Integer code of a symbol, resolved from its name at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolCode(pub i32);

/// Placeholder code for an empty cell.
pub const EMPTY_SYMBOL: SymbolCode = SymbolCode(-1);

/// Position of a grid in its stack. Monotonic within a round, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StackIndex(pub u32);

impl StackIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
