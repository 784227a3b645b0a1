//! Built-in components.
//!
//! Each module exposes its kind name as `KIND` and a `create` constructor
//! registered by [`ComponentFactories::with_builtins`](crate::factory::ComponentFactories::with_builtins).

pub mod collector;
pub mod player_choice;
pub mod reels;
pub mod replace_symbols;
pub mod respin;
pub mod scatter_pay;
pub mod symbol_trigger;
pub mod value_trigger;
pub mod weight_branch;

use crate::data::{ComponentData, downcast_mut};
use crate::round::RoundError;

/// Downcast a record handed to `play`, reporting the mismatch otherwise.
pub(crate) fn typed_data<'a, T: 'static>(
    owner: &str,
    data: &'a mut dyn ComponentData,
) -> Result<&'a mut T, RoundError> {
    let actual = data.kind();
    downcast_mut::<T>(data).ok_or_else(|| RoundError::DataKind {
        component: owner.to_string(),
        actual,
    })
}
