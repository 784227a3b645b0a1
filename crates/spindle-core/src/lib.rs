//! Spindle Core -- the component-execution runtime for slot games.
//!
//! A game is a directed graph of small configurable components (reel spins,
//! symbol replacement, collectors, triggers, respin loops). This crate loads
//! that graph once into an immutable [`template::GameTemplate`] and walks it
//! once per round, mutating versioned grid state and accumulating wins while
//! every random choice stays reproducible.
//!
//! # Round Pipeline
//!
//! [`runner::Runner::run`] drives a round one step at a time:
//!
//! 1. **Play** -- The current component plays against its data record in the
//!    current scope (innermost respin frame, or the round namespace).
//! 2. **Awards** -- Awards queued during the play are evaluated in order.
//! 3. **Route** -- A jump override, the play's branch, or the default
//!    successor picks the next component.
//! 4. **Frames** -- A granted respin enters a new call-stack frame; an
//!    iteration that runs out of successors ticks or exits its frame.
//! 5. **Bookkeeping** -- Record the step hash and notify sinks and hooks.
//!
//! # Grid Versioning Pattern
//!
//! Pushed grids are frozen. A component that changes the visible grid forks
//! it and pushes the new version:
//!
//! ```rust,ignore
//! let grid = round.fork_visible(GridKind::Main)?;
//! round.grid_mut(grid)?.set(x, y, wild)?;
//! round.push_grid(GridKind::Main, grid, self.id(), data.base_mut())?;
//! ```
//!
//! # Key Types
//!
//! - [`template::GameTemplate`] -- Immutable, `Sync` game definition.
//! - [`round::RoundContext`] -- Everything one round mutates.
//! - [`component::Component`] -- One unit of game behavior.
//! - [`data::ComponentData`] -- Per-component, per-scope mutable state.
//! - [`weights::WeightTable`] -- Prefix-sum weighted choice table.
//! - [`rng::RandomSource`] -- Randomness port; live and replay sources.
//! - [`grid::GridStacks`] -- Pooled, append-only grid stacks.
//! - [`award::Award`] -- Declarative side effects.
//! - [`callstack::CallStack`] -- Nested respin frames.
//! - [`serialize`] -- Versioned persisted data via bitcode.

pub mod award;
pub mod callstack;
pub mod command;
pub mod component;
pub mod components;
pub mod config;
pub mod data;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod factory;
pub mod fixed;
pub mod graph;
pub mod grid;
pub mod hooks;
pub mod id;
pub mod migration;
pub mod registry;
pub mod replay;
pub mod rng;
pub mod round;
pub mod runner;
pub mod serialize;
pub mod sim;
pub mod template;
pub mod validation;
pub mod values;
pub mod weights;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
