//! Nested respin scopes.
//!
//! Each [`CallFrame`] is one active respin loop: its own component-data
//! namespace, remaining-iteration counter, and win accumulators. Frames
//! nest without limit; the innermost frame is the current scope.

use crate::data::DataScope;
use crate::fixed::{Coins, Fixed64};
use crate::grid::GridKind;
use crate::id::{ComponentId, StackIndex};

// ---------------------------------------------------------------------------
// ScopeGrids
// ---------------------------------------------------------------------------

/// Grid versions pushed within one scope, per grid kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeGrids {
    main: Vec<StackIndex>,
    other: Vec<StackIndex>,
    side: Vec<StackIndex>,
}

impl ScopeGrids {
    pub fn get(&self, kind: GridKind) -> &[StackIndex] {
        match kind {
            GridKind::Main => &self.main,
            GridKind::Other => &self.other,
            GridKind::Side => &self.side,
        }
    }

    pub fn push(&mut self, kind: GridKind, index: StackIndex) {
        match kind {
            GridKind::Main => self.main.push(index),
            GridKind::Other => self.other.push(index),
            GridKind::Side => self.side.push(index),
        }
    }

    /// Latest version of `kind` in this scope.
    pub fn last(&self, kind: GridKind) -> Option<StackIndex> {
        self.get(kind).last().copied()
    }

    pub fn clear(&mut self) {
        self.main.clear();
        self.other.clear();
        self.side.clear();
    }
}

// ---------------------------------------------------------------------------
// CallFrame
// ---------------------------------------------------------------------------

/// One active respin loop.
#[derive(Debug, Clone)]
pub struct CallFrame {
    /// The respin component that owns the loop.
    pub respin: ComponentId,
    /// Component each iteration starts at.
    pub first: ComponentId,
    /// Where the enclosing scope resumes once the loop is exhausted.
    pub return_to: Option<ComponentId>,
    pub remaining: u32,
    pub total: u32,
    pub completed: u32,
    pub data: DataScope,
    /// Versions pushed inside this frame.
    pub grids: ScopeGrids,
    /// Versions visible when the frame was entered.
    pub entry_grids: ScopeGrids,
    pub coin_win: Coins,
    pub cash_win: Fixed64,
}

/// What a finished frame hands back to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSummary {
    pub respin: ComponentId,
    pub iterations: u32,
    pub coin_win: Coins,
    pub cash_win: Fixed64,
    pub return_to: Option<ComponentId>,
}

// ---------------------------------------------------------------------------
// CallStack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for `respin`.
    pub fn enter(
        &mut self,
        respin: ComponentId,
        iterations: u32,
        first: ComponentId,
        return_to: Option<ComponentId>,
        entry_grids: ScopeGrids,
        components: usize,
    ) {
        self.frames.push(CallFrame {
            respin,
            first,
            return_to,
            remaining: iterations,
            total: iterations,
            completed: 0,
            data: DataScope::new(components),
            grids: ScopeGrids::default(),
            entry_grids,
            coin_win: 0,
            cash_win: Fixed64::ZERO,
        });
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Frames, outermost first.
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [CallFrame] {
        &mut self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost frame owned by `respin`.
    pub fn find_mut(&mut self, respin: ComponentId) -> Option<&mut CallFrame> {
        self.frames.iter_mut().rev().find(|f| f.respin == respin)
    }

    /// Add iterations to the innermost frame of `respin`. Returns whether
    /// such a frame was active.
    pub fn extend(&mut self, respin: ComponentId, iterations: u32) -> bool {
        match self.find_mut(respin) {
            Some(frame) => {
                frame.remaining = frame.remaining.saturating_add(iterations);
                frame.total = frame.total.saturating_add(iterations);
                true
            }
            None => false,
        }
    }

    /// Finish one iteration of the active frame. Returns `Some(true)` once
    /// the frame is exhausted, `None` with no active frame.
    pub fn tick(&mut self) -> Option<bool> {
        let frame = self.frames.last_mut()?;
        frame.remaining = frame.remaining.saturating_sub(1);
        frame.completed += 1;
        Some(frame.remaining == 0)
    }

    /// Pop the active frame, merging its win accumulators into the parent
    /// frame. The caller merges into the respin component's data.
    pub fn exit(&mut self) -> Option<(FrameSummary, CallFrame)> {
        let frame = self.frames.pop()?;
        if let Some(parent) = self.frames.last_mut() {
            parent.coin_win = parent.coin_win.saturating_add(frame.coin_win);
            parent.cash_win = parent.cash_win.saturating_add(frame.cash_win);
        }
        let summary = FrameSummary {
            respin: frame.respin,
            iterations: frame.completed,
            coin_win: frame.coin_win,
            cash_win: frame.cash_win,
            return_to: frame.return_to,
        };
        Some((summary, frame))
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
