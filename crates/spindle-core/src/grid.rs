//! Grids, the grid pool, and the per-round grid stacks.
//!
//! # Ownership
//!
//! The [`GridPool`] is the sole allocator of grids. Everything else holds a
//! [`GridId`]. A grid is mutable only until it is pushed onto a
//! [`GridStack`]; at that point it is frozen and every later "change" is an
//! explicit [`GridStacks::fork`] (acquire-or-clone) followed by a push at a
//! new [`StackIndex`].
//!
//! Released grids keep their cell buffers in a free list. Keys are
//! generational, so a key from a previous round never resolves to a recycled
//! grid.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::id::{ComponentId, EMPTY_SYMBOL, GridId, StackIndex, SymbolCode};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid {0:?} not found in pool")]
    Missing(GridId),
    #[error("grid {0:?} is frozen; fork it before writing")]
    Frozen(GridId),
    #[error("grid {0:?} is already on a stack")]
    AlreadyStacked(GridId),
    #[error("cell ({x}, {y}) outside {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("{0:?} stack is empty")]
    EmptyStack(GridKind),
    #[error("{kind:?} stack has no index {index:?}")]
    BadIndex { kind: GridKind, index: StackIndex },
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            x: x as u16,
            y: y as u16,
        }
    }
}

/// Per-column metadata recorded by the component that produced the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Reel stop the column was filled from.
    pub stop: Option<u32>,
    /// Length of the reel strip the stop refers to.
    pub strip_len: Option<u32>,
}

/// A 2D array of symbol codes, stored column-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<SymbolCode>,
    columns: Vec<ColumnMeta>,
}

impl Grid {
    /// A grid with every cell set to [`EMPTY_SYMBOL`].
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![EMPTY_SYMBOL; width * height],
            columns: vec![ColumnMeta::default(); width],
        }
    }

    /// Build a grid from columns of raw codes. Columns must share a height.
    pub fn from_columns(columns: &[Vec<i32>]) -> Self {
        let width = columns.len();
        let height = columns.first().map(Vec::len).unwrap_or(0);
        let mut grid = Self::new(width, height);
        for (x, column) in columns.iter().enumerate() {
            for (y, &code) in column.iter().take(height).enumerate() {
                grid.cells[x * height + y] = SymbolCode(code);
            }
        }
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[SymbolCode] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<SymbolCode> {
        if x < self.width && y < self.height {
            Some(self.cells[x * self.height + y])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, symbol: SymbolCode) -> Result<(), GridError> {
        if x >= self.width || y >= self.height {
            return Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        self.cells[x * self.height + y] = symbol;
        Ok(())
    }

    pub fn column(&self, x: usize) -> &[SymbolCode] {
        let start = (x * self.height).min(self.cells.len());
        let end = (start + self.height).min(self.cells.len());
        &self.cells[start..end]
    }

    pub fn column_meta(&self, x: usize) -> Option<&ColumnMeta> {
        self.columns.get(x)
    }

    pub fn set_column_meta(&mut self, x: usize, meta: ColumnMeta) {
        if let Some(slot) = self.columns.get_mut(x) {
            *slot = meta;
        }
    }

    /// Number of cells holding any of `symbols`.
    pub fn count_any(&self, symbols: &[SymbolCode]) -> usize {
        self.cells.iter().filter(|c| symbols.contains(c)).count()
    }

    pub fn count(&self, symbol: SymbolCode) -> usize {
        self.count_any(&[symbol])
    }

    /// Positions holding any of `symbols`, column by column.
    pub fn positions_of(&self, symbols: &[SymbolCode]) -> Vec<Position> {
        let mut out = Vec::new();
        for x in 0..self.width {
            for y in 0..self.height {
                if symbols.contains(&self.cells[x * self.height + y]) {
                    out.push(Position::new(x, y));
                }
            }
        }
        out
    }

    /// Overwrite this grid with `other`, reusing the existing buffers.
    pub fn copy_from(&mut self, other: &Grid) {
        self.width = other.width;
        self.height = other.height;
        self.cells.clear();
        self.cells.extend_from_slice(&other.cells);
        self.columns.clear();
        self.columns.extend_from_slice(&other.columns);
    }

    /// Resize to `width` x `height` and clear every cell.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, EMPTY_SYMBOL);
        self.columns.clear();
        self.columns.resize(width, ColumnMeta::default());
    }
}

// ---------------------------------------------------------------------------
// GridPool
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PooledGrid {
    grid: Grid,
    frozen: bool,
}

/// Arena owning every grid of a round.
#[derive(Debug, Default)]
pub struct GridPool {
    grids: SlotMap<GridId, PooledGrid>,
    free: Vec<Grid>,
    allocated: u64,
    recycled: u64,
}

impl GridPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn take_buffer(&mut self, width: usize, height: usize) -> Grid {
        match self.free.pop() {
            Some(mut grid) => {
                self.recycled += 1;
                grid.reset(width, height);
                grid
            }
            None => {
                self.allocated += 1;
                Grid::new(width, height)
            }
        }
    }

    /// A fresh, writable, empty grid.
    pub fn acquire(&mut self, width: usize, height: usize) -> GridId {
        let grid = self.take_buffer(width, height);
        self.grids.insert(PooledGrid {
            grid,
            frozen: false,
        })
    }

    /// A writable grid holding a copy of `source`.
    pub fn acquire_or_clone(&mut self, source: GridId) -> Result<GridId, GridError> {
        let (width, height) = {
            let src = &self.grids.get(source).ok_or(GridError::Missing(source))?.grid;
            (src.width, src.height)
        };
        let mut grid = self.take_buffer(width, height);
        grid.copy_from(&self.grids[source].grid);
        Ok(self.grids.insert(PooledGrid {
            grid,
            frozen: false,
        }))
    }

    /// Insert an externally built grid (writable).
    pub fn insert(&mut self, grid: Grid) -> GridId {
        self.allocated += 1;
        self.grids.insert(PooledGrid {
            grid,
            frozen: false,
        })
    }

    pub fn get(&self, id: GridId) -> Option<&Grid> {
        self.grids.get(id).map(|p| &p.grid)
    }

    /// Mutable access, refused once the grid has been stacked.
    pub fn get_mut(&mut self, id: GridId) -> Result<&mut Grid, GridError> {
        let pooled = self.grids.get_mut(id).ok_or(GridError::Missing(id))?;
        if pooled.frozen {
            return Err(GridError::Frozen(id));
        }
        Ok(&mut pooled.grid)
    }

    pub fn is_frozen(&self, id: GridId) -> bool {
        self.grids.get(id).map(|p| p.frozen).unwrap_or(false)
    }

    fn freeze(&mut self, id: GridId) -> Result<(), GridError> {
        let pooled = self.grids.get_mut(id).ok_or(GridError::Missing(id))?;
        if pooled.frozen {
            return Err(GridError::AlreadyStacked(id));
        }
        pooled.frozen = true;
        Ok(())
    }

    /// Return a grid's storage to the free list.
    pub fn release(&mut self, id: GridId) {
        if let Some(pooled) = self.grids.remove(id) {
            self.free.push(pooled.grid);
        }
    }

    /// Release every live grid.
    pub fn release_all(&mut self) {
        let free = &mut self.free;
        for (_, pooled) in self.grids.drain() {
            free.push(pooled.grid);
        }
    }

    /// Number of live grids.
    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// Number of recyclable buffers.
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Grids built from scratch since creation.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// Grids served from the free list since creation.
    pub fn recycled(&self) -> u64 {
        self.recycled
    }
}

// ---------------------------------------------------------------------------
// GridStack
// ---------------------------------------------------------------------------

/// Which stack of a round a grid lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GridKind {
    /// The visible symbol grid.
    Main,
    /// Per-cell auxiliary values (multipliers, coin values).
    Other,
    /// Secondary grids some features keep alongside the main one.
    Side,
}

/// One version on a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    pub grid: GridId,
    pub producer: ComponentId,
    pub step: u32,
}

/// Append-only versions of one grid kind.
#[derive(Debug, Default)]
pub struct GridStack {
    entries: Vec<StackEntry>,
}

impl GridStack {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: StackEntry) -> StackIndex {
        let index = StackIndex(self.entries.len() as u32);
        self.entries.push(entry);
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: StackIndex) -> Option<&StackEntry> {
        self.entries.get(index.index())
    }

    /// The most recent version.
    pub fn top(&self) -> Option<StackIndex> {
        self.entries
            .len()
            .checked_sub(1)
            .map(|i| StackIndex(i as u32))
    }

    /// The version `n` steps back from the top (`back(0) == top()`).
    pub fn back(&self, n: usize) -> Option<StackIndex> {
        self.entries
            .len()
            .checked_sub(n + 1)
            .map(|i| StackIndex(i as u32))
    }

    /// The most recent version pushed by `producer`.
    pub fn last_from(&self, producer: ComponentId) -> Option<StackIndex> {
        self.entries
            .iter()
            .rposition(|e| e.producer == producer)
            .map(|i| StackIndex(i as u32))
    }

    /// Resolve the version visible to a step.
    ///
    /// `current` holds what the step has pushed so far; `prior` holds what
    /// earlier scopes saw (the grid in place when a respin was entered, for
    /// instance), oldest first. Falls back to the stack top.
    pub fn top_ex(&self, current: &[StackIndex], prior: &[StackIndex]) -> Option<StackIndex> {
        current
            .iter()
            .rev()
            .chain(prior.iter().rev())
            .copied()
            .find(|i| i.index() < self.entries.len())
            .or_else(|| self.top())
    }

    pub fn iter(&self) -> impl Iterator<Item = (StackIndex, &StackEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (StackIndex(i as u32), e))
    }
}

// ---------------------------------------------------------------------------
// GridStacks
// ---------------------------------------------------------------------------

/// The pool plus one stack per [`GridKind`].
#[derive(Debug, Default)]
pub struct GridStacks {
    pub pool: GridPool,
    main: GridStack,
    other: GridStack,
    side: GridStack,
}

impl GridStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack(&self, kind: GridKind) -> &GridStack {
        match kind {
            GridKind::Main => &self.main,
            GridKind::Other => &self.other,
            GridKind::Side => &self.side,
        }
    }

    fn stack_mut(&mut self, kind: GridKind) -> &mut GridStack {
        match kind {
            GridKind::Main => &mut self.main,
            GridKind::Other => &mut self.other,
            GridKind::Side => &mut self.side,
        }
    }

    /// Freeze `grid` and append it as the newest version of `kind`.
    pub fn push(
        &mut self,
        kind: GridKind,
        grid: GridId,
        producer: ComponentId,
        step: u32,
    ) -> Result<StackIndex, GridError> {
        self.pool.freeze(grid)?;
        Ok(self.stack_mut(kind).push(StackEntry {
            grid,
            producer,
            step,
        }))
    }

    /// Writable copy of the version at `index`.
    pub fn fork(&mut self, kind: GridKind, index: StackIndex) -> Result<GridId, GridError> {
        let source = self
            .stack(kind)
            .get(index)
            .ok_or(GridError::BadIndex { kind, index })?
            .grid;
        self.pool.acquire_or_clone(source)
    }

    pub fn grid_at(&self, kind: GridKind, index: StackIndex) -> Result<&Grid, GridError> {
        let entry = self
            .stack(kind)
            .get(index)
            .ok_or(GridError::BadIndex { kind, index })?;
        self.pool.get(entry.grid).ok_or(GridError::Missing(entry.grid))
    }

    pub fn top_grid(&self, kind: GridKind) -> Option<&Grid> {
        let index = self.stack(kind).top()?;
        self.grid_at(kind, index).ok()
    }

    /// [`GridStack::top_ex`] followed by the grid lookup.
    pub fn resolve(
        &self,
        kind: GridKind,
        current: &[StackIndex],
        prior: &[StackIndex],
    ) -> Result<(StackIndex, &Grid), GridError> {
        let index = self
            .stack(kind)
            .top_ex(current, prior)
            .ok_or(GridError::EmptyStack(kind))?;
        Ok((index, self.grid_at(kind, index)?))
    }

    /// Drop every version and release all grids to the pool.
    pub fn clear(&mut self) {
        self.main.entries.clear();
        self.other.entries.clear();
        self.side.entries.clear();
        self.pool.release_all();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
