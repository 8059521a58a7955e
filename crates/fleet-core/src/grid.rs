//! Integer grid coordinates and Manhattan-metric helpers.
//!
//! The service area is a bounded `size × size` lattice.  Every cost in the
//! simulator (assignment scoring, leg miles) is a Manhattan distance, so one
//! grid cell is treated as one mile.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── GridPos ───────────────────────────────────────────────────────────────────

/// A cell on the city grid.
///
/// Serialized as a two-element JSON array `[x, y]`, the layout external
/// readers expect inside a stored route.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `|x1 - x2| + |y1 - y2|`.
    #[inline]
    pub fn manhattan(self, other: GridPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(i32, i32)> for GridPos {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<GridPos> for (i32, i32) {
    fn from(p: GridPos) -> Self {
        (p.x, p.y)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// The bounded square service area.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    pub size: i32,
}

impl Grid {
    #[inline]
    pub const fn new(size: i32) -> Self {
        Self { size }
    }

    /// `true` if `pos` lies inside `[0, size) × [0, size)`.
    #[inline]
    pub fn contains(self, pos: GridPos) -> bool {
        (0..self.size).contains(&pos.x) && (0..self.size).contains(&pos.y)
    }

    /// The whole grid as a half-open rectangle.
    pub fn bounds(self) -> GridRect {
        GridRect::new(0..self.size, 0..self.size)
    }

    /// Single-cell lateral evasion around a blocked cell.
    ///
    /// Steps one cell east unless `pos` sits on the right edge, in which case
    /// it steps west.  `y` is never changed.  Stays on the grid for any
    /// `size >= 2`, which config validation enforces.
    #[inline]
    pub fn detour(self, pos: GridPos) -> GridPos {
        if pos.x < self.size - 1 {
            GridPos::new(pos.x + 1, pos.y)
        } else {
            GridPos::new(pos.x - 1, pos.y)
        }
    }
}

// ── GridRect ──────────────────────────────────────────────────────────────────

/// A half-open sub-rectangle `[x0, x1) × [y0, y1)` of the grid.
///
/// Used for the high-density "downtown" order region.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct GridRect {
    pub x: std::ops::Range<i32>,
    pub y: std::ops::Range<i32>,
}

impl GridRect {
    pub fn new(x: std::ops::Range<i32>, y: std::ops::Range<i32>) -> Self {
        Self { x, y }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty()
    }

    #[inline]
    pub fn contains(&self, pos: GridPos) -> bool {
        self.x.contains(&pos.x) && self.y.contains(&pos.y)
    }

    /// `true` if every cell of `self` is inside `grid`.
    pub fn within(&self, grid: Grid) -> bool {
        !self.is_empty()
            && self.x.start >= 0
            && self.y.start >= 0
            && self.x.end <= grid.size
            && self.y.end <= grid.size
    }
}
