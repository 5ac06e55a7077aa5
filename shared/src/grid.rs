use std::fmt;

use serde::{Deserialize, Serialize};

/// One addressable unit of the logical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Key of the chunk containing this cell. Uses floor division so that
    /// negative coordinates land in negative chunks.
    pub const fn chunk(self, chunk_size: i32) -> ChunkKey {
        ChunkKey {
            x: self.x.div_euclid(chunk_size),
            y: self.y.div_euclid(chunk_size),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Identifies a `chunk_size` x `chunk_size` block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Inclusive cell range covered by this chunk.
    pub const fn cell_bounds(self, chunk_size: i32) -> CellBounds {
        let min_x = self.x.saturating_mul(chunk_size);
        let min_y = self.y.saturating_mul(chunk_size);
        CellBounds {
            min_x,
            max_x: min_x.saturating_add(chunk_size - 1),
            min_y,
            max_y: min_y.saturating_add(chunk_size - 1),
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Inclusive axis-aligned rectangle in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl CellBounds {
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// The `x >= 0, y >= 0` quadrant.
    pub const fn non_negative() -> Self {
        Self::new(0, i32::MAX, 0, i32::MAX)
    }

    /// Smallest bounds enclosing every cell in `cells`, or `None` if empty.
    pub fn enclosing(cells: impl IntoIterator<Item = Cell>) -> Option<Self> {
        let mut iter = cells.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.x, first.x, first.y, first.y);
        for cell in iter {
            bounds.min_x = bounds.min_x.min(cell.x);
            bounds.max_x = bounds.max_x.max(cell.x);
            bounds.min_y = bounds.min_y.min(cell.y);
            bounds.max_y = bounds.max_y.max(cell.y);
        }
        Some(bounds)
    }

    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x >= self.min_x && cell.x <= self.max_x && cell.y >= self.min_y && cell.y <= self.max_y
    }

    /// True when every cell of `other` lies inside `self`.
    pub const fn covers(&self, other: &CellBounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn intersection(&self, other: &CellBounds) -> Option<CellBounds> {
        let bounds = CellBounds {
            min_x: self.min_x.max(other.min_x),
            max_x: self.max_x.min(other.max_x),
            min_y: self.min_y.max(other.min_y),
            max_y: self.max_y.min(other.max_y),
        };
        (bounds.min_x <= bounds.max_x && bounds.min_y <= bounds.max_y).then_some(bounds)
    }

    pub const fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64 + 1
    }

    pub const fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64 + 1
    }

    /// Row-major iteration over every cell inside the bounds.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (self.min_x..=self.max_x)
            .flat_map(move |x| (self.min_y..=self.max_y).map(move |y| Cell::new(x, y)))
    }
}
