//! Occupancy grid and first-fit placement solver.
//!
//! DESIGN
//! ======
//! Placement builds a transient `max_rows × cols` boolean matrix from the
//! blocks already on a breakpoint, then scans candidate origins row-major
//! (`y` outer, `x` inner) for the first rectangle that is entirely free.
//! The matrix exists only for the duration of one search.
//!
//! The row ceiling bounds the search, not the layout. Running out of rows is
//! reported as [`PlaceError::Exhausted`] so callers can pick their own
//! fallback instead of silently receiving `(0, 0)`.

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use serde::{Deserialize, Serialize};

use crate::block::Block;

/// Top-left cell of a block, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

/// Size of a block to be placed, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub w: u32,
    pub h: u32,
}

/// Search area for placement: breakpoint column count and row ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub cols: u32,
    pub max_rows: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaceError {
    #[error("footprint must be at least 1x1")]
    EmptyFootprint,
    #[error("footprint width {w} exceeds {cols} columns")]
    TooWide { w: u32, cols: u32 },
    #[error("no free space within {max_rows} rows")]
    Exhausted { max_rows: u32 },
}

/// Boolean occupancy matrix for one breakpoint.
pub struct OccupancyGrid {
    cols: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    /// Create an empty grid covering `bounds`.
    #[must_use]
    pub fn new(bounds: GridBounds) -> Self {
        let len = bounds.cols as usize * bounds.max_rows as usize;
        Self { cols: bounds.cols, rows: bounds.max_rows, cells: vec![false; len] }
    }

    /// Build a grid with every cell covered by `blocks` marked.
    #[must_use]
    pub fn from_blocks(blocks: &[Block], bounds: GridBounds) -> Self {
        let mut grid = Self::new(bounds);
        for block in blocks {
            grid.mark(GridPos { x: block.x, y: block.y }, Footprint { w: block.w, h: block.h });
        }
        grid
    }

    /// Mark the rectangle `[x, x+w) × [y, y+h)`. Cells outside the grid are ignored.
    pub fn mark(&mut self, pos: GridPos, size: Footprint) {
        let x_end = pos.x.saturating_add(size.w).min(self.cols);
        let y_end = pos.y.saturating_add(size.h).min(self.rows);
        for y in pos.y..y_end {
            for x in pos.x..x_end {
                let idx = self.index(x, y);
                self.cells[idx] = true;
            }
        }
    }

    /// Whether the cell at `(x, y)` is covered. Cells outside the grid read as free.
    #[must_use]
    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        x < self.cols && y < self.rows && self.cells[self.index(x, y)]
    }

    /// Whether `size` placed at `pos` lies inside the grid and covers no marked cell.
    #[must_use]
    pub fn is_free(&self, pos: GridPos, size: Footprint) -> bool {
        let (Some(x_end), Some(y_end)) = (pos.x.checked_add(size.w), pos.y.checked_add(size.h)) else {
            return false;
        };
        if x_end > self.cols || y_end > self.rows {
            return false;
        }
        (pos.y..y_end).all(|y| (pos.x..x_end).all(|x| !self.cells[self.index(x, y)]))
    }

    /// First free origin for `size` in row-major order.
    #[must_use]
    pub fn first_fit(&self, size: Footprint) -> Option<GridPos> {
        if size.w > self.cols || size.h > self.rows {
            return None;
        }
        for y in 0..=self.rows - size.h {
            for x in 0..=self.cols - size.w {
                let pos = GridPos { x, y };
                if self.is_free(pos, size) {
                    return Some(pos);
                }
            }
        }
        None
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.cols as usize + x as usize
    }
}

/// Find the first free top-left coordinate for `footprint` among `existing`.
///
/// # Errors
///
/// - [`PlaceError::EmptyFootprint`] for a zero-sized footprint.
/// - [`PlaceError::TooWide`] when the footprint is wider than `bounds.cols`.
/// - [`PlaceError::Exhausted`] when nothing fits above `bounds.max_rows`.
pub fn place(existing: &[Block], footprint: Footprint, bounds: GridBounds) -> Result<GridPos, PlaceError> {
    if footprint.w == 0 || footprint.h == 0 {
        return Err(PlaceError::EmptyFootprint);
    }
    if footprint.w > bounds.cols {
        return Err(PlaceError::TooWide { w: footprint.w, cols: bounds.cols });
    }
    OccupancyGrid::from_blocks(existing, bounds)
        .first_fit(footprint)
        .ok_or(PlaceError::Exhausted { max_rows: bounds.max_rows })
}

/// First row below every block in `blocks`; `0` for an empty layout.
#[must_use]
pub fn bottom_extent(blocks: &[Block]) -> u32 {
    blocks.iter().map(Block::bottom).max().unwrap_or(0)
}
