use crate::error::GrowthError;
use rayon::prelude::*;
use tumor_common::{CellState, GridSnapshot, Offset};

// Grids smaller than this are counted serially.
const PARALLEL_COUNT_THRESHOLD: usize = 1 << 16;

/// Fixed-size 2D grid of cell states, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthGrid {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl GrowthGrid {
    /// Creates an all-empty grid. Both dimensions must be positive.
    pub fn new(width: usize, height: usize) -> Result<Self, GrowthError> {
        if width == 0 || height == 0 {
            return Err(GrowthError::InvalidParameter {
                name: "grid dimensions",
                reason: format!("width and height must be positive, got {}x{}", width, height),
            });
        }
        let len = width.checked_mul(height).ok_or_else(|| GrowthError::InvalidParameter {
            name: "grid dimensions",
            reason: format!("{}x{} cells overflows usize", width, height),
        })?;
        Ok(Self {
            width,
            height,
            cells: vec![CellState::Empty; len],
        })
    }

    /// Creates a grid with a square tumor block of side `2 * half_size`
    /// centered at `(height / 2, width / 2)`.
    pub fn with_centered_tumor(width: usize, height: usize, half_size: usize) -> Result<Self, GrowthError> {
        let mut grid = Self::new(width, height)?;
        if half_size.saturating_mul(2) > width.min(height) {
            return Err(GrowthError::InvalidParameter {
                name: "initial_tumor_half_size",
                reason: format!(
                    "block side {} exceeds the smaller grid dimension {}",
                    half_size.saturating_mul(2),
                    width.min(height)
                ),
            });
        }
        grid.seed_block(height / 2, width / 2, half_size);
        Ok(grid)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> Result<usize, GrowthError> {
        if row < self.height && col < self.width {
            Ok(row * self.width + col)
        } else {
            Err(GrowthError::OutOfBounds {
                row,
                col,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Result<CellState, GrowthError> {
        let idx = self.index(row, col)?;
        Ok(self.cells[idx])
    }

    pub fn set(&mut self, row: usize, col: usize, state: CellState) -> Result<(), GrowthError> {
        let idx = self.index(row, col)?;
        self.cells[idx] = state;
        Ok(())
    }

    /// Marks `[center_row - half_size, center_row + half_size) x
    /// [center_col - half_size, center_col + half_size)` as tumor. Parts of the
    /// block that fall outside the grid are dropped.
    pub fn seed_block(&mut self, center_row: usize, center_col: usize, half_size: usize) {
        let row_start = center_row.saturating_sub(half_size).min(self.height);
        let row_end = center_row.saturating_add(half_size).min(self.height);
        let col_start = center_col.saturating_sub(half_size).min(self.width);
        let col_end = center_col.saturating_add(half_size).min(self.width);

        for row in row_start..row_end {
            let base = row * self.width;
            self.cells[base + col_start..base + col_end].fill(CellState::Tumor);
        }
    }

    pub fn count_tumor_cells(&self) -> usize {
        if self.cells.len() >= PARALLEL_COUNT_THRESHOLD {
            self.cells.par_iter().filter(|cell| cell.is_tumor()).count()
        } else {
            self.cells.iter().filter(|cell| cell.is_tumor()).count()
        }
    }

    /// Coordinates of the neighbor at `offset`, or `None` if it falls off the
    /// grid. Edges do not wrap.
    #[inline]
    pub fn neighbor(&self, row: usize, col: usize, offset: Offset) -> Option<(usize, usize)> {
        let (d_row, d_col) = offset;
        let n_row = row.checked_add_signed(d_row as isize)?;
        let n_col = col.checked_add_signed(d_col as isize)?;
        (n_row < self.height && n_col < self.width).then_some((n_row, n_col))
    }

    /// Iterates over `(row, col)` of every tumor cell in row-major order.
    pub fn tumor_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_tumor())
            .map(move |(idx, _)| (idx / width, idx % width))
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }
}
