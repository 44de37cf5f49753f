use serde::{Deserialize, Serialize};

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellState {
    #[default]
    Empty = 0,
    Tumor = 1,
}

impl CellState {
    #[inline]
    pub fn is_tumor(self) -> bool {
        self == CellState::Tumor
    }

    /// Value used by renderers: `Empty -> 0.0`, `Tumor -> 1.0`.
    #[inline]
    pub fn intensity(self) -> f32 {
        match self {
            CellState::Empty => 0.0,
            CellState::Tumor => 1.0,
        }
    }
}

/// An immutable copy of the grid, safe to hand to renderers after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    /// Row-major cell states, `height * width` entries.
    pub cells: Vec<CellState>,
}

impl GridSnapshot {
    pub fn get(&self, row: usize, col: usize) -> Option<CellState> {
        if row < self.height && col < self.width {
            self.cells.get(row * self.width + col).copied()
        } else {
            None
        }
    }

    /// Iterates over the grid one row at a time.
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> + '_ {
        self.cells.chunks(self.width.max(1))
    }

    /// The grid as a `[row][col]` matrix of 0.0/1.0 values, the shape heatmap
    /// and surface renderers expect.
    pub fn intensity(&self) -> Vec<Vec<f32>> {
        self.rows()
            .map(|row| row.iter().map(|cell| cell.intensity()).collect())
            .collect()
    }

    pub fn tumor_cell_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_tumor()).count()
    }
}

/// Metrics derived from the grid right after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Index of the step that produced this state (0-based).
    pub step_index: u32,
    pub tumor_cell_count: usize,
    /// Tumor cells per elapsed step: `tumor_cell_count / (step_index + 1)`.
    pub growth_rate: f64,
    /// Share of the grid occupied by tumor, in percent.
    pub percentage_growth: f64,
}

impl StepMetrics {
    pub fn from_count(step_index: u32, tumor_cell_count: usize, total_cells: usize) -> Self {
        let growth_rate = tumor_cell_count as f64 / (step_index as f64 + 1.0);
        let percentage_growth = if total_cells > 0 {
            tumor_cell_count as f64 / total_cells as f64 * 100.0
        } else {
            0.0
        };
        Self {
            step_index,
            tumor_cell_count,
            growth_rate,
            percentage_growth,
        }
    }
}

/// A recorded point of a run: the metrics of one step, the parameters the
/// driver supplied for it and, optionally, the grid it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metrics: StepMetrics,
    pub proliferation_rate: f64,
    pub nutrient_availability: f64,
    /// Present only if `output.save_grid_in_snapshot` was set for the run.
    pub grid: Option<GridSnapshot>,
}
