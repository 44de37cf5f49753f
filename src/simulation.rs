use crate::error::{check_unit_interval, GrowthError};
use crate::grid::GrowthGrid;
use log::{debug, trace};
use rand::prelude::*;
use tumor_common::{CellState, GrowthParams, StepMetrics};

/// Applies the proliferation rule to a grid, one synchronous step at a time.
///
/// The engine holds the fixed growth rules and the single random generator all
/// colonization draws come from. It keeps no grid state of its own: the caller
/// owns the grid and lends it to [`GrowthEngine::step`].
#[derive(Debug, Clone)]
pub struct GrowthEngine<R = StdRng> {
    params: GrowthParams,
    rng: R,
}

impl GrowthEngine<StdRng> {
    /// Creates an engine whose generator is seeded from OS entropy.
    pub fn new(params: GrowthParams) -> Result<Self, GrowthError> {
        Self::with_rng(params, StdRng::from_os_rng())
    }

    /// Creates an engine with a reproducible generator.
    pub fn with_seed(params: GrowthParams, seed: u64) -> Result<Self, GrowthError> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GrowthEngine<R> {
    /// Creates an engine drawing from a caller-supplied generator.
    pub fn with_rng(params: GrowthParams, rng: R) -> Result<Self, GrowthError> {
        check_unit_interval("nutrient_threshold", params.nutrient_threshold)?;
        if params.neighbor_offsets.is_empty() {
            return Err(GrowthError::InvalidParameter {
                name: "neighbor_offsets",
                reason: "at least one offset is required".to_string(),
            });
        }
        if params.neighbor_offsets.contains(&(0, 0)) {
            return Err(GrowthError::InvalidParameter {
                name: "neighbor_offsets",
                reason: "(0, 0) is not a neighbor".to_string(),
            });
        }
        Ok(Self { params, rng })
    }

    pub fn params(&self) -> &GrowthParams {
        &self.params
    }

    /// Advances `grid` by one step and returns the metrics of the new state.
    ///
    /// Every decision reads the grid as it was when the call started; new
    /// tumor cells are written to a copy that replaces `grid` in one assignment
    /// at the end. Invalid rates are rejected before anything is touched.
    pub fn step(
        &mut self,
        grid: &mut GrowthGrid,
        step_index: u32,
        proliferation_rate: f64,
        nutrient_availability: f64,
    ) -> Result<StepMetrics, GrowthError> {
        check_unit_interval("proliferation_rate", proliferation_rate)?;
        check_unit_interval("nutrient_availability", nutrient_availability)?;

        let mut next_grid = grid.clone();

        if nutrient_availability <= self.params.nutrient_threshold {
            debug!(
                "Step {}: nutrient availability {:.3} at or below threshold {:.3}, no growth.",
                step_index, nutrient_availability, self.params.nutrient_threshold
            );
        } else {
            let colonized = self.proliferate(grid, &mut next_grid, proliferation_rate)?;
            trace!("Step {}: {} cells colonized.", step_index, colonized);
        }

        *grid = next_grid;

        Ok(StepMetrics::from_count(
            step_index,
            grid.count_tumor_cells(),
            grid.total_cells(),
        ))
    }

    /// Runs one independent trial per (tumor cell, empty in-bounds neighbor)
    /// pair of `current`, writing successes into `next`. Returns the number of
    /// cells that changed from empty to tumor.
    fn proliferate(
        &mut self,
        current: &GrowthGrid,
        next: &mut GrowthGrid,
        proliferation_rate: f64,
    ) -> Result<usize, GrowthError> {
        let mut colonized = 0;
        for (row, col) in current.tumor_cells() {
            for &offset in &self.params.neighbor_offsets {
                let Some((n_row, n_col)) = current.neighbor(row, col, offset) else {
                    continue;
                };
                if current.get(n_row, n_col)? != CellState::Empty {
                    continue;
                }
                if self.rng.random::<f64>() < proliferation_rate
                    && next.get(n_row, n_col)? == CellState::Empty
                {
                    next.set(n_row, n_col, CellState::Tumor)?;
                    colonized += 1;
                }
            }
        }
        Ok(colonized)
    }
}
