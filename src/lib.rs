//! Stochastic cellular-automaton model of spatial tumor growth.
//!
//! [`GrowthGrid`] holds the cell states, [`GrowthEngine`] advances a grid one
//! synchronous step at a time, and [`GrowthSession`] ties a grid, an engine
//! and a seed together for a driver to own.

pub mod error;
pub mod grid;
pub mod output;
pub mod session;
pub mod simulation;

pub use error::GrowthError;
pub use grid::GrowthGrid;
pub use session::{GrowthSession, StepInputs};
pub use simulation::GrowthEngine;
pub use tumor_common::{CellState, GridSnapshot, GrowthParams, Neighborhood, Snapshot, StepMetrics};
