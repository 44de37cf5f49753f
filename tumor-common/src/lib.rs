pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{GridConfig, GrowthConfig, OutputConfig, OutputFormat, RunConfig, ScheduleEntry, SimulationConfig};
pub use sim_params::{GrowthParams, Neighborhood, Offset, MOORE_OFFSETS, VON_NEUMANN_OFFSETS};
pub use snapshot::{CellState, GridSnapshot, Snapshot, StepMetrics};
