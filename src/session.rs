use crate::error::GrowthError;
use crate::grid::GrowthGrid;
use crate::simulation::GrowthEngine;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tumor_common::{GridSnapshot, GrowthParams, Snapshot, SimulationConfig, StepMetrics};

/// Furthest a single `seek` may run ahead of the applied steps.
pub const MAX_SEEK_AHEAD: usize = 1_000_000;

/// The rates supplied for one applied step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepInputs {
    pub proliferation_rate: f64,
    pub nutrient_availability: f64,
}

/// One simulation run: the grid, the engine stepping it, and everything needed
/// to rebuild any earlier state from scratch.
///
/// The grid always reflects exactly `steps_taken()` applied steps. Asking for
/// an earlier step rebuilds the grid from the seed and replays the recorded
/// inputs rather than stepping the current state further.
pub struct GrowthSession {
    width: usize,
    height: usize,
    initial_tumor_half_size: usize,
    params: GrowthParams,
    seed: u64,
    grid: GrowthGrid,
    engine: GrowthEngine,
    history: Vec<StepInputs>,
    save_grid_in_snapshot: bool,
    recorded_snapshots: Vec<Snapshot>,
}

impl GrowthSession {
    /// Builds a session from a validated configuration. Without a configured
    /// seed one is drawn once from OS entropy and kept for replays.
    pub fn new(config: &SimulationConfig) -> Result<Self, GrowthError> {
        let seed = match config.run.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random::<u64>();
                info!("No seed configured, using generated seed {}.", seed);
                seed
            }
        };
        Self::with_seed(config, seed)
    }

    pub fn with_seed(config: &SimulationConfig, seed: u64) -> Result<Self, GrowthError> {
        let grid_config = &config.grid;
        let params = config.growth_params();
        let grid = GrowthGrid::with_centered_tumor(
            grid_config.width,
            grid_config.height,
            grid_config.initial_tumor_half_size,
        )?;
        let engine = GrowthEngine::with_seed(params.clone(), seed)?;

        Ok(Self {
            width: grid_config.width,
            height: grid_config.height,
            initial_tumor_half_size: grid_config.initial_tumor_half_size,
            params,
            seed,
            grid,
            engine,
            history: Vec::new(),
            save_grid_in_snapshot: config.output.save_grid_in_snapshot,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Applies the next step, indexed by the number of steps taken so far.
    pub fn step(&mut self, proliferation_rate: f64, nutrient_availability: f64) -> Result<StepMetrics, GrowthError> {
        let step_index = u32::try_from(self.history.len()).map_err(|_| GrowthError::InvalidParameter {
            name: "step_index",
            reason: format!("step index {} does not fit in u32", self.history.len()),
        })?;
        let metrics = self
            .engine
            .step(&mut self.grid, step_index, proliferation_rate, nutrient_availability)?;
        self.history.push(StepInputs {
            proliferation_rate,
            nutrient_availability,
        });
        Ok(metrics)
    }

    /// Brings the grid to the state right after step `step_index`.
    ///
    /// Moving backwards (or revisiting an applied step) rebuilds from the seed
    /// and replays recorded inputs up to and including `step_index`. Moving
    /// forwards applies the given rates to every missing step.
    pub fn seek(
        &mut self,
        step_index: u32,
        proliferation_rate: f64,
        nutrient_availability: f64,
    ) -> Result<StepMetrics, GrowthError> {
        let target = step_index as usize + 1;
        if target <= self.history.len() {
            debug!("Replaying {} steps from seed {}.", target, self.seed);
            let mut replay: Vec<StepInputs> = self.history[..target].to_vec();
            // Only the last step picks up the requested rates.
            if let Some(last) = replay.last_mut() {
                last.proliferation_rate = proliferation_rate;
                last.nutrient_availability = nutrient_availability;
            }
            self.reset()?;
            let mut metrics = None;
            for inputs in replay {
                metrics = Some(self.step(inputs.proliferation_rate, inputs.nutrient_availability)?);
            }
            // `target` is at least 1, so the loop ran.
            metrics.ok_or_else(|| GrowthError::InvalidParameter {
                name: "step_index",
                reason: "nothing to replay".to_string(),
            })
        } else {
            let ahead = target - self.history.len();
            if ahead > MAX_SEEK_AHEAD {
                return Err(GrowthError::InvalidParameter {
                    name: "step_index",
                    reason: format!(
                        "step {} is {} steps ahead of the session, at most {} allowed",
                        step_index, ahead, MAX_SEEK_AHEAD
                    ),
                });
            }
            let mut metrics = self.step(proliferation_rate, nutrient_availability)?;
            while self.history.len() < target {
                metrics = self.step(proliferation_rate, nutrient_availability)?;
            }
            Ok(metrics)
        }
    }

    /// Rebuilds the seeded grid and generator, dropping the step history.
    /// Recorded snapshots are kept.
    pub fn reset(&mut self) -> Result<(), GrowthError> {
        self.grid = GrowthGrid::with_centered_tumor(self.width, self.height, self.initial_tumor_half_size)?;
        self.engine = GrowthEngine::with_seed(self.params.clone(), self.seed)?;
        self.history.clear();
        Ok(())
    }

    /// Stores the metrics of the latest step together with its inputs and,
    /// if configured, a copy of the grid. Fails if no step has been applied.
    pub fn record_snapshot(&mut self, metrics: StepMetrics) -> Result<(), GrowthError> {
        let Some(inputs) = self.history.last().copied() else {
            return Err(GrowthError::InvalidParameter {
                name: "record_snapshot",
                reason: "no step has been applied yet".to_string(),
            });
        };
        let grid = self.save_grid_in_snapshot.then(|| self.grid.snapshot());
        self.recorded_snapshots.push(Snapshot {
            metrics,
            proliferation_rate: inputs.proliferation_rate,
            nutrient_availability: inputs.nutrient_availability,
            grid,
        });
        Ok(())
    }

    pub fn recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }

    pub fn grid(&self) -> &GrowthGrid {
        &self.grid
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.grid.snapshot()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn params(&self) -> &GrowthParams {
        &self.params
    }

    pub fn history(&self) -> &[StepInputs] {
        &self.history
    }

    pub fn steps_taken(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumor_common::Neighborhood;

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.grid.width = 30;
        config.grid.height = 20;
        config.grid.initial_tumor_half_size = 2;
        config.growth.neighborhood = Neighborhood::Moore;
        config
    }

    #[test]
    fn test_step_indices_follow_history() {
        let mut session = GrowthSession::with_seed(&config(), 11).unwrap();
        assert_eq!(session.grid().count_tumor_cells(), 16);

        let first = session.step(0.4, 0.9).unwrap();
        let second = session.step(0.4, 0.01).unwrap();
        assert_eq!(first.step_index, 0);
        assert_eq!(second.step_index, 1);
        // Starved second step.
        assert_eq!(first.tumor_cell_count, second.tumor_cell_count);
        assert_eq!(session.steps_taken(), 2);
        assert_eq!(
            session.history()[1],
            StepInputs { proliferation_rate: 0.4, nutrient_availability: 0.01 }
        );
    }

    #[test]
    fn test_seek_backwards_replays_from_seed() {
        let mut session = GrowthSession::with_seed(&config(), 21).unwrap();
        let mut states = Vec::new();
        for _ in 0..6 {
            session.step(0.35, 0.8).unwrap();
            states.push(session.snapshot());
        }

        let metrics = session.seek(2, 0.35, 0.8).unwrap();
        assert_eq!(metrics.step_index, 2);
        assert_eq!(session.steps_taken(), 3);
        assert_eq!(session.snapshot(), states[2]);

        // Stepping on from the replayed state retraces the original run.
        session.step(0.35, 0.8).unwrap();
        assert_eq!(session.snapshot(), states[3]);
    }

    #[test]
    fn test_seek_forward_fills_missing_steps() {
        let mut session = GrowthSession::with_seed(&config(), 5).unwrap();
        let metrics = session.seek(4, 1.0, 1.0).unwrap();
        assert_eq!(metrics.step_index, 4);
        assert_eq!(session.steps_taken(), 5);
        // 4x4 seed grows by one ring per step under Moore at rate 1.
        assert_eq!(metrics.tumor_cell_count, 14 * 14);
    }

    #[test]
    fn test_reset_restores_seeded_grid() {
        let mut session = GrowthSession::with_seed(&config(), 8).unwrap();
        let initial = session.snapshot();
        session.step(1.0, 1.0).unwrap();
        assert_ne!(session.snapshot(), initial);

        session.reset().unwrap();
        assert_eq!(session.snapshot(), initial);
        assert_eq!(session.steps_taken(), 0);
    }

    #[test]
    fn test_record_snapshot_honors_grid_flag() {
        let mut config = config();
        let mut session = GrowthSession::with_seed(&config, 3).unwrap();
        let metrics = session.step(0.5, 0.5).unwrap();
        session.record_snapshot(metrics).unwrap();
        let recorded = &session.recorded_snapshots()[0];
        assert_eq!(recorded.metrics, metrics);
        assert_eq!(recorded.proliferation_rate, 0.5);
        assert_eq!(recorded.grid.as_ref().map(|g| g.tumor_cell_count()), Some(metrics.tumor_cell_count));

        config.output.save_grid_in_snapshot = false;
        let mut session = GrowthSession::with_seed(&config, 3).unwrap();
        let metrics = session.step(0.5, 0.5).unwrap();
        session.record_snapshot(metrics).unwrap();
        assert!(session.recorded_snapshots()[0].grid.is_none());
    }

    #[test]
    fn test_record_snapshot_requires_a_step() {
        let mut session = GrowthSession::with_seed(&config(), 4).unwrap();
        let metrics = StepMetrics::from_count(0, 16, 600);
        let err = session.record_snapshot(metrics).unwrap_err();
        assert!(matches!(err, GrowthError::InvalidParameter { name: "record_snapshot", .. }));
        assert!(session.recorded_snapshots().is_empty());
    }

    #[test]
    fn test_seek_too_far_ahead_is_rejected() {
        let mut session = GrowthSession::with_seed(&config(), 6).unwrap();
        let before = session.snapshot();
        let err = session.seek(u32::MAX, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, GrowthError::InvalidParameter { name: "step_index", .. }));
        assert_eq!(session.steps_taken(), 0);
        assert_eq!(session.snapshot(), before);

        session.seek(2, 0.5, 0.5).unwrap();
        assert_eq!(session.steps_taken(), 3);
    }

    #[test]
    fn test_invalid_step_leaves_history_untouched() {
        let mut session = GrowthSession::with_seed(&config(), 1).unwrap();
        assert!(session.step(2.0, 0.5).is_err());
        assert_eq!(session.steps_taken(), 0);
    }
}
