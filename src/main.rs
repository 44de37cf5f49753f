use anyhow::Result;
use clap::Parser;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

use tumor_common::SimulationConfig;
use tumor_growth::output::{write_metrics_csv, write_snapshots};
use tumor_growth::GrowthSession;

/// Runs the tumor growth automaton from a TOML configuration.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides run.seed from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides run.total_steps from the config
    #[arg(long)]
    steps: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();

    let args = Args::parse();
    info!("Starting Tumor Growth Simulator...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.run.seed = Some(seed);
    }
    if let Some(steps) = args.steps {
        config.run.total_steps = steps;
    }

    // --- Initialize Session ---
    let mut session = GrowthSession::new(&config)?;
    info!(
        "Grid {}x{} seeded with {} tumor cells (seed {}).",
        config.grid.width,
        config.grid.height,
        session.grid().count_tumor_cells(),
        session.seed()
    );
    debug!("Growth parameters: {:#?}", session.params());

    let total_steps = config.run.total_steps;
    let record_interval_steps = config.run.record_interval_steps;
    if total_steps == 0 {
        warn!("run.total_steps is 0, nothing to simulate.");
    }

    // --- Simulation Loop ---
    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();

    for step in 0..total_steps {
        let (proliferation_rate, nutrient_availability) = config.run.parameters_at(step);
        let step_start_time = Instant::now();
        let metrics = match session.step(proliferation_rate, nutrient_availability) {
            Ok(metrics) => metrics,
            Err(e) => {
                error!("Error during simulation step {}: {}", step, e);
                anyhow::bail!("Simulation step failed.");
            }
        };
        let step_duration = step_start_time.elapsed();

        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step == total_steps - 1;

        if is_record_step || is_last_step {
            info!(
                "Step [{}/{}] | Tumor cells: {} ({:.2}%) | Growth rate: {:.2} cells/step | Rate: {:.2} | Nutrient: {:.2}",
                step + 1,
                total_steps,
                metrics.tumor_cell_count,
                metrics.percentage_growth,
                metrics.growth_rate,
                proliferation_rate,
                nutrient_availability
            );
            session.record_snapshot(metrics)?;
        } else {
            trace!(
                "Step [{}/{}] completed in {:.2} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let snapshots = session.recorded_snapshots();
    let output = &config.output;
    if output.save_metrics {
        let path = PathBuf::from(format!("{}_metrics.csv", output.base_filename));
        write_metrics_csv(&path, snapshots)?;
    } else {
        info!("Skipping metrics CSV as per config (save_metrics is false).");
    }
    if output.save_snapshots {
        write_snapshots(&output.base_filename, output.format, snapshots)?;
    } else {
        info!("Skipping snapshots as per config (save_snapshots is false).");
    }

    info!("Simulation Complete.");
    Ok(())
}
