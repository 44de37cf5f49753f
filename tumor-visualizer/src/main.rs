use anyhow::{Context, Result};
use clap::Parser;
use image::{Rgb, RgbImage};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{info, warn};
use plotters::prelude::*;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tumor_common::{GridSnapshot, Snapshot, StepMetrics};

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving one heatmap PNG per recorded grid
    #[arg(short, long, default_value = "frames")]
    output_dir: PathBuf,

    /// Side length in pixels of one grid cell in the heatmaps
    #[arg(long, default_value_t = 4)]
    cell_size: u32,

    /// Path of the tumor-cells-over-time chart
    #[arg(long, default_value = "timeline.png")]
    timeline: PathBuf,

    /// Path of the 3D surface plot of the last recorded grid
    #[arg(long, default_value = "surface.png")]
    surface: PathBuf,

    /// Width of the timeline chart in pixels
    #[arg(long, default_value_t = 1024)]
    chart_width: u32,

    /// Height of the timeline chart in pixels
    #[arg(long, default_value_t = 600)]
    chart_height: u32,
}

// Share of the grid above which the dashboard flags the tumor as very large.
const LARGE_TUMOR_PERCENT: f64 = 50.0;

/// Matplotlib's "hot" colour map: black through red and yellow to white.
fn hot_color(value: f32) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);
    let channel = |start: f32, span: f32| (((v - start) / span).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([channel(0.0, 0.365), channel(0.365, 0.375), channel(0.74, 0.26)])
}

/// Renders the grid as a heatmap, one `cell_size` square per cell, rows going down.
fn render_heatmap(grid: &GridSnapshot, cell_size: u32) -> RgbImage {
    let cell_size = cell_size.max(1);
    let width = grid.width as u32 * cell_size;
    let height = grid.height as u32 * cell_size;
    RgbImage::from_fn(width, height, |x, y| {
        let row = (y / cell_size) as usize;
        let col = (x / cell_size) as usize;
        let value = grid.get(row, col).map(|cell| cell.intensity()).unwrap_or(0.0);
        hot_color(value)
    })
}

/// Loads recorded snapshots, picking the decoder from the file extension.
fn load_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let file = File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let snapshots = match extension {
        "json" => serde_json::from_reader(reader).context("Failed to parse JSON snapshots")?,
        "bin" => bincode::deserialize_from(reader).context("Failed to parse bincode snapshots")?,
        "msgpack" => rmp_serde::from_read(reader).context("Failed to parse MessagePack snapshots")?,
        other => anyhow::bail!("Unrecognized snapshot extension '{}'. Expected json, bin or msgpack.", other),
    };
    Ok(snapshots)
}

fn is_very_large(metrics: &StepMetrics) -> bool {
    metrics.percentage_growth > LARGE_TUMOR_PERCENT
}

/// Logs the dashboard for the latest recorded step.
fn log_summary(snapshot: &Snapshot) {
    let metrics = &snapshot.metrics;
    info!("===== Summary Dashboard =====");
    info!("Total Tumor Cells:     {}", metrics.tumor_cell_count);
    info!("Growth Rate:           {:.2} cells per time step", metrics.growth_rate);
    info!("Percentage Growth:     {:.2}%", metrics.percentage_growth);
    info!("Current Time Step:     {}", metrics.step_index);
    info!("Proliferation Rate:    {:.2}", snapshot.proliferation_rate);
    info!("Nutrient Availability: {:.2}", snapshot.nutrient_availability);
    if is_very_large(metrics) {
        warn!("The tumor has grown very large!");
    }
}

fn draw_timeline(path: &Path, snapshots: &[Snapshot], width: u32, height: u32) -> Result<()> {
    let points: Vec<(u64, u64)> = snapshots
        .iter()
        .map(|s| (s.metrics.step_index as u64, s.metrics.tumor_cell_count as u64))
        .collect();
    let max_step = points.iter().map(|p| p.0).max().unwrap_or(0);
    let max_count = points.iter().map(|p| p.1).max().unwrap_or(0);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("Failed to clear timeline canvas: {}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Tumor Cells Over Time", ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0u64..max_step + 1, 0u64..max_count + max_count / 10 + 1)
        .map_err(|e| anyhow::anyhow!("Failed to build timeline chart: {}", e))?;

    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc("Total Tumor Cells")
        .draw()
        .map_err(|e| anyhow::anyhow!("Failed to draw timeline axes: {}", e))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(|e| anyhow::anyhow!("Failed to draw timeline line: {}", e))?;
    chart
        .draw_series(points.iter().map(|&point| Circle::new(point, 3, BLUE.filled())))
        .map_err(|e| anyhow::anyhow!("Failed to draw timeline points: {}", e))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("Failed to write timeline '{}': {}", path.display(), e))?;
    info!("Timeline saved to {}", path.display());
    Ok(())
}

/// Height of the surface above cell (`x` = column, `z` = row).
fn surface_value(grid: &GridSnapshot, x: f64, z: f64) -> f64 {
    if x < 0.0 || z < 0.0 {
        return 0.0;
    }
    grid.get(z as usize, x as usize)
        .map(|cell| cell.intensity() as f64)
        .unwrap_or(0.0)
}

fn draw_surface(path: &Path, grid: &GridSnapshot, width: u32, height: u32) -> Result<()> {
    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("Failed to clear surface canvas: {}", e))?;

    let x_max = grid.width as f64;
    let z_max = grid.height as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption("3D Surface Plot of Tumor Growth", ("sans-serif", 28))
        .margin(15)
        .build_cartesian_3d(0.0..x_max, 0.0..1.0, 0.0..z_max)
        .map_err(|e| anyhow::anyhow!("Failed to build surface chart: {}", e))?;

    chart.with_projection(|mut projection| {
        projection.yaw = 0.6;
        projection.pitch = 0.4;
        projection.scale = 0.8;
        projection.into_matrix()
    });

    chart
        .configure_axes()
        .draw()
        .map_err(|e| anyhow::anyhow!("Failed to draw surface axes: {}", e))?;

    let color = |value: &f64| {
        let Rgb([r, g, b]) = hot_color(*value as f32);
        RGBColor(r, g, b).mix(0.8).filled()
    };
    chart
        .draw_series(
            SurfaceSeries::xoz(
                (0..grid.width).map(|col| col as f64),
                (0..grid.height).map(|row| row as f64),
                |x, z| surface_value(grid, x, z),
            )
            .style_func(&color),
        )
        .map_err(|e| anyhow::anyhow!("Failed to draw surface: {}", e))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("Failed to write surface plot '{}': {}", path.display(), e))?;
    info!("Surface plot saved to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    let start_time = Instant::now();

    info!("Loading snapshots from {}...", args.input.display());
    let snapshots = load_snapshots(&args.input)?;
    if snapshots.is_empty() {
        anyhow::bail!("No snapshots found in {}", args.input.display());
    }
    info!("Loaded {} snapshots.", snapshots.len());

    // --- Heatmap frames ---
    let frames: Vec<(u32, &GridSnapshot)> = snapshots
        .iter()
        .filter_map(|s| s.grid.as_ref().map(|grid| (s.metrics.step_index, grid)))
        .collect();

    if frames.is_empty() {
        warn!("Snapshots carry no grids (save_grid_in_snapshot was off); skipping heatmaps.");
    } else {
        fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("Failed to create output directory {}", args.output_dir.display()))?;

        let progress_bar = ProgressBar::new(frames.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} heatmaps")?
                .progress_chars("#>-"),
        );

        frames
            .par_iter()
            .progress_with(progress_bar.clone())
            .try_for_each(|&(step_index, grid)| -> Result<()> {
                let path = args.output_dir.join(format!("heatmap_{:05}.png", step_index));
                render_heatmap(grid, args.cell_size)
                    .save(&path)
                    .with_context(|| format!("Failed to save heatmap {}", path.display()))
            })?;
        progress_bar.finish_with_message("Heatmaps done");
        info!("{} heatmaps written to {}", frames.len(), args.output_dir.display());
    }

    // --- Timeline ---
    draw_timeline(&args.timeline, &snapshots, args.chart_width, args.chart_height)?;

    // --- Surface of the latest grid ---
    match snapshots.iter().rev().find_map(|s| s.grid.as_ref()) {
        Some(grid) => draw_surface(&args.surface, grid, args.chart_width, args.chart_height)?,
        None => warn!("No recorded grid to draw a surface from."),
    }

    // --- Dashboard ---
    if let Some(last) = snapshots.last() {
        log_summary(last);
    }

    info!("Visualization finished in {:.2} seconds.", start_time.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tumor_common::CellState;

    fn grid() -> GridSnapshot {
        GridSnapshot {
            width: 3,
            height: 2,
            cells: vec![
                CellState::Tumor,
                CellState::Empty,
                CellState::Empty,
                CellState::Empty,
                CellState::Empty,
                CellState::Tumor,
            ],
        }
    }

    #[test]
    fn test_hot_color_endpoints() {
        assert_eq!(hot_color(0.0), Rgb([0, 0, 0]));
        assert_eq!(hot_color(1.0), Rgb([255, 255, 255]));
        // Mid-range is pure red-ish: red saturated, blue still off.
        let mid = hot_color(0.5);
        assert_eq!(mid.0[0], 255);
        assert_eq!(mid.0[2], 0);
    }

    #[test]
    fn test_render_heatmap_scales_cells() {
        let image = render_heatmap(&grid(), 2);
        assert_eq!(image.dimensions(), (6, 4));
        assert_eq!(*image.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(1, 1), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(2, 0), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 3), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(0, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_load_snapshots_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let snapshots = vec![Snapshot {
            metrics: StepMetrics::from_count(0, 3, 6),
            proliferation_rate: 0.5,
            nutrient_availability: 0.25,
            grid: Some(grid()),
        }];

        let path = dir.path().join("run_snapshots.json");
        serde_json::to_writer(File::create(&path).unwrap(), &snapshots).unwrap();
        assert_eq!(load_snapshots(&path).unwrap(), snapshots);

        let path = dir.path().join("run_snapshots.bin");
        bincode::serialize_into(File::create(&path).unwrap(), &snapshots).unwrap();
        assert_eq!(load_snapshots(&path).unwrap(), snapshots);

        let path = dir.path().join("run_snapshots.msgpack");
        rmp_serde::encode::write(&mut File::create(&path).unwrap(), &snapshots).unwrap();
        assert_eq!(load_snapshots(&path).unwrap(), snapshots);

        let path = dir.path().join("run_snapshots.txt");
        File::create(&path).unwrap();
        assert!(load_snapshots(&path).is_err());
    }

    #[test]
    fn test_surface_follows_cell_intensity() {
        let grid = grid();
        assert_eq!(surface_value(&grid, 0.0, 0.0), 1.0);
        assert_eq!(surface_value(&grid, 1.0, 0.0), 0.0);
        assert_eq!(surface_value(&grid, 2.0, 1.0), 1.0);
        // Off-grid samples sit on the floor.
        assert_eq!(surface_value(&grid, 3.0, 0.0), 0.0);
        assert_eq!(surface_value(&grid, -1.0, 1.0), 0.0);
    }

    #[test]
    fn test_large_tumor_threshold() {
        assert!(!is_very_large(&StepMetrics::from_count(3, 50, 100)));
        assert!(is_very_large(&StepMetrics::from_count(3, 51, 100)));
    }
}
