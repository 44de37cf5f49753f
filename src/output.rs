use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tumor_common::{OutputFormat, Snapshot};

/// Writes one CSV row of metrics per recorded snapshot.
pub fn write_metrics_csv(path: &Path, snapshots: &[Snapshot]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating metrics file '{}'", path.display()))?;
    writer.write_record([
        "step_index",
        "tumor_cell_count",
        "growth_rate",
        "percentage_growth",
        "proliferation_rate",
        "nutrient_availability",
    ])?;
    for snapshot in snapshots {
        let metrics = &snapshot.metrics;
        writer.write_record(&[
            metrics.step_index.to_string(),
            metrics.tumor_cell_count.to_string(),
            format!("{:.4}", metrics.growth_rate),
            format!("{:.4}", metrics.percentage_growth),
            format!("{:.4}", snapshot.proliferation_rate),
            format!("{:.4}", snapshot.nutrient_availability),
        ])?;
    }
    writer.flush()?;
    info!("Metrics saved to {}", path.display());
    Ok(())
}

/// Serializes all recorded snapshots into `<base_filename>_snapshots.<ext>`.
pub fn write_snapshots(base_filename: &str, format: OutputFormat, snapshots: &[Snapshot]) -> Result<PathBuf> {
    let path = PathBuf::from(format!("{}_snapshots.{}", base_filename, format.extension()));
    let file = File::create(&path)
        .with_context(|| format!("Error creating snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, snapshots)
                .context("Error serializing snapshots to JSON")?;
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(&mut writer, snapshots)
                .context("Error serializing snapshots to bincode")?;
        }
        OutputFormat::MessagePack => {
            rmp_serde::encode::write(&mut writer, snapshots)
                .context("Error serializing snapshots to MessagePack")?;
        }
    }
    writer.flush()?;

    info!("All snapshots saved to {} ({:?} format)", path.display(), format);
    Ok(path)
}
