use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::{GrowthParams, Neighborhood};
use std::path::Path;

// Grid dimensions and the initial tumor seed
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    #[serde(default = "default_grid_dim")]
    pub width: usize,
    #[serde(default = "default_grid_dim")]
    pub height: usize,
    /// Half the side length of the centered tumor block placed at start.
    #[serde(default = "default_initial_tumor_half_size")]
    pub initial_tumor_half_size: usize,
}

// Fixed growth rules, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GrowthConfig {
    #[serde(default = "default_nutrient_threshold")]
    pub nutrient_threshold: f64,
    #[serde(default)]
    pub neighborhood: Neighborhood,
}

/// Overrides the base rates from `from_step` onwards, until the next entry.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub from_step: u32,
    pub proliferation_rate: f64,
    pub nutrient_availability: f64,
}

// Run length, seed and the per-step parameter schedule
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_total_steps")]
    pub total_steps: u32,
    #[serde(default = "default_record_interval_steps")]
    pub record_interval_steps: u32,
    /// Fixed seed for reproducible runs. Drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_proliferation_rate")]
    pub proliferation_rate: f64,
    #[serde(default = "default_nutrient_availability")]
    pub nutrient_availability: f64,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_metrics: bool,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default = "default_true")]
    pub save_grid_in_snapshot: bool,
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            width: default_grid_dim(),
            height: default_grid_dim(),
            initial_tumor_half_size: default_initial_tumor_half_size(),
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        GrowthConfig {
            nutrient_threshold: default_nutrient_threshold(),
            neighborhood: Neighborhood::default(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            total_steps: default_total_steps(),
            record_interval_steps: default_record_interval_steps(),
            seed: None,
            proliferation_rate: default_proliferation_rate(),
            nutrient_availability: default_nutrient_availability(),
            schedule: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_metrics: true,
            save_snapshots: true,
            save_grid_in_snapshot: true,
            format: default_output_format(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            grid: GridConfig::default(),
            growth: GrowthConfig::default(),
            run: RunConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Returns `(proliferation_rate, nutrient_availability)` in effect at `step`.
    pub fn parameters_at(&self, step: u32) -> (f64, f64) {
        self.schedule
            .iter()
            .filter(|entry| entry.from_step <= step)
            .max_by_key(|entry| entry.from_step)
            .map(|entry| (entry.proliferation_rate, entry.nutrient_availability))
            .unwrap_or((self.proliferation_rate, self.nutrient_availability))
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        if grid.width == 0 || grid.height == 0 {
            anyhow::bail!("grid.width and grid.height must be greater than 0.");
        }
        if 2 * grid.initial_tumor_half_size > grid.width.min(grid.height) {
            anyhow::bail!(
                "grid.initial_tumor_half_size {} gives a block larger than the {}x{} grid.",
                grid.initial_tumor_half_size, grid.height, grid.width
            );
        }

        check_unit_interval("growth.nutrient_threshold", self.growth.nutrient_threshold)?;
        if let Neighborhood::Custom(pairs) = &self.growth.neighborhood {
            if pairs.is_empty() {
                anyhow::bail!("growth.neighborhood.custom must list at least one offset.");
            }
            if pairs.iter().any(|&pair| pair == [0, 0]) {
                anyhow::bail!("growth.neighborhood.custom must not contain [0, 0].");
            }
        }

        check_unit_interval("run.proliferation_rate", self.run.proliferation_rate)?;
        check_unit_interval("run.nutrient_availability", self.run.nutrient_availability)?;
        for entry in &self.run.schedule {
            check_unit_interval("run.schedule.proliferation_rate", entry.proliferation_rate)?;
            check_unit_interval("run.schedule.nutrient_availability", entry.nutrient_availability)?;
        }
        if self.run.record_interval_steps == 0 {
            anyhow::bail!("run.record_interval_steps must be greater than 0.");
        }

        Ok(())
    }

    /// Converts the configuration into the growth parameters used at runtime.
    pub fn growth_params(&self) -> GrowthParams {
        GrowthParams::new(self.growth.nutrient_threshold, &self.growth.neighborhood)
    }
}

fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        anyhow::bail!("{} must be within [0, 1], got {}.", name, value);
    }
    Ok(())
}

// Defaults match the original interactive notebook setup
fn default_grid_dim() -> usize {
    100
}

fn default_initial_tumor_half_size() -> usize {
    5
}

fn default_nutrient_threshold() -> f64 {
    0.05
}

fn default_total_steps() -> u32 {
    100
}

fn default_record_interval_steps() -> u32 {
    1
}

fn default_proliferation_rate() -> f64 {
    0.1
}

fn default_nutrient_availability() -> f64 {
    0.1
}

fn default_base_filename() -> String {
    "tumor_growth".to_string()
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Json
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.grid.width, 100);
        assert_eq!(config.grid.height, 100);
        assert_eq!(config.grid.initial_tumor_half_size, 5);
        assert_eq!(config.growth.neighborhood, Neighborhood::Moore);
        assert_eq!(config.run.total_steps, 100);
        assert!(config.run.seed.is_none());
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [grid]
            width = 40
            height = 30
            initial_tumor_half_size = 3

            [growth]
            nutrient_threshold = 0.2
            neighborhood = "von_neumann"

            [run]
            total_steps = 12
            seed = 7
            proliferation_rate = 0.5
            nutrient_availability = 0.9

            [[run.schedule]]
            from_step = 5
            proliferation_rate = 0.25
            nutrient_availability = 0.1

            [output]
            base_filename = "run_a"
            format = "messagepack"
        "#;
        let config = SimulationConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.grid.width, 40);
        assert_eq!(config.grid.height, 30);
        assert_eq!(config.growth.neighborhood, Neighborhood::VonNeumann);
        assert_eq!(config.run.seed, Some(7));
        assert_eq!(config.output.format, OutputFormat::MessagePack);
        assert_eq!(config.output.base_filename, "run_a");

        let params = config.growth_params();
        assert_eq!(params.neighbor_offsets.len(), 4);
        assert!((params.nutrient_threshold - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_custom_neighborhood() {
        let toml = r#"
            [growth]
            neighborhood = { custom = [[-1, 0], [0, 1]] }
        "#;
        let config = SimulationConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.growth_params().neighbor_offsets, vec![(-1, 0), (0, 1)]);

        let toml = r#"
            [growth]
            neighborhood = { custom = [[0, 0]] }
        "#;
        assert!(SimulationConfig::from_toml_str(toml).is_err());

        let toml = r#"
            [growth]
            neighborhood = { custom = [] }
        "#;
        assert!(SimulationConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_schedule_lookup() {
        let run = RunConfig {
            proliferation_rate: 0.1,
            nutrient_availability: 0.5,
            schedule: vec![
                ScheduleEntry { from_step: 10, proliferation_rate: 0.9, nutrient_availability: 0.0 },
                ScheduleEntry { from_step: 4, proliferation_rate: 0.3, nutrient_availability: 0.6 },
            ],
            ..RunConfig::default()
        };
        assert_eq!(run.parameters_at(0), (0.1, 0.5));
        assert_eq!(run.parameters_at(4), (0.3, 0.6));
        assert_eq!(run.parameters_at(9), (0.3, 0.6));
        assert_eq!(run.parameters_at(10), (0.9, 0.0));
        assert_eq!(run.parameters_at(500), (0.9, 0.0));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(SimulationConfig::from_toml_str("[grid]\nwidth = 0").is_err());
        assert!(SimulationConfig::from_toml_str(
            "[grid]\nwidth = 10\nheight = 10\ninitial_tumor_half_size = 6"
        )
        .is_err());
        assert!(SimulationConfig::from_toml_str("[growth]\nnutrient_threshold = 1.5").is_err());
        assert!(SimulationConfig::from_toml_str("[run]\nproliferation_rate = -0.1").is_err());
        assert!(SimulationConfig::from_toml_str("[run]\nrecord_interval_steps = 0").is_err());
        assert!(SimulationConfig::from_toml_str(
            "[[run.schedule]]\nfrom_step = 1\nproliferation_rate = 0.5\nnutrient_availability = 2.0"
        )
        .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[grid]\nwidth = 20\nheight = 10\ninitial_tumor_half_size = 2").unwrap();
        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.grid.width, 20);
        assert_eq!(config.grid.height, 10);

        assert!(SimulationConfig::load("/nonexistent/config.toml").is_err());
    }
}
