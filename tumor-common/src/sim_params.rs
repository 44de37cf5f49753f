use serde::{Deserialize, Serialize};

/// Relative `(d_row, d_col)` displacement from a cell to one of its neighbors.
pub type Offset = (i32, i32);

/// The four cardinal neighbors.
pub const VON_NEUMANN_OFFSETS: [Offset; 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// All eight surrounding cells, row-major around the center.
pub const MOORE_OFFSETS: [Offset; 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Adjacency used when looking for colonization candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// 4-connected.
    VonNeumann,
    /// 8-connected.
    Moore,
    /// Explicit list of `[d_row, d_col]` pairs, visited in the given order.
    Custom(Vec<[i32; 2]>),
}

impl Default for Neighborhood {
    fn default() -> Self {
        Neighborhood::Moore
    }
}

impl Neighborhood {
    /// Expands the neighborhood into its ordered offset list.
    pub fn offsets(&self) -> Vec<Offset> {
        match self {
            Neighborhood::VonNeumann => VON_NEUMANN_OFFSETS.to_vec(),
            Neighborhood::Moore => MOORE_OFFSETS.to_vec(),
            Neighborhood::Custom(pairs) => pairs.iter().map(|&[dr, dc]| (dr, dc)).collect(),
        }
    }
}

/// Growth parameters derived from the configuration. These stay fixed for the
/// lifetime of an engine; the per-step rates are supplied by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    /// Nutrient level at or below which no proliferation happens in a step.
    pub nutrient_threshold: f64,
    /// Offsets visited, in order, around every tumor cell.
    pub neighbor_offsets: Vec<Offset>,
}

impl GrowthParams {
    pub fn new(nutrient_threshold: f64, neighborhood: &Neighborhood) -> Self {
        Self {
            nutrient_threshold,
            neighbor_offsets: neighborhood.offsets(),
        }
    }
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self::new(0.05, &Neighborhood::default())
    }
}
