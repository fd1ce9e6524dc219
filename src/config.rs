use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{common, features::LandUseWeights, geom::Crs};

/// Settings for the static feature pipeline.
/// Every field has a default, so a config file only needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CRS shared by the boundaries and every clipped raster ("EPSG:4326" or a PROJ.4 string).
    pub target_crs: String,
    pub boundaries: BoundaryConfig,
    pub terrain: TerrainConfig,
    pub landuse: LandUseConfig,
}

/// Attribute fields of the administrative boundary source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Field holding the unique region name.
    pub name_field: String,
    /// Field holding the administrative code.
    pub code_field: String,
    /// Field used to select one province out of a national boundary file.
    pub province_field: String,
    /// Keep only features whose `province_field` equals this value; keep all when unset.
    pub province: Option<String>,
    /// CRS of the boundary file when it carries no recognizable `.prj` sidecar.
    pub crs: Option<String>,
}

/// Elevation raster settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Native CRS of the elevation grid; falls back to the `.prj` sidecar.
    pub crs: Option<String>,
    /// Nodata sentinel used when the grid header does not declare one.
    pub nodata: f64,
    /// Province-wide percentile used as the lowland cutoff.
    pub lowland_percentile: f64,
}

/// Land-cover raster settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandUseConfig {
    /// Native CRS of the land-cover grid; falls back to the `.prj` sidecar.
    pub crs: Option<String>,
    /// Category code of impervious (built-up) surface.
    pub impervious_category: u32,
    /// Fire-risk weight per land-cover category.
    pub weights: LandUseWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_crs: "EPSG:4326".to_string(),
            boundaries: BoundaryConfig::default(),
            terrain: TerrainConfig::default(),
            landuse: LandUseConfig::default(),
        }
    }
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            name_field: "地级".to_string(),
            code_field: "地级码".to_string(),
            province_field: "省级".to_string(),
            province: None,
            crs: None,
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self { crs: None, nodata: -32768.0, lowland_percentile: 30.0 }
    }
}

impl Default for LandUseConfig {
    fn default() -> Self {
        Self { crs: None, impervious_category: 8, weights: LandUseWeights::default() }
    }
}

impl PipelineConfig {
    /// Load a JSON config file, filling unset fields with defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = common::read_json_file(path)?;
        config.validate()
            .with_context(|| format!("Invalid pipeline config: {}", path.display()))?;
        Ok(config)
    }

    /// Check ranges and that every CRS string parses.
    pub fn validate(&self) -> Result<()> {
        ensure!((0.0..=100.0).contains(&self.terrain.lowland_percentile),
            "lowland_percentile must lie in [0, 100], got {}", self.terrain.lowland_percentile);
        ensure!(!self.boundaries.name_field.is_empty(), "name_field must not be empty");
        ensure!(self.landuse.weights.iter().all(|(_, w)| w >= 0.0 && w.is_finite()),
            "land-use weights must be finite and non-negative");

        Crs::parse(&self.target_crs)?;
        for crs in [&self.boundaries.crs, &self.terrain.crs, &self.landuse.crs].into_iter().flatten() {
            Crs::parse(crs)?;
        }
        Ok(())
    }

    /// The parsed target CRS.
    pub(crate) fn target(&self) -> Result<Crs> { Crs::parse(&self.target_crs) }
}
