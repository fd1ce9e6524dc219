mod geojson;
mod shp;

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result, bail};
use geo::MultiPolygon;

use crate::{common, config::BoundaryConfig, geom::{AdCode, Crs, RegionPolygon, Regions}};

pub use geojson::write_boundaries_geojson;

/// One boundary feature as read from disk, before filtering and validation.
struct RawFeature {
    shape: MultiPolygon<f64>,
    name: Option<String>,
    code: Option<AdCode>,
    province: Option<String>,
}

/// Attribute overview of a boundary file.
#[derive(Debug, Clone, Default)]
pub struct BoundarySummary {
    pub records: usize,
    /// Geometry type -> feature count.
    pub geometry_mix: BTreeMap<String, usize>,
    /// Attribute columns with the first record's value.
    pub fields: Vec<(String, String)>,
}

enum Format { Shapefile, GeoJson }

fn format_of(path: &Path) -> Result<Format> {
    match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("shp") => Ok(Format::Shapefile),
        Some("geojson" | "json") => Ok(Format::GeoJson),
        _ => bail!("unsupported boundary format: {} (expected .shp or .geojson)", path.display()),
    }
}

/// Load administrative boundaries, keep the configured province, and reproject them into `target`.
/// A missing or unreadable source is fatal.
pub fn load_boundaries(path: &Path, config: &BoundaryConfig, target: &Crs) -> Result<Regions> {
    common::require_file_exists(path)
        .context("boundary source is required")?;

    let (features, detected) = match format_of(path)? {
        Format::Shapefile => shp::read_features(path, config)?,
        Format::GeoJson => geojson::read_features(path, config)?,
    };
    let total = features.len();

    let source = match &config.crs {
        Some(text) => Crs::parse(text)?,
        None => detected.with_context(|| format!(
            "cannot determine the CRS of {}; set boundaries.crs in the config", path.display()
        ))?,
    };

    let mut regions = Vec::new();
    for (i, feature) in features.into_iter().enumerate() {
        if let Some(wanted) = &config.province {
            if feature.province.as_deref() != Some(wanted.as_str()) { continue }
        }
        let name = feature.name
            .with_context(|| format!("feature {i} in {} has no {} value", path.display(), config.name_field))?;
        if feature.code.is_none() {
            log::warn!("region {name} has no {} value", config.code_field);
        }
        regions.push(RegionPolygon::new(name, feature.code, feature.shape));
    }
    if regions.is_empty() {
        bail!("no boundary features selected from {} ({} read)", path.display(), total);
    }
    log::info!("loaded {} of {} boundary features from {} ({})", regions.len(), total, path.display(), source);

    Regions::new(regions, source)?.reproject(target)
}

/// Summarize a boundary file's attributes and geometry types.
pub fn describe_boundaries(path: &Path) -> Result<BoundarySummary> {
    common::require_file_exists(path)?;
    match format_of(path)? {
        Format::Shapefile => shp::describe(path),
        Format::GeoJson => geojson::describe(path),
    }
}
