//! Static feature pipeline: boundaries and rasters in, one feature record per region out.
//!
//! The run has two phases. The province-wide lowland threshold is derived first from the
//! whole elevation grid; it is then passed by value into an independent per-region map.

use std::path::{Path, PathBuf};

use ahash::AHashSet;
use anyhow::{Context, Result, ensure};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    common,
    config::PipelineConfig,
    features::{LandUseComposition, MetaStore, RegionMeta, lowland_index},
    geom::{self, Crs, RegionPolygon, Regions},
    raster::{self, RasterGrid},
};

/// Source files of one static run.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub boundaries: PathBuf,
    pub dem: PathBuf,
    pub landuse: PathBuf,
    /// Where reprojected grids are kept between runs; next to each source grid when unset.
    pub cache_dir: Option<PathBuf>,
}

/// Boundaries and grids, all in the target CRS.
#[derive(Debug, Clone)]
pub struct StaticInputs {
    pub regions: Regions,
    pub dem: RasterGrid,
    pub landuse: RasterGrid,
}

/// Output of [`StaticPipeline::run`].
#[derive(Debug, Clone)]
pub struct StaticRun {
    pub store: MetaStore,
    /// The lowland cutoff shared by every region of the run.
    pub threshold: f64,
}

/// Which input a grid plays; grids sharing a file stem still get separate caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum GridRole {
    Elevation,
    LandCover,
}

impl GridRole {
    fn as_str(self) -> &'static str {
        match self {
            GridRole::Elevation => "dem",
            GridRole::LandCover => "landuse",
        }
    }
}

/// Sidecar describing what a cached reprojection was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheStamp {
    source: PathBuf,
    role: GridRole,
    source_crs: String,
    target_crs: String,
}

#[derive(Debug, Clone, Default)]
pub struct StaticPipeline {
    config: PipelineConfig,
}

impl StaticPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline] pub fn config(&self) -> &PipelineConfig { &self.config }

    /// Read the boundaries and both grids, bringing everything into the target CRS.
    /// Any unreadable source aborts the run.
    pub fn load_inputs(&self, paths: &InputPaths) -> Result<StaticInputs> {
        let target = self.config.target()?;

        let regions = geom::load_boundaries(&paths.boundaries, &self.config.boundaries, &target)?;

        let terrain = &self.config.terrain;
        let dem = self.load_grid(&paths.dem, GridRole::Elevation, terrain.crs.as_deref(), Some(terrain.nodata), paths.cache_dir.as_deref(), &target)
            .context("elevation grid")?;
        let landuse = self.load_grid(&paths.landuse, GridRole::LandCover, self.config.landuse.crs.as_deref(), None, paths.cache_dir.as_deref(), &target)
            .context("land-cover grid")?;

        Ok(StaticInputs { regions, dem, landuse })
    }

    /// Read a grid and reproject it once. A cached reprojection is reused only when its
    /// stamp names the same source, role, and CRS pair; otherwise it is rebuilt in place.
    fn load_grid(
        &self,
        path: &Path,
        role: GridRole,
        crs: Option<&str>,
        nodata: Option<f64>,
        cache_dir: Option<&Path>,
        target: &Crs,
    ) -> Result<RasterGrid> {
        let source_crs = crs.map(Crs::parse).transpose()?;
        let cache = reprojection_cache_path(path, role, target, cache_dir);
        let stamp_path = cache.with_extension("json");

        let grid = raster::read_ascii_grid(path, source_crs, nodata)?;
        if grid.crs().same_as(target) {
            return Ok(grid);
        }

        let stamp = CacheStamp {
            source: path.to_path_buf(),
            role,
            source_crs: grid.crs().proj4().to_string(),
            target_crs: target.proj4().to_string(),
        };
        if cache.is_file() {
            match common::read_json_file::<CacheStamp>(&stamp_path) {
                Ok(found) if found == stamp => {
                    log::info!("using cached reprojection {}", cache.display());
                    return raster::read_ascii_grid(&cache, Some(target.clone()), nodata);
                }
                _ => log::warn!("cached reprojection {} does not match {}; rebuilding", cache.display(), path.display()),
            }
        }

        let grid = raster::reproject_nearest(&grid, target)
            .with_context(|| format!("failed to reproject {}", path.display()))?;
        raster::write_ascii_grid(&grid, &cache, true)?;
        common::write_json_file(&stamp_path, &stamp, true)?;
        log::info!("wrote reprojected grid to {}", cache.display());
        Ok(grid)
    }

    /// Compute the feature table. The grids and regions must share one CRS.
    pub fn run(&self, inputs: &StaticInputs) -> Result<StaticRun> {
        let StaticInputs { regions, dem, landuse } = inputs;
        ensure!(dem.crs().same_as(regions.crs()), "elevation grid CRS {} differs from boundary CRS {}", dem.crs(), regions.crs());
        ensure!(landuse.crs().same_as(regions.crs()), "land-cover grid CRS {} differs from boundary CRS {}", landuse.crs(), regions.crs());

        // Phase 1: province-wide barrier.
        let threshold = raster::province_threshold(dem, self.config.terrain.lowland_percentile)?;

        let covered = regions.intersecting(&dem.bounds()).into_iter()
            .map(|region| region.name.as_str())
            .collect::<AHashSet<_>>();
        for region in regions.iter().filter(|r| !covered.contains(r.name.as_str())) {
            log::warn!("region {} lies outside the elevation grid", region.name);
        }

        // Phase 2: independent per-region features.
        let centroids = regions.centroids_lonlat()?;
        let records = regions.as_slice().par_iter()
            .zip(centroids.into_par_iter())
            .map(|(region, centroid)| region_features(region, centroid, dem, landuse, threshold, &self.config))
            .collect::<Vec<_>>();

        let store = MetaStore::new(records)?;
        log::info!("computed features for {} regions", store.len());
        Ok(StaticRun { store, threshold })
    }

    /// Load, compute and persist in one go. Nothing is written if any step fails.
    pub fn execute(&self, paths: &InputPaths, out: &Path, border: Option<&Path>, force: bool) -> Result<StaticRun> {
        common::assert_not_stdout(out)?;
        let inputs = self.load_inputs(paths)?;
        let run = self.run(&inputs)?;

        run.store.save(out, force)?;
        log::info!("wrote {} region records to {}", run.store.len(), out.display());

        if let Some(border) = border {
            geom::write_boundaries_geojson(&inputs.regions, border, force)?;
            log::info!("wrote region borders to {}", border.display());
        }
        Ok(run)
    }
}

/// `<cache>/<stem>.<role>.<crs>.reprojected.asc`, or the same name beside the source.
fn reprojection_cache_path(source: &Path, role: GridRole, target: &Crs, cache_dir: Option<&Path>) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "grid".into());
    let dir = cache_dir.map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{stem}.{}.{}.reprojected.asc", role.as_str(), crs_tag(target)))
}

/// Short file-name-safe label for a CRS.
fn crs_tag(crs: &Crs) -> String {
    match crs.epsg() {
        Some(code) => format!("epsg{code}"),
        None => crs.proj4()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_"),
    }
}

/// Static features of one region from its clipped cells.
pub fn region_features(
    region: &RegionPolygon,
    (lon, lat): (f64, f64),
    dem: &RasterGrid,
    landuse: &RasterGrid,
    threshold: f64,
    config: &PipelineConfig,
) -> RegionMeta {
    let elevation = raster::clip_to_region(dem, &region.shape);
    let lowland = lowland_index(elevation.valid_values(), threshold);
    if lowland.is_none() {
        log::warn!("{}: no valid elevation cells, lowland index unknown", region.name);
    }

    let cover = raster::clip_to_region(landuse, &region.shape);
    let composition = LandUseComposition::from_cells(cover.valid_values());
    if composition.is_empty() {
        log::warn!("{}: no classified land-cover cells", region.name);
    }
    let impervious_frac = composition.impervious_fraction(config.landuse.impervious_category);
    let fire_risk_weight = composition.fire_risk_weight(&config.landuse.weights);

    match lowland {
        Some(index) => log::info!("{}: lowland {index:.3}, impervious {impervious_frac:.3}, fire weight {fire_risk_weight:.3}", region.name),
        None => log::info!("{}: lowland unknown, impervious {impervious_frac:.3}, fire weight {fire_risk_weight:.3}", region.name),
    }

    RegionMeta {
        city_name: region.name.clone(),
        adcode: region.code.clone(),
        lon,
        lat,
        lowland_index: lowland,
        impervious_frac,
        fire_risk_weight,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{MultiPolygon, polygon};

    use super::*;
    use crate::{geom::AdCode, raster::GeoTransform};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
        ]])
    }

    /// 4x4 cells over [0,4]x[0,4]; left half low, right half high.
    fn inputs() -> StaticInputs {
        let dem = (0..16).map(|i| if i % 4 < 2 { 1.0 } else { 100.0 }).collect();
        let cover = (0..16).map(|i| if i % 4 < 2 { 8.0 } else { 2.0 }).collect();
        let t = GeoTransform::north_up(0.0, 4.0, 1.0, 1.0);
        StaticInputs {
            regions: Regions::new(vec![
                RegionPolygon::new("west", Some(AdCode::Int(1)), rect(0.0, 0.0, 2.0, 4.0)),
                RegionPolygon::new("east", Some(AdCode::Int(2)), rect(2.0, 0.0, 4.0, 4.0)),
                RegionPolygon::new("offshore", None, rect(10.0, 10.0, 11.0, 11.0)),
            ], Crs::wgs84()).unwrap(),
            dem: RasterGrid::from_rows(4, 4, dem, Some(-32768.0), t, Crs::wgs84()).unwrap(),
            landuse: RasterGrid::from_rows(4, 4, cover, Some(0.0), t, Crs::wgs84()).unwrap(),
        }
    }

    #[test]
    fn lowland_uses_one_province_threshold() {
        let run = StaticPipeline::default().run(&inputs()).unwrap();
        // p30 of eight 1s and eight 100s is 1.
        assert_eq!(run.threshold, 1.0);

        let west = run.store.get("west").unwrap();
        let east = run.store.get("east").unwrap();
        assert_eq!(west.lowland_index, Some(1.0));
        assert_eq!(east.lowland_index, Some(0.0));
        assert_eq!(west.impervious_frac, 1.0);
        assert_abs_diff_eq!(east.fire_risk_weight, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(west.lon, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(west.lat, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn region_off_the_grid_has_unknown_lowland() {
        let run = StaticPipeline::default().run(&inputs()).unwrap();
        let offshore = run.store.get("offshore").unwrap();
        assert_eq!(offshore.lowland_index, None);
        assert_eq!(offshore.impervious_frac, 0.0);
        assert_eq!(offshore.fire_risk_weight, 0.0);
    }

    #[test]
    fn records_keep_boundary_order() {
        let run = StaticPipeline::default().run(&inputs()).unwrap();
        let names = run.store.iter().map(|m| m.city_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["west", "east", "offshore"]);
    }

    #[test]
    fn mismatched_crs_is_rejected() {
        let mut inputs = inputs();
        inputs.regions = inputs.regions.reproject(&Crs::from_epsg(3857).unwrap()).unwrap();
        assert!(StaticPipeline::default().run(&inputs).is_err());
    }

    #[test]
    fn cache_path_defaults_to_source_dir() {
        let wgs84 = Crs::wgs84();
        assert_eq!(reprojection_cache_path(Path::new("data/dem.asc"), GridRole::Elevation, &wgs84, None),
            PathBuf::from("data/dem.dem.epsg4326.reprojected.asc"));
        assert_eq!(reprojection_cache_path(Path::new("data/dem.asc"), GridRole::Elevation, &wgs84, Some(Path::new("cache"))),
            PathBuf::from("cache/dem.dem.epsg4326.reprojected.asc"));
    }

    #[test]
    fn cache_path_depends_on_role_and_target() {
        let source = Path::new("data/guangdong.asc");
        let wgs84 = Crs::wgs84();
        let cgcs = Crs::parse("+proj=longlat +ellps=GRS80 +no_defs").unwrap();
        let paths = [
            reprojection_cache_path(source, GridRole::Elevation, &wgs84, None),
            reprojection_cache_path(source, GridRole::LandCover, &wgs84, None),
            reprojection_cache_path(source, GridRole::Elevation, &cgcs, None),
        ];
        assert_ne!(paths[0], paths[1]);
        assert_ne!(paths[0], paths[2]);
        assert_eq!(paths[2], PathBuf::from("data/guangdong.dem.proj_longlat_ellps_GRS80_no_defs.reprojected.asc"));
    }

    /// Writes a 4x4 grid of `value` over [110,114]x[22,26], stored in Web Mercator.
    fn write_mercator_grid(path: &Path, value: f64) {
        let t = GeoTransform::north_up(110.0, 26.0, 1.0, 1.0);
        let grid = RasterGrid::from_rows(4, 4, vec![value; 16], Some(-9999.0), t, Crs::wgs84()).unwrap();
        let mercator = raster::reproject_nearest(&grid, &Crs::from_epsg(3857).unwrap()).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        raster::write_ascii_grid(&mercator, path, false).unwrap();
    }

    #[test]
    fn same_stem_grids_do_not_share_a_cache() {
        let dir = tempfile::tempdir().unwrap();
        let dem_path = dir.path().join("dem/guangdong.asc");
        let cover_path = dir.path().join("landuse/guangdong.asc");
        write_mercator_grid(&dem_path, 5.0);
        write_mercator_grid(&cover_path, 2.0);
        let cache = dir.path().join("cache");

        let pipeline = StaticPipeline::default();
        let target = Crs::wgs84();
        for _ in 0..2 {
            let dem = pipeline.load_grid(&dem_path, GridRole::Elevation, Some("EPSG:3857"), Some(-9999.0), Some(&cache), &target).unwrap();
            let cover = pipeline.load_grid(&cover_path, GridRole::LandCover, Some("EPSG:3857"), Some(-9999.0), Some(&cache), &target).unwrap();
            assert!(dem.valid_values().count() > 0);
            assert!(dem.valid_values().all(|v| v == 5.0));
            assert!(cover.valid_values().count() > 0);
            assert!(cover.valid_values().all(|v| v == 2.0));
        }
        assert!(cache.join("guangdong.dem.epsg4326.reprojected.asc").is_file());
        assert!(cache.join("guangdong.landuse.epsg4326.reprojected.asc").is_file());
    }

    #[test]
    fn cache_without_matching_stamp_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let dem_path = dir.path().join("guangdong.asc");
        write_mercator_grid(&dem_path, 5.0);
        let target = Crs::wgs84();

        // A cache file left by something else, with no stamp beside it.
        let cache = reprojection_cache_path(&dem_path, GridRole::Elevation, &target, None);
        let stray = RasterGrid::from_rows(1, 1, vec![42.0], None,
            GeoTransform::north_up(0.0, 1.0, 1.0, 1.0), target.clone()).unwrap();
        raster::write_ascii_grid(&stray, &cache, false).unwrap();

        let pipeline = StaticPipeline::default();
        let dem = pipeline.load_grid(&dem_path, GridRole::Elevation, Some("EPSG:3857"), Some(-9999.0), None, &target).unwrap();
        assert!(dem.valid_values().all(|v| v == 5.0));

        let stamp: CacheStamp = common::read_json_file(&cache.with_extension("json")).unwrap();
        assert_eq!(stamp.role, GridRole::Elevation);
        assert_eq!(stamp.target_crs, target.proj4());
        let reread = raster::read_ascii_grid(&cache, Some(target), None).unwrap();
        assert_eq!(reread.rows(), dem.rows());
    }
}
