#![doc = "HazardScope public API"]
mod common;
mod config;
mod features;
mod geom;
mod pipeline;
mod raster;
mod risk;
mod weather;

#[doc(inline)]
pub use common::{assert_not_stdout, read_json_file, write_json_file};

#[doc(inline)]
pub use config::{BoundaryConfig, LandUseConfig, PipelineConfig, TerrainConfig};

#[doc(inline)]
pub use features::{LandUseComposition, LandUseWeights, MetaStore, RegionMeta, lowland_index};

#[doc(inline)]
pub use geom::{
    AdCode, BoundarySummary, Crs, RegionPolygon, Regions, describe_boundaries, load_boundaries,
    write_boundaries_geojson,
};

#[doc(inline)]
pub use pipeline::{InputPaths, StaticInputs, StaticPipeline, StaticRun, region_features};

#[doc(inline)]
pub use raster::{
    GeoTransform, RasterGrid, ZonalClip, clip_to_region, percentile, province_threshold,
    read_ascii_grid, reproject_nearest, value_range, write_ascii_grid,
};

#[doc(inline)]
pub use risk::{
    FireModel, FloodModel, RiskLevel, RiskModel, RiskRecord, RiskThresholds, estimate_region_risk,
    score_horizon,
};

#[doc(inline)]
pub use weather::{
    Horizon, ObservationRecord, RegionWeather, STANDARD_HORIZONS, WeatherBundle, WeatherObservation,
    WeatherSet,
};
