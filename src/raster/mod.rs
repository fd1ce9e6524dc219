mod ascii;
mod clip;
mod grid;
mod reproject;
mod stats;
mod transform;

pub use ascii::{read_ascii_grid, write_ascii_grid};
pub use clip::{ZonalClip, clip_to_region};
pub use grid::RasterGrid;
pub use reproject::reproject_nearest;
pub use stats::{percentile, province_threshold, value_range};
pub use transform::GeoTransform;
