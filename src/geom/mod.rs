mod bbox;
mod crs;
mod io;
mod regions;

use bbox::BoundingBox;
pub use crs::Crs;
pub(crate) use crs::CrsTransform;
pub use io::{BoundarySummary, describe_boundaries, load_boundaries, write_boundaries_geojson};
pub use regions::{AdCode, RegionPolygon, Regions};
