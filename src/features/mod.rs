mod landuse;
mod lowland;
mod meta;

pub use landuse::{LandUseComposition, LandUseWeights};
pub use lowland::lowland_index;
pub use meta::{MetaStore, RegionMeta};
