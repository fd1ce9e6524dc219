use std::fmt;

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use geo::{BoundingRect, Centroid, Coord, MultiPolygon, Rect};
use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::geom::{BoundingBox, Crs, CrsTransform};

/// Administrative code of a region; boundary sources store it either as a number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdCode {
    Int(i64),
    Text(String),
}

impl fmt::Display for AdCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdCode::Int(code) => write!(f, "{code}"),
            AdCode::Text(code) => f.write_str(code),
        }
    }
}

impl From<f64> for AdCode {
    fn from(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            AdCode::Int(value as i64)
        } else {
            AdCode::Text(value.to_string())
        }
    }
}

/// A named administrative boundary.
#[derive(Debug, Clone)]
pub struct RegionPolygon {
    pub name: String,
    pub code: Option<AdCode>,
    pub shape: MultiPolygon<f64>,
}

impl RegionPolygon {
    pub fn new(name: impl Into<String>, code: Option<AdCode>, shape: MultiPolygon<f64>) -> Self {
        Self { name: name.into(), code, shape }
    }
}

/// The set of regions of one province, keyed by unique name, with an R-tree over their bounds.
/// Overlapping polygons are tolerated; duplicate names are not.
#[derive(Debug, Clone)]
pub struct Regions {
    regions: Vec<RegionPolygon>,
    index: AHashMap<String, usize>,
    rtree: RTree<BoundingBox>,
    crs: Crs,
}

impl Regions {
    /// Construct from a list of regions in the given CRS.
    pub fn new(regions: Vec<RegionPolygon>, crs: Crs) -> Result<Self> {
        let mut index = AHashMap::with_capacity(regions.len());
        let mut boxes = Vec::with_capacity(regions.len());

        for (i, region) in regions.iter().enumerate() {
            if index.insert(region.name.clone(), i).is_some() {
                bail!("duplicate region name: {}", region.name);
            }
            let Some(rect) = region.shape.bounding_rect() else {
                bail!("region {} has an empty geometry", region.name);
            };
            boxes.push(BoundingBox::new(i, rect));
        }

        Ok(Self { rtree: RTree::bulk_load(boxes), regions, index, crs })
    }

    /// Get the number of regions.
    #[inline] pub fn len(&self) -> usize { self.regions.len() }

    /// Check if there are no regions.
    #[inline] pub fn is_empty(&self) -> bool { self.regions.is_empty() }

    /// Regions in source order.
    #[inline] pub fn as_slice(&self) -> &[RegionPolygon] { &self.regions }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &RegionPolygon> { self.regions.iter() }

    /// Get the coordinate reference system of the shapes.
    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    /// Look up a region by exact name.
    pub fn get(&self, name: &str) -> Option<&RegionPolygon> {
        self.index.get(name).map(|&i| &self.regions[i])
    }

    /// Regions whose bounding boxes intersect `rect`, in source order.
    pub fn intersecting(&self, rect: &Rect<f64>) -> Vec<&RegionPolygon> {
        let envelope = BoundingBox::envelope_of(rect);
        let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|bbox| bbox.idx())
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits.into_iter().map(|i| &self.regions[i]).collect()
    }

    /// Compute the bounding rectangle of all regions.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.regions.iter()
            .filter_map(|region| region.shape.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            ))
    }

    /// Centroids as WGS84 (lon, lat), one per region in source order.
    pub fn centroids_lonlat(&self) -> Result<Vec<(f64, f64)>> {
        let to_lonlat = CrsTransform::new(&self.crs, &Crs::wgs84())?;
        self.regions.iter()
            .map(|region| {
                let centroid = region.shape.centroid()
                    .with_context(|| format!("region {} has no centroid", region.name))?;
                let lonlat = to_lonlat.apply(centroid.0)
                    .with_context(|| format!("failed to project centroid of {}", region.name))?;
                Ok((lonlat.x, lonlat.y))
            })
            .collect()
    }

    /// Reproject every shape into `target`.
    pub fn reproject(&self, target: &Crs) -> Result<Self> {
        if self.crs.same_as(target) { return Ok(self.clone()) }

        let transform = CrsTransform::new(&self.crs, target)?;
        let regions = self.regions.iter()
            .map(|region| Ok(RegionPolygon {
                name: region.name.clone(),
                code: region.code.clone(),
                shape: transform.apply_multipolygon(&region.shape)
                    .with_context(|| format!("failed to reproject region {}", region.name))?,
            }))
            .collect::<Result<Vec<_>>>()?;

        Self::new(regions, target.clone())
    }
}
