use anyhow::{Result, ensure};
use geo::{Coord, Rect};
use ndarray::Array2;

use crate::{geom::Crs, raster::GeoTransform};

/// A single-band grid of cell values, georeferenced by an affine transform in a known CRS.
/// Values equal to `nodata`, and NaN, are treated as missing.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    values: Array2<f64>, // (rows, cols), row 0 at the top
    nodata: Option<f64>,
    transform: GeoTransform,
    crs: Crs,
}

impl RasterGrid {
    pub fn new(values: Array2<f64>, nodata: Option<f64>, transform: GeoTransform, crs: Crs) -> Result<Self> {
        ensure!(values.nrows() > 0 && values.ncols() > 0, "raster grid must have at least one cell");
        Ok(Self { values, nodata, transform, crs })
    }

    /// Build from row-major values.
    pub fn from_rows(rows: usize, cols: usize, data: Vec<f64>, nodata: Option<f64>, transform: GeoTransform, crs: Crs) -> Result<Self> {
        ensure!(data.len() == rows * cols, "expected {} values for a {rows}x{cols} grid, got {}", rows * cols, data.len());
        Self::new(Array2::from_shape_vec((rows, cols), data)?, nodata, transform, crs)
    }

    #[inline] pub fn rows(&self) -> usize { self.values.nrows() }

    #[inline] pub fn cols(&self) -> usize { self.values.ncols() }

    #[inline] pub fn values(&self) -> &Array2<f64> { &self.values }

    #[inline] pub fn nodata(&self) -> Option<f64> { self.nodata }

    #[inline] pub fn transform(&self) -> &GeoTransform { &self.transform }

    #[inline] pub fn crs(&self) -> &Crs { &self.crs }

    /// Value of cell (row, col), if in range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// Check a value against the nodata sentinel.
    #[inline]
    pub fn is_nodata(&self, value: f64) -> bool {
        value.is_nan() || self.nodata == Some(value)
    }

    /// Iterate over every valid (non-nodata) cell value.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|&v| !self.is_nodata(v))
    }

    /// Nearest cell value at a world coordinate; None outside the grid.
    pub fn sample_nearest(&self, coord: Coord<f64>) -> Option<f64> {
        let (col, row) = self.transform.invert(coord);
        if !(col >= 0.0 && row >= 0.0) { return None }
        self.get(row.floor() as usize, col.floor() as usize)
    }

    /// World-space extent of the grid.
    pub fn bounds(&self) -> Rect<f64> {
        let (rows, cols) = (self.rows() as f64, self.cols() as f64);
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(cols, 0.0),
            self.transform.apply(0.0, rows),
            self.transform.apply(cols, rows),
        ];
        let (mut min, mut max) = (corners[0], corners[0]);
        for c in &corners[1..] {
            min = Coord { x: min.x.min(c.x), y: min.y.min(c.y) };
            max = Coord { x: max.x.max(c.x), y: max.y.max(c.y) };
        }
        Rect::new(min, max)
    }
}
