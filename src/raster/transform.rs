use anyhow::{Result, ensure};
use geo::Coord;

/// Affine georeferencing of a grid, in GDAL coefficient order:
/// `x = origin_x + col * pixel_width + row * row_rotation`,
/// `y = origin_y + col * col_rotation + row * pixel_height`,
/// where (col, row) address the top-left corner of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A north-up transform with square or rectangular cells; `cell_height` is positive.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width: cell_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -cell_height,
        }
    }

    /// Build from the six GDAL coefficients.
    pub fn from_gdal(c: [f64; 6]) -> Result<Self> {
        let transform = Self {
            origin_x: c[0], pixel_width: c[1], row_rotation: c[2],
            origin_y: c[3], col_rotation: c[4], pixel_height: c[5],
        };
        ensure!(transform.determinant().abs() > f64::EPSILON, "degenerate geotransform: {c:?}");
        Ok(transform)
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.origin_x, self.pixel_width, self.row_rotation, self.origin_y, self.col_rotation, self.pixel_height]
    }

    #[inline]
    fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// True when the grid axes are aligned with the coordinate axes.
    #[inline]
    pub fn is_north_up(&self) -> bool { self.row_rotation == 0.0 && self.col_rotation == 0.0 }

    /// World coordinate of fractional grid position (col, row).
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + col * self.pixel_width + row * self.row_rotation,
            y: self.origin_y + col * self.col_rotation + row * self.pixel_height,
        }
    }

    /// World coordinate of the center of cell (row, col).
    #[inline]
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional grid position (col, row) of a world coordinate.
    #[inline]
    pub fn invert(&self, coord: Coord<f64>) -> (f64, f64) {
        let dx = coord.x - self.origin_x;
        let dy = coord.y - self.origin_y;
        let det = self.determinant();
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        (col, row)
    }

    /// Transform of the sub-grid whose top-left cell is (row, col) in this grid.
    pub fn window(&self, row: usize, col: usize) -> Self {
        let origin = self.apply(col as f64, row as f64);
        Self { origin_x: origin.x, origin_y: origin.y, ..*self }
    }
}
