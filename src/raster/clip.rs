use geo::{BoundingRect, Contains, Line, MultiPolygon, Point};

use crate::raster::{GeoTransform, RasterGrid};

/// Cells of one grid whose centers fall inside a region polygon.
#[derive(Debug, Clone)]
pub struct ZonalClip {
    /// Values of the covered cells, in row-major order of the window; nodata cells are kept.
    pub values: Vec<f64>,
    /// Transform of the window's top-left cell.
    pub transform: GeoTransform,
    /// (rows, cols) of the window that was scanned.
    pub window: (usize, usize),
    nodata: Option<f64>,
}

impl ZonalClip {
    fn empty(grid: &RasterGrid) -> Self {
        Self { values: Vec::new(), transform: *grid.transform(), window: (0, 0), nodata: grid.nodata() }
    }

    /// True when no cell center fell inside the polygon.
    #[inline] pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Iterate over covered cells that are not nodata.
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|&v| !v.is_nan() && self.nodata != Some(v))
    }
}

/// Every ring segment of every polygon, holes included.
fn boundary_edges(shape: &MultiPolygon<f64>) -> Vec<Line<f64>> {
    shape.iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .flat_map(|ring| ring.lines())
        .collect()
}

/// Sorted x positions where the horizontal line at `y` crosses `edges`, plus the x spans of
/// edges lying on that line. Half-open in y, so a vertex on the line is counted once.
fn crossings(edges: &[Line<f64>], y: f64, xs: &mut Vec<f64>, flats: &mut Vec<(f64, f64)>) {
    xs.clear();
    flats.clear();
    for Line { start: a, end: b } in edges {
        if (a.y <= y) != (b.y <= y) {
            xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
        } else if a.y == y && b.y == y {
            flats.push((a.x.min(b.x), a.x.max(b.x)));
        }
    }
    xs.sort_unstable_by(f64::total_cmp);
}

/// Extract the cells of `grid` whose centers lie within `shape`. Both must share one CRS.
/// A polygon that misses the grid yields an empty clip.
pub fn clip_to_region(grid: &RasterGrid, shape: &MultiPolygon<f64>) -> ZonalClip {
    let Some(rect) = shape.bounding_rect() else { return ZonalClip::empty(grid) };
    let t = grid.transform();

    // Grid window covering the polygon's bounding box.
    let corners = [
        t.invert(rect.min()),
        t.invert(rect.max()),
        t.invert(geo::Coord { x: rect.min().x, y: rect.max().y }),
        t.invert(geo::Coord { x: rect.max().x, y: rect.min().y }),
    ];
    let col_lo = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let col_hi = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max).ceil().min(grid.cols() as f64);
    let row_lo = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor().max(0.0);
    let row_hi = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil().min(grid.rows() as f64);
    if col_lo >= col_hi || row_lo >= row_hi {
        return ZonalClip::empty(grid);
    }
    let (col_lo, col_hi, row_lo, row_hi) = (col_lo as usize, col_hi as usize, row_lo as usize, row_hi as usize);

    let mut values = Vec::new();
    if t.is_north_up() && t.pixel_width > 0.0 {
        let edges = boundary_edges(shape);
        let (mut xs, mut flats) = (Vec::new(), Vec::new());
        for row in row_lo..row_hi {
            crossings(&edges, t.cell_center(row, col_lo).y, &mut xs, &mut flats);
            let mut k = 0;
            for col in col_lo..col_hi {
                let x = t.cell_center(row, col).x;
                while k < xs.len() && xs[k] < x { k += 1 }
                // Odd number of crossings to the left means inside; centers on the boundary are out.
                let on_boundary = xs.get(k) == Some(&x) || flats.iter().any(|&(lo, hi)| lo <= x && x <= hi);
                if k % 2 == 1 && !on_boundary {
                    values.push(grid.values()[[row, col]]);
                }
            }
        }
    } else {
        for row in row_lo..row_hi {
            for col in col_lo..col_hi {
                let center = t.cell_center(row, col);
                if shape.contains(&Point(center)) {
                    values.push(grid.values()[[row, col]]);
                }
            }
        }
    }

    ZonalClip {
        values,
        transform: t.window(row_lo, col_lo),
        window: (row_hi - row_lo, col_hi - col_lo),
        nodata: grid.nodata(),
    }
}
