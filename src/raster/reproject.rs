use anyhow::{Context, Result, ensure};
use geo::{Coord, Rect};
use ndarray::{Array2, Axis, parallel::prelude::*};

use crate::{geom::{Crs, CrsTransform}, raster::{GeoTransform, RasterGrid}};

/// Number of sample points along each edge when projecting the source extent.
const EDGE_SAMPLES: usize = 21;

/// Target extent: project points densely sampled along the source border and take their bounds.
fn projected_bounds(grid: &RasterGrid, forward: &CrsTransform) -> Result<Rect<f64>> {
    let t = grid.transform();
    let (rows, cols) = (grid.rows() as f64, grid.cols() as f64);

    let mut min = Coord { x: f64::INFINITY, y: f64::INFINITY };
    let mut max = Coord { x: f64::NEG_INFINITY, y: f64::NEG_INFINITY };
    for i in 0..EDGE_SAMPLES {
        let f = i as f64 / (EDGE_SAMPLES - 1) as f64;
        for (col, row) in [(f * cols, 0.0), (f * cols, rows), (0.0, f * rows), (cols, f * rows)] {
            let Ok(p) = forward.apply(t.apply(col, row)) else { continue };
            if !(p.x.is_finite() && p.y.is_finite()) { continue }
            min = Coord { x: min.x.min(p.x), y: min.y.min(p.y) };
            max = Coord { x: max.x.max(p.x), y: max.y.max(p.y) };
        }
    }
    ensure!(min.x < max.x && min.y < max.y, "source extent does not project into the target CRS");
    Ok(Rect::new(min, max))
}

/// Resample `grid` into `target` with nearest-neighbour lookup, so categorical codes are never blended.
///
/// The output is north-up and covers the projected source extent. Its cell size keeps the number of
/// cells along the diagonal equal to the source's. Cells whose centers map outside the source grid
/// (or fail to project) become nodata.
pub fn reproject_nearest(grid: &RasterGrid, target: &Crs) -> Result<RasterGrid> {
    if grid.crs().same_as(target) {
        return Ok(grid.clone());
    }

    let forward = CrsTransform::new(grid.crs(), target)?;
    let inverse = CrsTransform::new(target, grid.crs())?;

    let bounds = projected_bounds(grid, &forward)
        .with_context(|| format!("cannot reproject grid from {} to {}", grid.crs(), target))?;
    let source_diagonal = ((grid.rows().pow(2) + grid.cols().pow(2)) as f64).sqrt();
    let target_diagonal = (bounds.width().powi(2) + bounds.height().powi(2)).sqrt();
    let cell = target_diagonal / source_diagonal;

    let cols = ((bounds.width() / cell).ceil() as usize).max(1);
    let rows = ((bounds.height() / cell).ceil() as usize).max(1);
    let transform = GeoTransform::north_up(bounds.min().x, bounds.max().y, cell, cell);

    // Missing cells need a sentinel that survives a round trip through a file.
    let nodata = grid.nodata().unwrap_or(f64::NAN);

    let mut values = Array2::from_elem((rows, cols), nodata);
    values.axis_iter_mut(Axis(0)).into_par_iter().enumerate().for_each(|(row, mut out)| {
        for (col, value) in out.iter_mut().enumerate() {
            if let Ok(source) = inverse.apply(transform.cell_center(row, col)) {
                if let Some(v) = grid.sample_nearest(source) {
                    *value = v;
                }
            }
        }
    });

    log::info!(
        "reprojected {}x{} grid from {} to {} as {}x{} (cell {:.6})",
        grid.rows(), grid.cols(), grid.crs(), target, rows, cols, cell
    );
    RasterGrid::new(values, grid.nodata(), transform, target.clone())
}
