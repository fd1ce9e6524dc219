use anyhow::{Result, bail, ensure};

use crate::raster::RasterGrid;

/// The `p`-th percentile (0..=100) with linear interpolation between closest ranks,
/// matching numpy's default. Sorts `values` in place; None when empty.
pub fn percentile(values: &mut [f64], p: f64) -> Option<f64> {
    if values.is_empty() { return None }
    values.sort_unstable_by(f64::total_cmp);

    let rank = (p / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

/// Province-wide lowland cutoff: the `p`-th percentile of every valid cell of the whole elevation grid.
/// Computed once per run and shared by every region.
pub fn province_threshold(dem: &RasterGrid, p: f64) -> Result<f64> {
    ensure!((0.0..=100.0).contains(&p), "percentile must lie in [0, 100], got {p}");
    let mut valid = dem.valid_values().collect::<Vec<_>>();
    let Some(threshold) = percentile(&mut valid, p) else {
        bail!("elevation grid has no valid cells");
    };
    log::info!("province lowland threshold (p{p}) = {threshold:.3} m over {} cells", valid.len());
    Ok(threshold)
}

/// (min, max) over valid cells, or None when every cell is nodata.
pub fn value_range(grid: &RasterGrid) -> Option<(f64, f64)> {
    grid.valid_values().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{geom::Crs, raster::GeoTransform};

    #[test]
    fn percentile_interpolates_like_numpy() {
        // numpy.percentile([1, 2, 3, 4], 30) == 1.9
        assert_abs_diff_eq!(percentile(&mut [4.0, 1.0, 3.0, 2.0], 30.0).unwrap(), 1.9, epsilon = 1e-12);
        assert_eq!(percentile(&mut [5.0], 30.0), Some(5.0));
        assert_eq!(percentile(&mut [3.0, 1.0, 2.0], 0.0), Some(1.0));
        assert_eq!(percentile(&mut [3.0, 1.0, 2.0], 100.0), Some(3.0));
        assert_eq!(percentile(&mut [], 30.0), None);
    }

    fn dem(data: Vec<f64>) -> RasterGrid {
        let n = data.len();
        RasterGrid::from_rows(1, n, data, Some(-32768.0), GeoTransform::north_up(0.0, 1.0, 1.0, 1.0), Crs::wgs84()).unwrap()
    }

    #[test]
    fn threshold_ignores_nodata() {
        let grid = dem(vec![-32768.0, 10.0, 20.0, -32768.0, 30.0, 40.0, f64::NAN]);
        assert_abs_diff_eq!(province_threshold(&grid, 30.0).unwrap(), 19.0, epsilon = 1e-12);
    }

    #[test]
    fn threshold_needs_valid_cells() {
        assert!(province_threshold(&dem(vec![-32768.0, -32768.0]), 30.0).is_err());
    }

    #[test]
    fn range_over_valid_cells() {
        assert_eq!(value_range(&dem(vec![-32768.0, 7.0, -3.0, 12.5])), Some((-3.0, 12.5)));
        assert_eq!(value_range(&dem(vec![-32768.0])), None);
    }
}
