/// Fraction of valid elevation cells at or below the province threshold.
///
/// Returns None for a region without valid cells: "unknown" must not read as "no low ground".
pub fn lowland_index(elevations: impl IntoIterator<Item = f64>, threshold: f64) -> Option<f64> {
    let (low, total) = elevations.into_iter()
        .fold((0usize, 0usize), |(low, total), z| (low + usize::from(z <= threshold), total + 1));
    (total > 0).then(|| low as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_cells_at_or_below_threshold() {
        assert_eq!(lowland_index([1.0, 5.0, 5.0, 9.0], 5.0), Some(0.75));
        assert_eq!(lowland_index([10.0, 20.0], 5.0), Some(0.0));
        assert_eq!(lowland_index([1.0, 2.0], 5.0), Some(1.0));
    }

    #[test]
    fn empty_region_is_unknown_not_zero() {
        assert_eq!(lowland_index(std::iter::empty(), 5.0), None);
    }

    #[test]
    fn always_within_unit_interval() {
        for n in 1..40 {
            let values = (0..n).map(|i| (i * 7 % 13) as f64);
            let index = lowland_index(values, 6.0).unwrap();
            assert!((0.0..=1.0).contains(&index));
        }
    }
}
