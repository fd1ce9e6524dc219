use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fire-risk weight per land-cover category code.
///
/// The default table follows the CLCD classification (1 cropland, 2 forest, 3 shrub, 4 grassland,
/// 5 water, 6 snow/ice, 7 barren, 8 impervious, 9 wetland). A different classification scheme
/// needs its own table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandUseWeights(BTreeMap<u32, f64>);

impl Default for LandUseWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (1, 1.0), // cropland
            (2, 1.5), // forest
            (3, 1.5), // shrub
            (4, 1.0), // grassland
            (5, 0.0), // water
            (6, 0.0), // snow/ice
            (7, 0.0), // barren
            (8, 1.2), // impervious
            (9, 0.8), // wetland
        ]))
    }
}

impl LandUseWeights {
    pub fn new(weights: BTreeMap<u32, f64>) -> Self { Self(weights) }

    /// Weight of a category; categories missing from the table weigh 0.
    #[inline]
    pub fn weight(&self, category: u32) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }
}

/// Share of each land-cover category among a region's classified cells.
/// Category 0 ("no data") and non-category values are left out before the shares are taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandUseComposition(BTreeMap<u32, f64>);

impl LandUseComposition {
    /// Tally cell values into category fractions. Empty when no cell holds a category.
    pub fn from_cells(values: impl IntoIterator<Item = f64>) -> Self {
        let mut counts = BTreeMap::<u32, usize>::new();
        for v in values {
            if v > 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
                *counts.entry(v as u32).or_default() += 1;
            }
        }
        let total = counts.values().sum::<usize>() as f64;
        Self(counts.into_iter().map(|(category, n)| (category, n as f64 / total)).collect())
    }

    /// Build directly from known fractions.
    pub fn from_fractions(fractions: BTreeMap<u32, f64>) -> Self { Self(fractions) }

    #[inline] pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    /// Fraction of one category, 0 when absent.
    #[inline]
    pub fn fraction(&self, category: u32) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Fraction of impervious surface.
    #[inline]
    pub fn impervious_fraction(&self, impervious_category: u32) -> f64 {
        self.fraction(impervious_category)
    }

    /// Weighted sum of category fractions.
    pub fn fire_risk_weight(&self, weights: &LandUseWeights) -> f64 {
        self.iter().map(|(category, frac)| frac * weights.weight(category)).sum()
    }
}
