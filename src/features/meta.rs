use std::path::Path;

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{common, geom::AdCode};

fn default_fire_weight() -> f64 { 1.0 }

/// Static features of one region. Field names are the on-disk contract read by the scorer and the map UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMeta {
    pub city_name: String,
    pub adcode: Option<AdCode>,
    pub lon: f64,
    pub lat: f64,
    /// None (`null` on disk) when the region had no valid elevation cells.
    pub lowland_index: Option<f64>,
    pub impervious_frac: f64,
    #[serde(default = "default_fire_weight")]
    pub fire_risk_weight: f64,
}

/// The persisted per-region feature table, in province order, keyed by `city_name`.
#[derive(Debug, Clone, Default)]
pub struct MetaStore {
    records: Vec<RegionMeta>,
    index: AHashMap<String, usize>,
}

impl MetaStore {
    /// Build from records; a repeated name is a data-integrity error.
    pub fn new(records: Vec<RegionMeta>) -> Result<Self> {
        let mut index = AHashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.city_name.clone(), i).is_some() {
                bail!("duplicate region name in feature table: {}", record.city_name);
            }
        }
        Ok(Self { records, index })
    }

    /// Load a table written by [`MetaStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let records: Vec<RegionMeta> = common::read_json_file(path)?;
        let store = Self::new(records)
            .with_context(|| format!("invalid feature table: {}", path.display()))?;
        log::debug!("loaded {} region records from {}", store.len(), path.display());
        Ok(store)
    }

    /// Write the table as a JSON array.
    pub fn save(&self, path: &Path, force: bool) -> Result<()> {
        common::write_json_file(path, &self.records, force)
    }

    #[inline] pub fn len(&self) -> usize { self.records.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.records.is_empty() }

    #[inline] pub fn records(&self) -> &[RegionMeta] { &self.records }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &RegionMeta> { self.records.iter() }

    /// Look up by exact name; no normalization is applied.
    pub fn get(&self, name: &str) -> Option<&RegionMeta> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    #[inline] pub fn contains(&self, name: &str) -> bool { self.index.contains_key(name) }
}
