use std::{fs::File, io::{BufReader, BufWriter, Write}, path::Path};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};

use crate::common::{open_for_write, require_file_exists};

/// Reads and deserializes a JSON document from `path`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    require_file_exists(path)?;
    let file = File::open(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}

/// Serializes `value` as pretty-printed JSON and atomically writes it to `path`.
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T, force: bool) -> Result<()> {
    let pending = open_for_write(path, force)?;
    let mut writer = BufWriter::new(pending);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize JSON to {}", path.display()))?;
    writer.write_all(b"\n")?;
    let pending = writer.into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush {}: {}", path.display(), e.error()))?;
    pending.finalize()
}
