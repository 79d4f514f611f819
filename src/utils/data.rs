use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Save entries to a JSON cache file, creating parent directories as needed
pub fn save_to_cache<T: Serialize>(entries: &[T], cache_file: impl AsRef<Path>) -> Result<()> {
    let path = cache_file.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(entries).context("Failed to serialize entries")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write cache file {}", path.display()))?;
    Ok(())
}

/// Load entries from a JSON cache file
pub fn load_from_cache<T: DeserializeOwned>(cache_file: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = cache_file.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache file {}", path.display()))?;
    let entries = serde_json::from_str(&json).context("Failed to deserialize entries")?;
    Ok(entries)
}

/// Write entries to CSV, one row per game, headers taken from the JSON field names
pub fn save_to_csv<T: Serialize>(entries: &[T], filename: impl AsRef<Path>) -> Result<()> {
    let path = filename.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry).context("Failed to write CSV row")?;
    }
    writer.flush()?;
    Ok(())
}
