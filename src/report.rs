//! JSON files for import reports and job results.

use crate::core::{ModelError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes `value` as pretty JSON, replacing `path` atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .map_err(|e| ModelError::Io(format!("Failed to create report directory: {}", e)))?;

    let body = serde_json::to_vec_pretty(value)?;
    let mut temp = NamedTempFile::new_in(&dir)
        .map_err(|e| ModelError::Io(format!("Failed to create temp file: {}", e)))?;
    temp.write_all(&body)
        .map_err(|e| ModelError::Io(format!("Failed to write report: {}", e)))?;
    temp.persist(path)
        .map_err(|e| ModelError::Io(format!("Failed to rename report: {}", e)))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let body = fs::read(path)
        .map_err(|e| ModelError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_slice(&body)?)
}
