//! Reading and decoding import sources.
//!
//! The runner never looks inside a source file. A [`SourceReader`] fetches
//! the bytes and an [`Importer`] turns them into rows for the step's table.

use super::step::ImportStep;
use crate::core::{Fields, ModelError, Point, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A decoded source row, not yet written anywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedRow {
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Point>>,
}

/// Decodes the bytes of one step's source.
///
/// Implementations receive the whole step so they can honour its format,
/// its configuration reference and its units option.
pub trait Importer: Send + Sync {
    fn decode(&self, step: &ImportStep, source: &[u8]) -> Result<Vec<ImportedRow>>;
}

#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

#[async_trait]
impl SourceReader for FsSourceReader {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| ModelError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }
}

/// Importer for sources already converted to a JSON array of
/// `{"fields": {...}, "geometry": [{"x": .., "y": ..}, ...]}` rows,
/// whatever the step's nominal format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRowsImporter;

impl Importer for JsonRowsImporter {
    fn decode(&self, step: &ImportStep, source: &[u8]) -> Result<Vec<ImportedRow>> {
        let text = std::str::from_utf8(source).map_err(|e| {
            ModelError::ValidationError(format!("{} is not UTF-8: {}", step.id(), e))
        })?;
        serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
            ModelError::ValidationError(format!("{} is not a row list: {}", step.id(), e))
        })
    }
}
