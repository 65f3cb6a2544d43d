//! Snapshot persistence for the object store

use super::store::StoreState;
use crate::core::{ModelError, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub metadata: SnapshotMetadata,
    pub(crate) state: StoreState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub object_count: usize,
    pub container_count: usize,
    pub row_count: usize,
}

impl StoreSnapshot {
    pub(crate) fn new(state: StoreState) -> Self {
        let metadata = SnapshotMetadata {
            created_at: Utc::now(),
            object_count: state.object_count(),
            container_count: state.container_count(),
            row_count: state.row_count(),
        };
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            metadata,
            state,
        }
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

#[derive(Debug)]
pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Writes the snapshot to a temp file next to the target and renames it
    /// into place, so readers see either the old or the new snapshot.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| ModelError::Io(format!("Failed to create snapshot directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| ModelError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;
        let mut temp = NamedTempFile::new_in(&dir)
            .map_err(|e| ModelError::Io(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| ModelError::Io(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ModelError::Io(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.snapshot_path)
            .map_err(|e| ModelError::Io(format!("Failed to rename snapshot: {}", e)))?;

        debug!(
            "saved snapshot {} ({} objects, {} rows)",
            self.snapshot_path.display(),
            snapshot.metadata.object_count,
            snapshot.metadata.row_count
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.snapshot_path)
            .map_err(|e| ModelError::Io(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data).map_err(|e| {
            ModelError::Serialization(format!("Failed to deserialize snapshot: {}", e))
        })?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(ModelError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }

    pub fn delete(&self) -> Result<()> {
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)
                .map_err(|e| ModelError::Io(format!("Failed to delete snapshot: {}", e)))?;
        }
        Ok(())
    }
}
