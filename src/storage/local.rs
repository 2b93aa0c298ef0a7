//! Local filesystem snapshot storage.
//!
//! Default backend: one JSON file under the configured directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::{SnapshotData, SnapshotStorage};

/// File-based snapshot storage.
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a local storage rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("snapshot.json"),
        }
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn save(&self, snapshot: &SnapshotData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(snapshot)?;
        std::fs::write(&self.path, json)?;
        log::info!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Option<SnapshotData>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot: SnapshotData = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }
}
