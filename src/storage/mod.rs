//! Durable snapshot storage.
//!
//! The store's dataset is periodically serialized to an external object
//! store and reloaded at startup, so a restart does not begin from an
//! empty index. The snapshot is strictly best-effort: a missing,
//! corrupt, or version-mismatched snapshot is treated as "no snapshot"
//! and never aborts startup.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Clip;
use crate::store::ClipStore;

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Versioned snapshot container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Schema version tag; mismatches make the snapshot unusable
    pub version: u32,
    /// The full clip list
    pub clips: Vec<Clip>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, snapshot: &SnapshotData) -> Result<()>;

    /// Load the current snapshot, or `None` when there is none.
    async fn load(&self) -> Result<Option<SnapshotData>>;
}

/// Attempt to warm-start the store from a durable snapshot.
///
/// Any failure path logs and leaves the store empty; the crawler's
/// first cycle then populates it from scratch.
pub async fn restore(store: &ClipStore, storage: &dyn SnapshotStorage, expected_version: u32) {
    store.set_status("Attempting to restore from snapshot...");
    let started = Instant::now();

    let snapshot = match storage.load().await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            log::info!("No snapshot available, starting empty");
            return;
        }
        Err(e) => {
            log::error!("Snapshot load failed, starting empty: {}", e);
            return;
        }
    };

    if snapshot.version != expected_version {
        log::info!(
            "Snapshot version {} does not match ours ({}), starting empty",
            snapshot.version,
            expected_version
        );
        return;
    }

    store.set_status("Snapshot is good, restoring...");
    let summary = store.ingest(snapshot.clips, started.elapsed(), true);
    log::info!("Restored {} clips from snapshot", summary.total);
}

/// Serialize the store's current dataset to the snapshot backend.
pub async fn backup(store: &ClipStore, storage: &dyn SnapshotStorage, version: u32) -> Result<()> {
    store.set_status("Backing up snapshot...");
    let snapshot = SnapshotData {
        version,
        clips: store.all_clips(),
    };
    storage.save(&snapshot).await?;
    store.mark_snapshot_taken();
    log::info!("Snapshot saved ({} clips)", snapshot.clips.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use crate::models::{Channel, RankingConfig};

    fn sample_clips() -> Vec<Clip> {
        let channel = Arc::new(Channel {
            id: 1,
            user_id: 10,
            name: "streamer".to_string(),
            viewers_current: 100,
            online: true,
            partnered: false,
            language: "en".to_string(),
            logo_url: String::new(),
        });
        ["a", "b", "c"]
            .iter()
            .map(|id| Clip {
                content_id: id.to_string(),
                title: format!("clip {id}"),
                view_count: 10,
                rank: 0.0,
                type_id: 1,
                game_title: "Some Game".to_string(),
                clip_url: String::new(),
                shareable_url: String::new(),
                duration_secs: 30,
                uploaded_at: Utc::now() - chrono::Duration::hours(1),
                expires_at: Utc::now() + chrono::Duration::days(7),
                hype_zone_channel_id: 0,
                channel: Arc::clone(&channel),
            })
            .collect()
    }

    #[tokio::test]
    async fn restore_then_backup_round_trips_content_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path());
        let store = ClipStore::new(RankingConfig::default());

        storage
            .save(&SnapshotData {
                version: 1,
                clips: sample_clips(),
            })
            .await
            .expect("save");

        restore(&store, &storage, 1).await;
        assert_eq!(store.clip_count(), 3);

        backup(&store, &storage, 1).await.expect("backup");
        let reloaded = storage.load().await.expect("load").expect("present");

        let original: HashSet<String> =
            sample_clips().into_iter().map(|c| c.content_id).collect();
        let round_tripped: HashSet<String> =
            reloaded.clips.into_iter().map(|c| c.content_id).collect();
        assert_eq!(original, round_tripped);
    }

    #[tokio::test]
    async fn version_mismatch_is_treated_as_no_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path());
        let store = ClipStore::new(RankingConfig::default());

        storage
            .save(&SnapshotData {
                version: 2,
                clips: sample_clips(),
            })
            .await
            .expect("save");

        restore(&store, &storage, 1).await;
        assert_eq!(store.clip_count(), 0);
    }

    #[tokio::test]
    async fn missing_snapshot_leaves_store_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path());
        let store = ClipStore::new(RankingConfig::default());

        restore(&store, &storage, 1).await;
        assert_eq!(store.clip_count(), 0);
    }

    #[tokio::test]
    async fn backup_marks_the_snapshot_time() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path());
        let store = ClipStore::new(RankingConfig::default());

        assert!(store.snapshot_due(Duration::from_secs(1800)));
        backup(&store, &storage, 1).await.expect("backup");
        assert!(!store.snapshot_due(Duration::from_secs(1800)));
    }
}
