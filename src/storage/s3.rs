//! AWS S3 snapshot storage.
//!
//! Stores the snapshot as a single JSON object at
//! `{bucket}/{prefix}/snapshot.json`.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::storage::{SnapshotData, SnapshotStorage};

/// S3-based snapshot storage.
pub struct S3Storage {
    client: Client,
    bucket: String,
    key: String,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: &str) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: format!("{}/snapshot.json", prefix.trim_end_matches('/')),
        }
    }

    /// Create S3 storage from environment configuration.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("CLIPMINE_S3_BUCKET")
            .map_err(|_| AppError::snapshot("CLIPMINE_S3_BUCKET is not set"))?;
        let prefix = std::env::var("CLIPMINE_S3_PREFIX").unwrap_or_else(|_| "clipmine".to_string());

        Ok(Self::new(client, bucket, &prefix))
    }
}

#[async_trait]
impl SnapshotStorage for S3Storage {
    async fn save(&self, snapshot: &SnapshotData) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        let body = ByteStream::from(json.into_bytes());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(body)
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AppError::snapshot(e.to_string()))?;

        log::info!(
            "Wrote snapshot ({} clips) to s3://{}/{}",
            snapshot.clips.len(),
            self.bucket,
            self.key
        );
        Ok(())
    }

    async fn load(&self) -> Result<Option<SnapshotData>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::snapshot(e.to_string()))?;
                let snapshot: SnapshotData = serde_json::from_slice(&bytes.into_bytes())?;
                Ok(Some(snapshot))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No snapshot at s3://{}/{}", self.bucket, self.key);
                    Ok(None)
                } else {
                    Err(AppError::snapshot(service_err.to_string()))
                }
            }
        }
    }
}
