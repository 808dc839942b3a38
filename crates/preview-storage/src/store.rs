//! The storage capability used by the pipeline.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Bucket/key addressed object storage.
///
/// Only `get_object` and `put_object` are required. The file helpers go
/// through memory by default; backends that can stream override them.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Write a whole object, replacing any existing one.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Download an object into `path`; returns the number of bytes written.
    async fn download_to_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64> {
        let bytes = self.get_object(bucket, key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to write file: {}", e)))?;
        debug!("Downloaded {}/{} to {}", bucket, key, path.display());
        Ok(bytes.len() as u64)
    }

    /// Upload the file at `path`; returns the number of bytes sent.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<u64> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("Failed to read {}: {}", path.display(), e)))?;
        let size = bytes.len() as u64;
        self.put_object(bucket, key, bytes, content_type).await?;
        Ok(size)
    }
}
