//! S3 client implementation.

use async_trait::async_trait;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::ObjectStore;

/// Region used for custom endpoints when none is configured.
const DEFAULT_ENDPOINT_REGION: &str = "us-east-1";

/// Configuration for the S3 client.
///
/// Every field is optional: without overrides the standard AWS chain
/// (environment, profile, instance role) supplies region and credentials.
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Custom S3 API endpoint (MinIO, R2, LocalStack)
    pub endpoint_url: Option<String>,
    /// Region override
    pub region: Option<String>,
    /// Static access key ID
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let access_key_id = get("S3_ACCESS_KEY_ID");
        let secret_access_key = get("S3_SECRET_ACCESS_KEY");
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together",
            ));
        }

        Ok(Self {
            endpoint_url: get("S3_ENDPOINT_URL"),
            region: get("S3_REGION"),
            access_key_id,
            secret_access_key,
        })
    }

    fn static_credentials(&self) -> Option<Credentials> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret, None, None, "preview-env")),
            _ => None,
        }
    }

    fn effective_region(&self) -> Option<String> {
        self.region.clone().or_else(|| {
            self.endpoint_url
                .as_ref()
                .map(|_| DEFAULT_ENDPOINT_REGION.to_string())
        })
    }
}

/// S3 storage client. The bucket is chosen per call.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new S3 client from configuration.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.effective_region() {
            loader = loader.region(Region::new(region));
        }
        if let Some(credentials) = config.static_credentials() {
            loader = loader.credentials_provider(credentials);
        }
        let shared = loader.load().await;

        if shared.region().is_none() {
            return Err(StorageError::config_error(
                "no region configured; set S3_REGION or AWS_REGION",
            ));
        }

        let mut builder = Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        debug!(
            endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
            static_credentials = config.access_key_id.is_some(),
            "Created S3 client"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::config_error(format!(
                    "bucket {} is not reachable: {}",
                    bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn fetch(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<aws_sdk_s3::operation::get_object::GetObjectOutput> {
        self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|service| service.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::not_found(bucket, key)
                } else {
                    StorageError::download_failed(format!(
                        "{}/{}: {}",
                        bucket,
                        key,
                        DisplayErrorContext(&e)
                    ))
                }
            })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}/{}", bucket, key);

        let response = self.fetch(bucket, key).await?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    /// Streams the body to disk chunk by chunk.
    async fn download_to_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<u64> {
        debug!("Downloading {}/{} to {}", bucket, key, path.display());

        let mut response = self.fetch(bucket, key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| StorageError::download_failed(format!("Failed to create file: {}", e)))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .body
            .try_next()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(bytes = written, "Downloaded {}/{} to {}", bucket, key, path.display());
        Ok(written)
    }

    /// Streams the file from disk.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<u64> {
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::upload_failed(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .content_length(size as i64)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        info!(bytes = size, "Uploaded {} to {}/{}", path.display(), bucket, key);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> StorageResult<S3Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        S3Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_empty_environment_uses_default_chain() {
        let config = config_from(&[]).unwrap();
        assert!(config.endpoint_url.is_none());
        assert!(config.static_credentials().is_none());
        assert!(config.effective_region().is_none());
    }

    #[test]
    fn test_custom_endpoint_gets_a_region() {
        let config = config_from(&[("S3_ENDPOINT_URL", "http://localhost:9000")]).unwrap();
        assert_eq!(config.effective_region().as_deref(), Some("us-east-1"));

        let config = config_from(&[
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
            ("S3_REGION", "auto"),
        ])
        .unwrap();
        assert_eq!(config.effective_region().as_deref(), Some("auto"));
    }

    #[test]
    fn test_credentials_must_be_paired() {
        assert!(matches!(
            config_from(&[("S3_ACCESS_KEY_ID", "id")]),
            Err(StorageError::ConfigError(_))
        ));

        let config = config_from(&[
            ("S3_ACCESS_KEY_ID", "id"),
            ("S3_SECRET_ACCESS_KEY", "secret"),
        ])
        .unwrap();
        assert!(config.static_credentials().is_some());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("S3_ENDPOINT_URL", "  "), ("S3_REGION", "")]).unwrap();
        assert!(config.endpoint_url.is_none());
        assert!(config.region.is_none());
    }
}
