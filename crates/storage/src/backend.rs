use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::local::LocalFileSystem;
use object_store::signer::Signer;
use object_store::ObjectStore;
use tracing::info;

use examly_core::config::AwsConfig;

use crate::error::StorageError;

/// Unified storage backend wrapping object_store.
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// Get the underlying ObjectStore.
    pub fn store(&self) -> &dyn ObjectStore {
        match self {
            StorageBackend::Local(b) => b.store.as_ref(),
            StorageBackend::S3(b) => b.store.as_ref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageBackend::S3(_))
    }

    /// Key prefix every blob path is placed under (e.g. "production").
    pub fn prefix(&self) -> &str {
        match self {
            StorageBackend::Local(_) => "",
            StorageBackend::S3(b) => &b.prefix,
        }
    }

    /// A time-limited URL for reading `location`.
    pub async fn signed_url(
        &self,
        location: &object_store::path::Path,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        match self {
            StorageBackend::S3(b) => {
                let url = b.store.signed_url(reqwest::Method::GET, location, ttl).await?;
                Ok(url.to_string())
            }
            StorageBackend::Local(b) => {
                let path = b.data_dir.join(location.as_ref());
                url::Url::from_file_path(&path)
                    .map(|u| u.to_string())
                    .map_err(|_| StorageError::InvalidPath(path.display().to_string()))
            }
        }
    }
}

/// Local filesystem backend.
pub struct LocalBackend {
    pub store: Arc<LocalFileSystem>,
    pub data_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let canonical = std::fs::canonicalize(data_dir)?;
        let store = LocalFileSystem::new_with_prefix(&canonical)
            .map_err(|e| StorageError::Other(format!("local filesystem error: {e}")))?;
        info!("Storage: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            data_dir: canonical,
        })
    }
}

/// S3 backend. Kept as the concrete `AmazonS3` so URLs can be presigned.
pub struct S3Backend {
    pub store: Arc<AmazonS3>,
    pub bucket: String,
    pub prefix: String,
}

impl S3Backend {
    pub fn new(aws: &AwsConfig) -> Result<Self, StorageError> {
        let bucket = aws
            .s3_bucket
            .as_deref()
            .ok_or_else(|| StorageError::NotConfigured("S3_BUCKET not set".into()))?;

        let mut builder = AmazonS3Builder::new()
            .with_region(&aws.region)
            .with_bucket_name(bucket);

        if let Some(ref key) = aws.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = aws.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(ref token) = aws.session_token {
            builder = builder.with_token(token);
        }

        if let Some(endpoint) = aws.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            // object_store requires absolute URLs
            let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.to_string()
            } else {
                format!("https://{}", endpoint)
            };
            builder = builder
                .with_endpoint(&endpoint_url)
                .with_allow_http(endpoint_url.starts_with("http://"));
        }

        let store = builder.build()?;

        let prefix = aws
            .s3_prefix
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        info!(
            "Storage: S3 backend s3://{}/{} (region: {})",
            bucket, prefix, aws.region
        );

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            prefix,
        })
    }
}
