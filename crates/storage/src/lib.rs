pub mod backend;
pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::PutPayload;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use examly_core::filename::extension_of;

pub use backend::{LocalBackend, S3Backend, StorageBackend};
pub use error::StorageError;

/// Blob store for uploaded documents: S3 when AWS is configured, otherwise
/// a directory on local disk.
pub struct BlobStore {
    backend: StorageBackend,
    temp_dir: PathBuf,
}

impl BlobStore {
    /// Select local or S3 based on AwsConfig.
    pub fn from_config(config: &examly_core::Config) -> Result<Self, StorageError> {
        let backend = if config.aws.is_configured() {
            StorageBackend::S3(S3Backend::new(&config.aws)?)
        } else {
            StorageBackend::Local(LocalBackend::new(&config.storage.data_dir)?)
        };
        Ok(Self::new(backend, config.storage.temp_dir.clone()))
    }

    pub fn new(backend: StorageBackend, temp_dir: PathBuf) -> Self {
        Self { backend, temp_dir }
    }

    /// Local-disk store rooted at `data_dir`, handy for tests and the CLI.
    pub fn local(data_dir: &Path, temp_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(
            StorageBackend::Local(LocalBackend::new(data_dir)?),
            temp_dir.to_path_buf(),
        ))
    }

    pub fn is_remote(&self) -> bool {
        self.backend.is_remote()
    }

    /// Resolve a blob path (`<owner>/<file>`) to a store location under the
    /// configured prefix. Rejects empty, absolute and `..` paths.
    fn location(&self, path: &str) -> Result<ObjectPath, StorageError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() || trimmed.split('/').any(|seg| seg == ".." || seg == ".") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let key = match self.backend.prefix() {
            "" => trimmed.to_string(),
            prefix => format!("{prefix}/{trimmed}"),
        };
        ObjectPath::parse(&key).map_err(|_| StorageError::InvalidPath(path.to_string()))
    }

    pub async fn upload(&self, path: &str, bytes: Bytes) -> Result<(), StorageError> {
        let location = self.location(path)?;
        let size = bytes.len();
        self.backend
            .store()
            .put(&location, PutPayload::from(bytes))
            .await?;
        debug!(path, size, "blob uploaded");
        Ok(())
    }

    pub async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let location = self.location(path)?;
        let result = self.backend.store().get(&location).await?;
        Ok(result.bytes().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let location = self.location(path)?;
        self.backend.store().delete(&location).await?;
        debug!(path, "blob deleted");
        Ok(())
    }

    /// URL granting read access to `path` for `ttl`.
    pub async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let location = self.location(path)?;
        self.backend.signed_url(&location, ttl).await
    }

    /// Download `path` into a temp file that keeps the blob's extension.
    /// The file is removed when the returned guard is dropped.
    pub async fn materialize(&self, path: &str) -> Result<TempBlob, StorageError> {
        let bytes = self.download(path).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await?;

        let file = tempfile::Builder::new()
            .prefix("examly-")
            .suffix(&extension_of(path))
            .tempfile_in(&self.temp_dir)?;
        tokio::fs::write(file.path(), &bytes).await?;

        info!(path, local = %file.path().display(), size = bytes.len(), "blob materialized");
        Ok(TempBlob { file: Some(file) })
    }
}

/// A blob copied to local disk. Deleted on drop.
#[derive(Debug)]
pub struct TempBlob {
    file: Option<NamedTempFile>,
}

impl TempBlob {
    pub fn path(&self) -> &Path {
        match &self.file {
            Some(f) => f.path(),
            None => Path::new(""),
        }
    }
}

impl Drop for TempBlob {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!(path = %path.display(), error = %e, "failed to remove temp blob");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> BlobStore {
        BlobStore::local(&dir.path().join("data"), &dir.path().join("tmp")).unwrap()
    }

    #[tokio::test]
    async fn upload_download_delete() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);

        blobs.upload("user-1/notes.txt", Bytes::from_static(b"Energy")).await.unwrap();
        assert_eq!(blobs.download("user-1/notes.txt").await.unwrap(), Bytes::from_static(b"Energy"));
        assert!(dir.path().join("data/user-1/notes.txt").exists());

        blobs.delete("user-1/notes.txt").await.unwrap();
        let err = blobs.download("user-1/notes.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        for bad in ["", "/", "user/../other/x.txt", "./x.txt"] {
            let err = blobs.upload(bad, Bytes::new()).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidPath(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn local_signed_url_is_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        blobs.upload("u/a.pdf", Bytes::from_static(b"%PDF")).await.unwrap();
        let url = blobs.signed_url("u/a.pdf", Duration::from_secs(60)).await.unwrap();
        assert!(url.starts_with("file://"), "{url}");
        assert!(url.ends_with("/u/a.pdf"), "{url}");
    }

    #[tokio::test]
    async fn materialized_copy_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        blobs.upload("u/slides.pptx", Bytes::from_static(b"zip")).await.unwrap();

        let temp = blobs.materialize("u/slides.pptx").await.unwrap();
        let local = temp.path().to_path_buf();
        assert!(local.starts_with(dir.path().join("tmp")));
        assert_eq!(local.extension().and_then(|e| e.to_str()), Some("pptx"));
        assert_eq!(std::fs::read(&local).unwrap(), b"zip");

        drop(temp);
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn materialize_missing_blob_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store(&dir);
        assert!(blobs.materialize("u/missing.pdf").await.is_err());
        let leftovers = std::fs::read_dir(dir.path().join("tmp"))
            .map(|d| d.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }
}
