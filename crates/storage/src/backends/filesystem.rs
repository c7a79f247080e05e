//! Local filesystem storage backend.
//!
//! Mirrors a flat bucket into a directory. Access control and storage class
//! have no local equivalent and are ignored.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectStore, PutOptions};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::instrument;
use uuid::Uuid;

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend, creating the root directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key.
    ///
    /// Keys are single file names; anything that could resolve outside the
    /// root (separators, `..`, absolute paths) is rejected. What counts as a
    /// separator is the platform's call, so `\` is a plain character on Unix.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !key.contains('/') => Ok(self.root.join(key)),
            _ => Err(StorageError::InvalidKey(format!(
                "key must be a plain file name: {key:?}"
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self, source, options), fields(backend = "filesystem"))]
    async fn put_file(&self, key: &str, source: &Path, options: &PutOptions) -> StorageResult<u64> {
        let path = self.key_path(key)?;
        tracing::debug!(content_type = %options.content_type, "writing object");

        // Stream into a temp file, fsync, then rename. The temp name does not
        // embed the key so long keys stay within the file name limit.
        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let copied = async {
            let mut reader = fs::File::open(source).await?;
            let mut file = fs::File::create(&temp_path).await?;
            let copied = tokio::io::copy(&mut reader, &mut file).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(copied)
        }
        .await;

        let copied = match copied {
            Ok(copied) => copied,
            Err(err) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(err.into());
            }
        };
        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(err.into());
        }

        tracing::debug!(size = copied, "object written");
        Ok(copied)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::Config(format!(
                "storage root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}
