//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use s3share_core::DEFAULT_STORAGE_CLASS;
use std::path::Path;

/// Canned ACL every shared object gets: readable through its public URL.
pub const PUBLIC_READ_ACL: &str = "public-read";

/// Per-object upload options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME type served with the object.
    pub content_type: String,
    /// Storage class (tier) for the object, e.g. `STANDARD_IA`.
    pub storage_class: String,
}

impl PutOptions {
    /// Publicly readable object in the given storage class.
    pub fn public(content_type: impl Into<String>, storage_class: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            storage_class: storage_class.into(),
        }
    }
}

impl Default for PutOptions {
    fn default() -> Self {
        Self::public(s3share_core::DEFAULT_CONTENT_TYPE, DEFAULT_STORAGE_CLASS)
    }
}

/// Object store abstraction for shared uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Stream the file at `path` into an object, replacing any existing
    /// object under the same key. Returns the number of bytes stored.
    ///
    /// The file is read in chunks; it is never held in memory whole.
    async fn put_file(&self, key: &str, path: &Path, options: &PutOptions) -> StorageResult<u64>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    async fn health_check(&self) -> StorageResult<()>;
}
