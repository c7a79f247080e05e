//! Catalog table trait.

use crate::error::CatalogResult;
use async_trait::async_trait;
use s3share_core::CatalogEntry;

/// Column holding the object key.
pub const S3_KEY_COLUMN: &str = "s3_key";

/// Column holding the upload time in Unix seconds.
pub const UPLOADED_COLUMN: &str = "uploaded";

/// Maximum number of rows written per bulk request.
pub const BATCH_WRITE_LIMIT: usize = 25;

/// Remote catalog of uploads, addressed by (partition = "files", index).
///
/// The table is the source of truth; the local state file only mirrors it.
#[async_trait]
pub trait CatalogTable: Send + Sync + 'static {
    /// Fetch every row with an index strictly greater than `index`.
    ///
    /// Reads must observe all previously committed writes. The order of the
    /// returned entries is unspecified.
    async fn entries_after(&self, index: u64) -> CatalogResult<Vec<CatalogEntry>>;

    /// Write a new row, failing with `CatalogError::Conflict` if a row
    /// already exists at `entry.index`. Existing rows are never overwritten.
    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()>;

    /// Unconditionally write many rows. Used only by the one-time import.
    async fn put_batch(&self, entries: &[CatalogEntry]) -> CatalogResult<()>;

    /// Get the name of this catalog backend (e.g., "dynamodb", "sqlite").
    fn backend_name(&self) -> &'static str;

    /// Verify the table is reachable.
    async fn health_check(&self) -> CatalogResult<()> {
        Ok(())
    }
}
