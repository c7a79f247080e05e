//! Catalog entry model.

use serde::{Deserialize, Serialize};

/// Partition key value under which every catalog row is stored.
pub const PARTITION_VALUE: &str = "files";

/// A single upload recorded in the catalog.
///
/// Indices are assigned sequentially at write time and never reused. The
/// serialized field names match the catalog table columns and the local
/// state file layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Object key of the stored blob.
    pub s3_key: String,
    /// Upload time in Unix seconds.
    pub uploaded: i64,
    /// Position in the catalog, starting at 1.
    pub index: u64,
}

impl CatalogEntry {
    pub fn new(index: u64, s3_key: impl Into<String>, uploaded: i64) -> Self {
        Self {
            s3_key: s3_key.into(),
            uploaded,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_catalog_column_names() {
        let entry = CatalogEntry::new(7, "photo.jpg", 1_600_000_000);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["s3_key"], "photo.jpg");
        assert_eq!(value["uploaded"], 1_600_000_000);
        assert_eq!(value["index"], 7);
    }
}
