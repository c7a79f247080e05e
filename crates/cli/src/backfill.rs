//! One-time catalog import from a bucket listing.
//!
//! Run once against a bucket whose objects predate the catalog. Running it
//! against a table that already has rows overwrites or duplicates indices;
//! nothing here guards against that.

use anyhow::{Context, Result};
use s3share_catalog::CatalogTable;
use s3share_core::{CatalogEntry, TimeZone, assign_indices, parse_listing};
use tracing::instrument;

/// Parse the whole listing, reading its times in `zone`, and number it by
/// upload time.
pub fn plan(listing: &str, zone: &dyn TimeZone) -> Result<Vec<CatalogEntry>> {
    let objects = parse_listing(listing, zone).context("failed to parse bucket listing")?;
    Ok(assign_indices(objects))
}

/// Human-readable line for one planned row.
pub fn describe(entry: &CatalogEntry) -> String {
    format!("{}. {}: {:?}", entry.index, entry.uploaded, entry.s3_key)
}

/// Write every planned row.
#[instrument(skip_all, fields(backend = table.backend_name(), count = entries.len()))]
pub async fn import(table: &dyn CatalogTable, entries: &[CatalogEntry]) -> Result<()> {
    table
        .put_batch(entries)
        .await
        .context("failed to write catalog rows")?;
    tracing::info!("catalog import complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s3share_catalog::SqliteTable;
    use time::UtcOffset;
    use time::macros::offset;

    #[test]
    fn plan_orders_by_timestamp() {
        let listing = "2021-01-02 10:00:00 5 b.txt\n2021-01-01 09:00:00 3 a.txt\n";
        let entries = plan(listing, &UtcOffset::UTC).unwrap();
        assert_eq!(
            entries,
            vec![
                CatalogEntry::new(1, "a.txt", 1_609_491_600),
                CatalogEntry::new(2, "b.txt", 1_609_581_600),
            ]
        );
        assert_eq!(describe(&entries[0]), "1. 1609491600: \"a.txt\"");
    }

    #[test]
    fn plan_interprets_times_in_offset() {
        let entries = plan("2021-01-01 10:00:00 3 a.txt", &offset!(+1)).unwrap();
        assert_eq!(entries[0].uploaded, 1_609_491_600);
    }

    #[test]
    fn plan_fails_on_any_bad_line() {
        let listing = "2021-01-01 09:00:00 3 a.txt\nPRE photos/\n";
        let err = plan(listing, &UtcOffset::UTC).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[tokio::test]
    async fn import_writes_planned_rows() {
        let dir = tempfile::tempdir().unwrap();
        let table = SqliteTable::new(dir.path().join("catalog.db")).await.unwrap();
        let entries = plan(
            "2021-01-02 10:00:00 5 b.txt\n2021-01-01 09:00:00 3 a.txt",
            &UtcOffset::UTC,
        )
        .unwrap();

        import(&table, &entries).await.unwrap();
        let mut rows = table.entries_after(0).await.unwrap();
        rows.sort_by_key(|e| e.index);
        assert_eq!(rows, entries);
    }
}
