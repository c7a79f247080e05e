//! Print the catalog with public URLs.

use anyhow::{Context, Result};
use s3share_catalog::{CatalogTable, LocalState, reconcile};
use s3share_core::zone::to_local;
use s3share_core::{CatalogEntry, TimeZone, serve_url};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const LIST_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// `YYYY-MM-DD HH:MM:SS: <url>` for one entry, in wall-clock time of `zone`.
pub fn format_entry(entry: &CatalogEntry, base_url: &str, zone: &dyn TimeZone) -> Result<String> {
    let uploaded = OffsetDateTime::from_unix_timestamp(entry.uploaded)
        .with_context(|| format!("entry {} has an out-of-range upload time", entry.index))?;
    let uploaded = to_local(uploaded, zone);
    Ok(format!(
        "{}: {}",
        uploaded.format(LIST_TIME_FORMAT)?,
        serve_url(base_url, &entry.s3_key)
    ))
}

/// One line per cached entry, ascending by index.
pub fn list_lines(
    state: &LocalState,
    base_url: &str,
    zone: &dyn TimeZone,
) -> Result<Vec<String>> {
    state
        .entries()
        .iter()
        .map(|entry| format_entry(entry, base_url, zone))
        .collect()
}

/// Sync the cache, then print every entry.
pub async fn run(
    table: &dyn CatalogTable,
    state: &mut LocalState,
    base_url: &str,
    zone: &dyn TimeZone,
) -> Result<()> {
    reconcile(state, table)
        .await
        .context("failed to sync catalog")?;
    for line in list_lines(state, base_url, zone)? {
        println!("{line}");
    }
    Ok(())
}
