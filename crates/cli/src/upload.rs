//! Upload files and record them in the catalog.

use anyhow::{Context, Result};
use s3share_catalog::{CatalogTable, LocalState, reconcile};
use s3share_core::{AppConfig, CatalogEntry, content_type_for, object_key_for_path, serve_url};
use s3share_storage::{ObjectStore, PutOptions};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::instrument;

/// A file that now exists in the object store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedObject {
    /// Local file the object was read from.
    pub path: PathBuf,
    /// Object key it was stored under.
    pub key: String,
    /// Public URL of the object.
    pub url: String,
}

/// Store every file in `paths`, in order, and return where each one landed.
///
/// Stops at the first failure; objects already stored stay stored.
pub async fn upload_objects(
    store: &dyn ObjectStore,
    config: &AppConfig,
    paths: &[PathBuf],
) -> Result<Vec<UploadedObject>> {
    let base_url = config.serve_base_url();
    let storage_class = config.storage.storage_class();

    let mut uploaded = Vec::with_capacity(paths.len());
    for path in paths {
        let object = upload_one(
            store,
            path,
            config.share.replace_non_urlsafe_characters,
            storage_class,
            &base_url,
        )
        .await?;
        uploaded.push(object);
    }
    Ok(uploaded)
}

#[instrument(skip(store, path, storage_class, base_url), fields(path = %path.display()))]
async fn upload_one(
    store: &dyn ObjectStore,
    path: &Path,
    replace_non_urlsafe: bool,
    storage_class: &str,
    base_url: &str,
) -> Result<UploadedObject> {
    let key = object_key_for_path(path, replace_non_urlsafe)?;
    let options = PutOptions::public(content_type_for(&key), storage_class);

    let size = store
        .put_file(&key, path, &options)
        .await
        .with_context(|| format!("failed to upload {} as {key:?}", path.display()))?;

    tracing::info!(key = %key, size, content_type = %options.content_type, "uploaded");
    Ok(UploadedObject {
        path: path.to_path_buf(),
        url: serve_url(base_url, &key),
        key,
    })
}

/// Claim the next catalog indices for `keys`, in order.
///
/// Syncs first so indices follow whatever other writers appended. A row that
/// already exists at the claimed index is a hard error; `state` only gains
/// entries whose rows were written.
#[instrument(skip_all, fields(count = keys.len()))]
pub async fn record_uploads<K, F>(
    state: &mut LocalState,
    table: &dyn CatalogTable,
    keys: &[K],
    now: F,
) -> Result<Vec<CatalogEntry>>
where
    K: AsRef<str>,
    F: Fn() -> OffsetDateTime,
{
    reconcile(state, table)
        .await
        .context("failed to sync catalog before recording uploads")?;

    let mut recorded = Vec::with_capacity(keys.len());
    for key in keys {
        let entry = CatalogEntry::new(state.next_index(), key.as_ref(), now().unix_timestamp());
        table
            .append(&entry)
            .await
            .with_context(|| format!("failed to record {:?} at index {}", entry.s3_key, entry.index))?;
        state.append(entry.clone())?;
        tracing::debug!(index = entry.index, key = %entry.s3_key, "recorded");
        recorded.push(entry);
    }
    Ok(recorded)
}

/// The `upload` half of the command line: store, print URLs, record.
pub async fn run(
    store: &dyn ObjectStore,
    table: &dyn CatalogTable,
    state: &mut LocalState,
    config: &AppConfig,
    paths: &[PathBuf],
) -> Result<Vec<CatalogEntry>> {
    let uploaded = upload_objects(store, config, paths).await?;
    for object in &uploaded {
        println!("{}", object.url);
    }

    let keys: Vec<&str> = uploaded.iter().map(|o| o.key.as_str()).collect();
    record_uploads(state, table, &keys, OffsetDateTime::now_utc).await
}
