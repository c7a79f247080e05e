//! Local state cache.
//!
//! A JSON mirror of the catalog prefix this machine has already seen, stored
//! at `$HOME/.s3share` by default. Access is serialized across processes by
//! an advisory lock on a sidecar `.lock` file.

use crate::error::{CatalogError, CatalogResult};
use fs4::fs_std::FileExt;
use s3share_core::CatalogEntry;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// File name of the state cache under `$HOME`.
pub const STATE_FILE_NAME: &str = ".s3share";

/// Index-ordered prefix of the remote catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalState {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
    #[serde(default)]
    last_fetched_index: u64,
}

impl LocalState {
    /// Empty state: nothing fetched yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry that follows everything already cached.
    ///
    /// Entries at or below `last_fetched_index` are rejected so the cache
    /// stays strictly ordered by index.
    pub fn append(&mut self, entry: CatalogEntry) -> CatalogResult<()> {
        if entry.index <= self.last_fetched_index {
            return Err(CatalogError::OutOfOrder {
                index: entry.index,
                last_fetched_index: self.last_fetched_index,
            });
        }
        self.last_fetched_index = entry.index;
        self.entries.push(entry);
        Ok(())
    }

    /// Cached entries, ascending by index.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Highest index known locally; 0 when empty.
    pub fn last_fetched_index(&self) -> u64 {
        self.last_fetched_index
    }

    /// Index the next upload should try to claim.
    pub fn next_index(&self) -> u64 {
        self.last_fetched_index + 1
    }

    /// Check the invariants `append` maintains: indices strictly ascending
    /// and `last_fetched_index` equal to the highest one (0 when empty).
    pub fn validate(&self) -> CatalogResult<()> {
        if let Some(pair) = self.entries.windows(2).find(|p| p[1].index <= p[0].index) {
            return Err(CatalogError::InconsistentState(format!(
                "entry {} follows entry {}",
                pair[1].index, pair[0].index
            )));
        }

        let highest = self.entries.last().map_or(0, |e| e.index);
        if highest != self.last_fetched_index {
            return Err(CatalogError::InconsistentState(format!(
                "last_fetched_index is {} but the highest cached index is {highest}",
                self.last_fetched_index
            )));
        }
        Ok(())
    }
}

/// Default state file location, `$HOME/.s3share`.
pub fn default_state_path() -> CatalogResult<PathBuf> {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(STATE_FILE_NAME)),
        _ => Err(CatalogError::MissingHome),
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive handle on the state file.
///
/// The lock is taken in [`StateFile::open`] and released when the handle is
/// dropped, so a load/sync/save cycle must happen while one is alive.
#[derive(Debug)]
pub struct StateFile {
    path: PathBuf,
    _lock: File,
}

impl StateFile {
    /// Lock the state file at `path`, waiting for other processes to finish.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let lock_path = lock_path_for(&path);
        let lock = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(std::io::Error::other)??;

        tracing::debug!("state file locked");
        Ok(Self { path, _lock: lock })
    }

    /// Path of the JSON state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached state. A missing file is an empty state; a file that
    /// breaks index ordering is an error rather than a source of bad indices.
    pub async fn load(&self) -> CatalogResult<LocalState> {
        let state: LocalState = match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(LocalState::new()),
            Err(err) => return Err(err.into()),
        };
        state.validate()?;
        Ok(state)
    }

    /// Replace the state file atomically.
    pub async fn save(&self, state: &LocalState) -> CatalogResult<()> {
        let json = serde_json::to_vec_pretty(state)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| STATE_FILE_NAME.to_string());
        let temp_path = self
            .path
            .with_file_name(format!(".{file_name}.tmp.{}", uuid::Uuid::new_v4()));

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err.into());
        }

        tracing::debug!(
            entries = state.entries.len(),
            last_fetched_index = state.last_fetched_index,
            "state saved"
        );
        Ok(())
    }
}
