//! Configuration types shared across crates.
//!
//! A single [`AppConfig`] is built at process entry and passed by reference
//! to every component that needs it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Object storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem directory (offline use and testing).
    Filesystem {
        /// Root directory for stored objects.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// AWS access key ID. Falls back to the default credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the default credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`).
        #[serde(default)]
        force_path_style: bool,
        /// Storage class applied to uploaded objects.
        #[serde(default = "default_storage_class")]
        storage_class: String,
    },
}

fn default_storage_class() -> String {
    crate::DEFAULT_STORAGE_CLASS.to_string()
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                validate_credentials("s3", access_key_id, secret_access_key)
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }

    /// Storage class applied to uploaded objects.
    pub fn storage_class(&self) -> &str {
        match self {
            StorageConfig::S3 { storage_class, .. } => storage_class,
            StorageConfig::Filesystem { .. } => crate::DEFAULT_STORAGE_CLASS,
        }
    }

    /// Base URL objects are served from when no explicit base is configured.
    pub fn default_serve_base_url(&self) -> String {
        match self {
            StorageConfig::Filesystem { path } => {
                format!("file://{}/", path.display().to_string().trim_end_matches('/'))
            }
            StorageConfig::S3 {
                bucket,
                endpoint: Some(endpoint),
                ..
            } => format!("{}/{}/", endpoint.trim_end_matches('/'), bucket),
            StorageConfig::S3 { bucket, region, .. } => format!(
                "https://s3.{}.amazonaws.com/{}/",
                region.as_deref().unwrap_or(DEFAULT_REGION),
                bucket
            ),
        }
    }
}

/// Catalog table backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogConfig {
    /// DynamoDB table keyed by (partition, sort).
    Dynamodb {
        /// Table name.
        table: String,
        /// Optional endpoint URL (for DynamoDB Local).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// AWS access key ID. Falls back to the default credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the default credential chain if not set.
        secret_access_key: Option<String>,
        /// Name of the partition key attribute.
        #[serde(default = "default_partition_key")]
        partition_key: String,
        /// Name of the numeric sort key attribute holding the catalog index.
        #[serde(default = "default_sort_key")]
        sort_key: String,
    },
    /// SQLite database file (offline use and testing).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
}

fn default_partition_key() -> String {
    "partition".to_string()
}

fn default_sort_key() -> String {
    "index".to_string()
}

impl CatalogConfig {
    /// Validate catalog configuration invariants.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            CatalogConfig::Dynamodb {
                table,
                access_key_id,
                secret_access_key,
                partition_key,
                sort_key,
                ..
            } => {
                if table.is_empty() {
                    return Err("dynamodb config requires a non-empty table".to_string());
                }
                if partition_key.is_empty() || sort_key.is_empty() {
                    return Err("dynamodb key attribute names must not be empty".to_string());
                }
                if partition_key == sort_key {
                    return Err(format!(
                        "dynamodb partition_key and sort_key must differ (both are '{partition_key}')"
                    ));
                }
                validate_credentials("dynamodb", access_key_id, secret_access_key)
            }
            CatalogConfig::Sqlite { .. } => Ok(()),
        }
    }
}

fn validate_credentials(
    backend: &str,
    access_key_id: &Option<String>,
    secret_access_key: &Option<String>,
) -> std::result::Result<(), String> {
    match (access_key_id.as_ref(), secret_access_key.as_ref()) {
        (Some(_), Some(_)) | (None, None) => Ok(()),
        _ => Err(format!(
            "{backend} config requires both access_key_id and secret_access_key when either is set"
        )),
    }
}

/// Upload and listing behaviour.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Public base URL objects are served from (e.g. a CDN in front of the bucket).
    #[serde(default)]
    pub serve_base_url: Option<String>,
    /// Rewrite characters outside `[A-Za-z0-9._-]` in file names to `_`.
    #[serde(default)]
    pub replace_non_urlsafe_characters: bool,
    /// Local state file. Defaults to `$HOME/.s3share`.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl ShareConfig {
    /// Resolve the base URL used for public links, always ending with `/`.
    pub fn serve_base_url(&self, storage: &StorageConfig) -> String {
        match &self.serve_base_url {
            Some(base) if base.ends_with('/') => base.clone(),
            Some(base) => format!("{base}/"),
            None => storage.default_serve_base_url(),
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration.
    pub storage: StorageConfig,
    /// Catalog table configuration.
    pub catalog: CatalogConfig,
    /// Upload and listing behaviour.
    #[serde(default)]
    pub share: ShareConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.storage.validate().map_err(Error::Config)?;
        self.catalog.validate().map_err(Error::Config)?;
        Ok(())
    }

    /// Base URL for public links.
    pub fn serve_base_url(&self) -> String {
        self.share.serve_base_url(&self.storage)
    }

    /// Create a local-only configuration rooted in `dir`.
    ///
    /// **For testing only.** Uses filesystem storage and a SQLite catalog.
    pub fn for_testing(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            storage: StorageConfig::Filesystem {
                path: dir.join("objects"),
            },
            catalog: CatalogConfig::Sqlite {
                path: dir.join("catalog.db"),
            },
            share: ShareConfig {
                serve_base_url: Some("https://files.example.com/".to_string()),
                replace_non_urlsafe_characters: false,
                state_path: Some(dir.join("state.json")),
            },
        }
    }
}
