//! SQLite-backed catalog table.
//!
//! Stores the catalog in a local database file with the same (partition,
//! index) addressing as the remote table, so the tool can run offline.

use crate::error::{CatalogError, CatalogResult};
use crate::table::CatalogTable;
use async_trait::async_trait;
use s3share_core::{CatalogEntry, PARTITION_VALUE};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS catalog (
    partition_key TEXT NOT NULL,
    idx INTEGER NOT NULL,
    s3_key TEXT NOT NULL,
    uploaded INTEGER NOT NULL,
    PRIMARY KEY (partition_key, idx)
);
"#;

fn to_db_index(index: u64) -> CatalogResult<i64> {
    i64::try_from(index)
        .map_err(|_| CatalogError::MalformedRow(format!("index {index} exceeds SQLite range")))
}

/// SQLite-based catalog table.
pub struct SqliteTable {
    pool: Pool<Sqlite>,
}

impl SqliteTable {
    /// Open (creating if missing) a catalog database.
    pub async fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let table = Self { pool };
        table.migrate().await?;
        Ok(table)
    }

    /// Create the catalog table if it does not exist.
    pub async fn migrate(&self) -> CatalogResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogTable for SqliteTable {
    #[instrument(skip(self), fields(backend = "sqlite"))]
    async fn entries_after(&self, index: u64) -> CatalogResult<Vec<CatalogEntry>> {
        let rows: Vec<(i64, String, i64)> = sqlx::query_as(
            "SELECT idx, s3_key, uploaded FROM catalog WHERE partition_key = ? AND idx > ?",
        )
        .bind(PARTITION_VALUE)
        .bind(to_db_index(index)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(idx, s3_key, uploaded)| {
                let index = u64::try_from(idx)
                    .map_err(|_| CatalogError::MalformedRow(format!("negative index {idx}")))?;
                Ok(CatalogEntry::new(index, s3_key, uploaded))
            })
            .collect()
    }

    #[instrument(skip(self, entry), fields(backend = "sqlite", index = entry.index))]
    async fn append(&self, entry: &CatalogEntry) -> CatalogResult<()> {
        let result = sqlx::query(
            "INSERT INTO catalog (partition_key, idx, s3_key, uploaded) VALUES (?, ?, ?, ?)",
        )
        .bind(PARTITION_VALUE)
        .bind(to_db_index(entry.index)?)
        .bind(&entry.s3_key)
        .bind(entry.uploaded)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(CatalogError::Conflict { index: entry.index })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, entries), fields(backend = "sqlite", count = entries.len()))]
    async fn put_batch(&self, entries: &[CatalogEntry]) -> CatalogResult<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT OR REPLACE INTO catalog (partition_key, idx, s3_key, uploaded) VALUES (?, ?, ?, ?)",
            )
            .bind(PARTITION_VALUE)
            .bind(to_db_index(entry.index)?)
            .bind(&entry.s3_key)
            .bind(entry.uploaded)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
