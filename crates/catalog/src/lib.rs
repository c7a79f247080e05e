//! Upload catalog for s3share.
//!
//! This crate provides:
//! - The `CatalogTable` trait over the remote, append-only catalog
//! - Backends: DynamoDB and SQLite
//! - The local state cache and the sync engine that refreshes it

pub mod dynamodb;
pub mod error;
pub mod sqlite;
pub mod state;
pub mod sync;
pub mod table;

pub use dynamodb::DynamoTable;
pub use error::{CatalogError, CatalogResult};
pub use sqlite::SqliteTable;
pub use state::{LocalState, StateFile, default_state_path};
pub use sync::reconcile;
pub use table::CatalogTable;

use s3share_core::config::CatalogConfig;
use std::sync::Arc;

/// Create a catalog table from configuration.
pub async fn from_config(config: &CatalogConfig) -> CatalogResult<Arc<dyn CatalogTable>> {
    config.validate().map_err(CatalogError::Config)?;

    match config {
        CatalogConfig::Sqlite { path } => {
            let table = SqliteTable::new(path).await?;
            Ok(Arc::new(table))
        }
        CatalogConfig::Dynamodb {
            table,
            endpoint,
            region,
            access_key_id,
            secret_access_key,
            partition_key,
            sort_key,
        } => {
            let table = DynamoTable::new(
                table,
                endpoint.clone(),
                region.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                partition_key,
                sort_key,
            )
            .await?;
            Ok(Arc::new(table))
        }
    }
}
