//! Backend reachability report for `-v` and `-d` runs.

use s3share_catalog::CatalogTable;
use s3share_storage::ObjectStore;

/// Check each backend in use and log the outcome.
///
/// Failures are only reported; the operation that needs the backend will
/// surface the real error. Returns whether every check passed.
pub async fn report(store: Option<&dyn ObjectStore>, table: &dyn CatalogTable) -> bool {
    let mut healthy = true;

    if let Some(store) = store {
        match store.health_check().await {
            Ok(()) => tracing::info!(backend = store.backend_name(), "storage reachable"),
            Err(err) => {
                tracing::warn!(backend = store.backend_name(), error = %err, "storage health check failed");
                healthy = false;
            }
        }
    }

    match table.health_check().await {
        Ok(()) => tracing::info!(backend = table.backend_name(), "catalog reachable"),
        Err(err) => {
            tracing::warn!(backend = table.backend_name(), error = %err, "catalog health check failed");
            healthy = false;
        }
    }

    healthy
}
