//! Incremental catalog pull.

use crate::error::CatalogResult;
use crate::state::LocalState;
use crate::table::CatalogTable;
use tracing::instrument;

/// Pull every remote row newer than `state.last_fetched_index()` into `state`.
///
/// Rows are merged in ascending index order whatever order the table returns
/// them in. Returns the number of entries appended. The caller persists the
/// state.
#[instrument(skip_all, fields(backend = table.backend_name(), after = state.last_fetched_index()))]
pub async fn reconcile(state: &mut LocalState, table: &dyn CatalogTable) -> CatalogResult<usize> {
    let mut fetched = table.entries_after(state.last_fetched_index()).await?;
    fetched.sort_by_key(|entry| entry.index);

    let mut appended = 0;
    for entry in fetched {
        if entry.index <= state.last_fetched_index() {
            tracing::warn!(
                index = entry.index,
                last_fetched_index = state.last_fetched_index(),
                "skipping catalog row at or below last fetched index"
            );
            continue;
        }
        state.append(entry)?;
        appended += 1;
    }

    if appended > 0 {
        tracing::info!(
            appended,
            last_fetched_index = state.last_fetched_index(),
            "local state synced"
        );
    }
    Ok(appended)
}
