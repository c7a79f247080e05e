//! Catalog error types.

use thiserror::Error;

/// Catalog, local state and sync errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog index {index} is already taken")]
    Conflict { index: u64 },

    #[error("malformed catalog row: {0}")]
    MalformedRow(String),

    #[error("entry index {index} does not follow last fetched index {last_fetched_index}")]
    OutOfOrder { index: u64, last_fetched_index: u64 },

    #[error("HOME must be set in environment to locate the local state file")]
    MissingHome,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("DynamoDB error: {0}")]
    Dynamo(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file error: {0}")]
    State(#[from] serde_json::Error),

    #[error("inconsistent state file: {0}")]
    InconsistentState(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
