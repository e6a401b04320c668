use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::filter::{Filter, FilterError};
use crate::types::{Operation, Row, Table};

/// Errors from the managed data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{operation} on {table} expected exactly one row, got {count}")]
    RowCount { table: Table, operation: Operation, count: usize },

    #[error("{operation} on {table} requires at least one filter")]
    Unfiltered { table: Table, operation: Operation },

    #[error("store rejected {operation} on {table} (status {status}): {body}")]
    Rejected { table: Table, operation: Operation, status: u16, body: String },

    #[error("Invalid query: {0}")]
    Query(#[from] FilterError),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Invalid store configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// One statement against the managed store per call.
///
/// Update and delete receive a filter that is never empty; the query builder
/// refuses to send unfiltered mutations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    /// Inserts one row and returns the stored representation.
    async fn insert(&self, table: Table, row: Row) -> Result<Vec<Row>, StoreError>;

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    /// Writes `changes` into every matching row and returns the updated rows.
    async fn update(&self, table: Table, changes: Row, filter: &Filter) -> Result<Vec<Row>, StoreError>;

    /// Returns the number of rows removed.
    async fn delete(&self, table: Table, filter: &Filter) -> Result<u64, StoreError>;
}

/// Converts a JSON row into a typed model.
pub fn decode_row<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Unwraps a JSON value that must be an object row.
pub fn expect_row(value: Value) -> Result<Row, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!("expected object row, got {}", other))),
    }
}
