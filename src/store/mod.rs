//! Relational store access.
//!
//! The assistant only needs one operation from the store: run a statement
//! and hand back rows. Every call opens its own connection, so a failed
//! attempt never leaks session state into the next one.

pub mod foods;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

pub use foods::FoodRepository;
pub use sqlite::SqliteStore;

/// A scalar value as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Null,
    Integer(i64),
    Real(f64),
    /// Exact numeric (NUMERIC/DECIMAL columns)
    Decimal(Decimal),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row: column name and value, in select-list order
pub type StoreRow = Vec<(String, StoreValue)>;

/// Named statement parameters (`:name` placeholders)
pub type QueryParams = BTreeMap<String, StoreValue>;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Statement is not read-only")]
    NotReadOnly,

    #[error("Unknown statement parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown nutrient column(s): {}", .0.join(", "))]
    UnknownColumns(Vec<String>),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// A relational store that runs statements on a fresh connection per call
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// Execute a statement and return all rows in the store's order
    async fn execute(
        &self,
        statement: &str,
        params: Option<&QueryParams>,
    ) -> Result<Vec<StoreRow>, StoreError>;
}
