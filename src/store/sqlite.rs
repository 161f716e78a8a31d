//! SQLite-backed relational store.
//!
//! Connections are opened per call and dropped when the call returns.
//! Columns declared NUMERIC/DECIMAL are decoded as exact decimals.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::{QueryParams, RelationalStore, StoreError, StoreRow, StoreValue};

/// How long a connection waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite store over a database file
#[derive(Debug, Clone)]
pub struct SqliteStore {
    /// Path to the database file
    path: PathBuf,

    /// Open connections read-only and refuse writing statements
    read_only: bool,
}

impl SqliteStore {
    /// Store for the assistant: read-only connections
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }

    /// Store with read-write connections
    pub fn read_write(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(
        &self,
        statement: &str,
        params: Option<&QueryParams>,
    ) -> Result<Vec<StoreRow>, StoreError> {
        let path = self.path.clone();
        let read_only = self.read_only;
        let statement = statement.to_string();
        let params = params.cloned();

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path, read_only)?;
            query_rows(&conn, &statement, params.as_ref(), read_only)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Open a fresh connection to `path`
pub(crate) fn open_connection(path: &Path, read_only: bool) -> Result<Connection, StoreError> {
    let flags = if read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
    };

    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    debug!(path = %path.display(), read_only, "Opened SQLite connection");
    Ok(conn)
}

fn query_rows(
    conn: &Connection,
    statement: &str,
    params: Option<&QueryParams>,
    read_only: bool,
) -> Result<Vec<StoreRow>, StoreError> {
    let mut stmt = conn.prepare(statement)?;

    if read_only && !stmt.readonly() {
        return Err(StoreError::NotReadOnly);
    }

    // (name, declared exact numeric)
    let columns: Vec<(String, bool)> = stmt
        .columns()
        .iter()
        .map(|c| {
            let exact = c.decl_type().map(is_exact_numeric).unwrap_or(false);
            (c.name().to_string(), exact)
        })
        .collect();

    if let Some(params) = params {
        for (name, value) in params {
            let index = stmt
                .parameter_index(&format!(":{}", name))?
                .ok_or_else(|| StoreError::UnknownParameter(name.clone()))?;
            stmt.raw_bind_parameter(index, value)?;
        }
    }

    let mut rows = stmt.raw_query();
    let mut out = Vec::new();

    while let Some(row) = rows.next()? {
        let mut record = StoreRow::with_capacity(columns.len());
        for (index, (name, exact)) in columns.iter().enumerate() {
            let value: Value = row.get(index)?;
            record.push((name.clone(), StoreValue::from_sqlite(value, *exact)));
        }
        out.push(record);
    }

    Ok(out)
}

/// Whether a declared column type holds exact numerics
fn is_exact_numeric(decl_type: &str) -> bool {
    let upper = decl_type.trim().to_ascii_uppercase();
    upper.starts_with("NUMERIC") || upper.starts_with("DECIMAL")
}

impl StoreValue {
    /// Decode a SQLite value; `exact` marks NUMERIC/DECIMAL columns
    pub fn from_sqlite(value: Value, exact: bool) -> Self {
        match value {
            Value::Null => StoreValue::Null,
            Value::Integer(i) if exact => StoreValue::Decimal(Decimal::from(i)),
            Value::Integer(i) => StoreValue::Integer(i),
            Value::Real(f) if exact => Decimal::from_f64(f)
                .map(StoreValue::Decimal)
                .unwrap_or(StoreValue::Real(f)),
            Value::Real(f) => StoreValue::Real(f),
            Value::Text(s) if exact => match Decimal::from_str(&s) {
                Ok(d) => StoreValue::Decimal(d),
                Err(_) => StoreValue::Text(s),
            },
            Value::Text(s) => StoreValue::Text(s),
            Value::Blob(b) => StoreValue::Blob(b),
        }
    }
}

impl ToSql for StoreValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            StoreValue::Null => ToSqlOutput::Owned(Value::Null),
            StoreValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            StoreValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            StoreValue::Decimal(d) => ToSqlOutput::Owned(Value::Text(d.to_string())),
            StoreValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            StoreValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}
