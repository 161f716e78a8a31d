//! Query execution with bounded retries.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, warn};

use super::error::AskError;
use crate::store::{RelationalStore, StoreRow, StoreValue};

/// One normalized result row, in select-list order
pub type Row = Map<String, Value>;

/// Retry policy for query execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in milliseconds; attempt `n` waits `n * base` before the next
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(attempt.max(1) as u64))
    }

    /// Whether another attempt is allowed after `attempt` failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Runs validated statements against a store
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RelationalStore>,
    retry: RetryPolicy,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn RelationalStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// The retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run `sql`, retrying failed attempts, and normalize the rows
    pub async fn execute(&self, sql: &str) -> Result<Vec<Row>, AskError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.store.execute(sql, None).await {
                Ok(rows) => {
                    debug!(attempt, rows = rows.len(), store = self.store.name(), "Query succeeded");
                    return Ok(rows.into_iter().map(normalize_row).collect());
                }
                Err(e) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Query failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Query failed, giving up");
                    return Err(AskError::Execution {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}

/// Convert a store row into JSON scalars; exact decimals become `f64`
pub fn normalize_row(row: StoreRow) -> Row {
    row.into_iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

fn normalize_value(value: StoreValue) -> Value {
    match value {
        StoreValue::Null => Value::Null,
        StoreValue::Integer(i) => Value::from(i),
        StoreValue::Real(f) => float(f),
        StoreValue::Decimal(d) => d.to_f64().map(float).unwrap_or(Value::Null),
        StoreValue::Text(s) => Value::String(s),
        StoreValue::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

/// Non-finite floats have no JSON form
fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
