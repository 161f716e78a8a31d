//! Query Executor Integration Tests
//!
//! Retry/backoff behavior against a flaky store, and value normalization
//! against a real SQLite database.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nutria::core::{AskError, QueryExecutor, RetryPolicy};
use nutria::domain::FoodDraft;
use nutria::store::{
    FoodRepository, QueryParams, RelationalStore, SqliteStore, StoreError, StoreRow, StoreValue,
};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::time::Instant;

/// Fails the first `failures` calls, then returns one row
struct FlakyStore {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RelationalStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn execute(
        &self,
        _statement: &str,
        _params: Option<&QueryParams>,
    ) -> Result<Vec<StoreRow>, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(StoreError::Task(format!("connection reset (call {})", call)));
        }

        Ok(vec![vec![
            ("codigomex2".to_string(), StoreValue::Integer(1)),
            (
                "protein".to_string(),
                StoreValue::Decimal(Decimal::from_str("12.3456").unwrap()),
            ),
        ]])
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_then_success() {
    let store = Arc::new(FlakyStore::new(2));
    let executor = QueryExecutor::new(store.clone(), RetryPolicy::default());

    let start = Instant::now();
    let rows = executor.execute("SELECT * FROM alimentos LIMIT 10").await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    assert_eq!(rows.len(), 1);
    assert!((rows[0]["protein"].as_f64().unwrap() - 12.3456).abs() < 1e-9);

    // 1s after the first failure, 2s after the second
    assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() {
    let store = Arc::new(FlakyStore::new(u32::MAX));
    let executor = QueryExecutor::new(store.clone(), RetryPolicy::default());

    let start = Instant::now();
    let err = executor.execute("SELECT * FROM alimentos").await.unwrap_err();

    assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    match err {
        AskError::Execution { attempts, source } => {
            assert_eq!(attempts, 3);
            // The last failure is the one reported
            assert!(source.to_string().contains("call 3"));
        }
        other => panic!("expected Execution, got {:?}", other),
    }

    // No sleep after the final attempt
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_custom_policy() {
    let store = Arc::new(FlakyStore::new(1));
    let policy = RetryPolicy {
        max_attempts: 2,
        backoff_base_ms: 250,
    };
    let executor = QueryExecutor::new(store.clone(), policy.clone());

    let start = Instant::now();
    assert!(executor.execute("SELECT * FROM alimentos").await.is_ok());
    assert!(start.elapsed() >= Duration::from_millis(250));

    let store = Arc::new(FlakyStore::new(2));
    let executor = QueryExecutor::new(store.clone(), policy);
    assert!(executor.execute("SELECT * FROM alimentos").await.is_err());
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_decimals_come_back_as_floats() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("nutria.db");

    let foods = FoodRepository::new(&db);
    foods.init_schema().await.unwrap();
    foods
        .insert(
            &FoodDraft::new("Frijol negro")
                .with_nutrient("protein", 21.6)
                .with_nutrient("iron", 5.02)
                .with_nutrient("energ_kcal", 341.0),
        )
        .await
        .unwrap();

    let executor = QueryExecutor::new(Arc::new(SqliteStore::read_only(&db)), RetryPolicy::default());
    let rows = executor
        .execute("SELECT codigomex2, nombre_del_alimento, protein, iron, energ_kcal, zinc FROM alimentos LIMIT 10")
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];

    // Select-list order is kept
    let keys: Vec<&str> = row.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["codigomex2", "nombre_del_alimento", "protein", "iron", "energ_kcal", "zinc"]
    );

    assert!(row["codigomex2"].is_i64());
    assert_eq!(row["nombre_del_alimento"], "Frijol negro");
    assert!(row["protein"].is_f64());
    assert!((row["protein"].as_f64().unwrap() - 21.6).abs() < 1e-9);
    assert!((row["iron"].as_f64().unwrap() - 5.02).abs() < 1e-9);
    assert!((row["energ_kcal"].as_f64().unwrap() - 341.0).abs() < 1e-9);
    assert!(row["zinc"].is_null());
}

#[tokio::test]
async fn test_missing_database_is_execution_failure() {
    let temp = TempDir::new().unwrap();
    let store = SqliteStore::read_only(temp.path().join("missing.db"));
    let executor = QueryExecutor::new(
        Arc::new(store),
        RetryPolicy {
            max_attempts: 2,
            backoff_base_ms: 1,
        },
    );

    let err = executor.execute("SELECT * FROM alimentos").await.unwrap_err();
    assert!(matches!(err, AskError::Execution { attempts: 2, .. }));
}
