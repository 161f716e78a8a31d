//! Question answering over the food catalog.
//!
//! Runs the stages strictly in order and stops at the first failure:
//! prompt -> generate -> extract -> validate -> limit -> execute.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::AskError;
use super::executor::{QueryExecutor, RetryPolicy, Row};
use super::extract::extract_statement;
use super::generation::GenerationClient;
use super::limit::enforce_limit;
use super::prompt::build_request;
use super::safety::SqlPolicy;
use crate::adapters::TextGenerator;
use crate::domain::{Question, Schema, FOODS};
use crate::store::RelationalStore;

/// Longest SQL prefix written at info level
const MAX_LOGGED_SQL: usize = 200;

/// The natural-language query pipeline
#[derive(Clone)]
pub struct Assistant {
    schema: Schema,
    model: String,
    policy: Arc<SqlPolicy>,
    generation: GenerationClient,
    executor: QueryExecutor,
}

/// A translated and validated question, ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Statement that will be executed (row cap included)
    pub sql: String,

    /// Effective row cap
    pub row_cap: u32,
}

impl Assistant {
    /// Create an assistant over the food catalog
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RelationalStore>,
        model: impl Into<String>,
        deadline: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self::for_schema(FOODS, generator, store, model, deadline, retry)
    }

    /// Create an assistant over any single-table schema
    pub fn for_schema(
        schema: Schema,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RelationalStore>,
        model: impl Into<String>,
        deadline: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            schema,
            model: model.into(),
            policy: Arc::new(SqlPolicy::for_schema(&schema)),
            generation: GenerationClient::new(generator, deadline),
            executor: QueryExecutor::new(store, retry),
        }
    }

    /// Model identifier sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generation deadline
    pub fn deadline(&self) -> Duration {
        self.generation.deadline()
    }

    /// Turn a question into a validated, capped statement without running it
    pub async fn translate(&self, question: &Question) -> Result<Translation, AskError> {
        let row_cap = question.row_cap();
        let request = build_request(question, &self.schema, &self.model);

        let raw = self.generation.generate(&request).await?;
        let candidate = extract_statement(&raw)?;

        let validated = self.policy.validate(&candidate).map_err(|violation| {
            debug!(%violation, candidate = %candidate, "Generated SQL rejected");
            AskError::Validation
        })?;

        let sql = enforce_limit(&validated, row_cap);
        info!(sql = %truncate(&sql, MAX_LOGGED_SQL), row_cap, "Generated SQL accepted");

        Ok(Translation { sql, row_cap })
    }

    /// Answer a question with rows from the store
    #[instrument(
        name = "ask",
        skip_all,
        fields(request_id = %Uuid::new_v4(), row_cap = question.row_cap())
    )]
    pub async fn ask(&self, question: &Question) -> Result<Vec<Row>, AskError> {
        let result = async {
            let translation = self.translate(question).await?;
            self.executor.execute(&translation.sql).await
        }
        .await;

        match &result {
            Ok(rows) => info!(rows = rows.len(), "Question answered"),
            Err(e) => warn!(kind = ?e.kind(), error = %e, "Question failed"),
        }

        result
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::GenerationOutput;
    use crate::core::error::ErrorKind;
    use crate::domain::GenerationRequest;
    use crate::store::{QueryParams, StoreError, StoreRow, StoreValue};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted(String);

    #[async_trait]
    impl TextGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
            _deadline: Duration,
        ) -> anyhow::Result<GenerationOutput> {
            Ok(GenerationOutput::new(self.0.clone()))
        }
    }

    /// Records statements and returns one row
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RelationalStore for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn execute(
            &self,
            statement: &str,
            _params: Option<&QueryParams>,
        ) -> Result<Vec<StoreRow>, StoreError> {
            self.seen.lock().unwrap().push(statement.to_string());
            Ok(vec![vec![("codigomex2".to_string(), StoreValue::Integer(1))]])
        }
    }

    fn assistant(output: &str, store: Arc<Recording>) -> Assistant {
        Assistant::new(
            Arc::new(Scripted(output.to_string())),
            store,
            "test-model",
            Duration::from_secs(30),
            RetryPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_translate_appends_row_cap() {
        let store = Arc::new(Recording::default());
        let assistant = assistant("SELECT protein FROM alimentos WHERE protein > 10;", store);

        let translation = assistant
            .translate(&Question::new("mucha proteína").with_row_cap(3))
            .await
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT protein FROM alimentos WHERE protein > 10 LIMIT 3"
        );
        assert_eq!(translation.row_cap, 3);
    }

    #[tokio::test]
    async fn test_ask_runs_capped_statement() {
        let store = Arc::new(Recording::default());
        let assistant = assistant("Here you go: SELECT * FROM alimentos", store.clone());

        let rows = assistant.ask(&Question::new("todo")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            store.seen.lock().unwrap().as_slice(),
            ["SELECT * FROM alimentos LIMIT 10"]
        );
    }

    #[tokio::test]
    async fn test_rejected_sql_never_reaches_store() {
        let store = Arc::new(Recording::default());
        let assistant = assistant("SELECT * FROM usuarios", store.clone());

        let err = assistant.ask(&Question::new("usuarios")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
