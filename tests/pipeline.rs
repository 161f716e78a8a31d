//! Pipeline Integration Tests
//!
//! Question in, rows out, over a real SQLite catalog with a scripted generator.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nutria::adapters::{GenerationOutput, TextGenerator};
use nutria::core::{Assistant, ErrorKind, RetryPolicy};
use nutria::domain::{FoodDraft, GenerationRequest, Question};
use nutria::store::{FoodRepository, SqliteStore};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// Returns a fixed answer and records the prompts it saw
struct Scripted {
    answer: String,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        _deadline: Duration,
    ) -> anyhow::Result<GenerationOutput> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(GenerationOutput::new(self.answer.clone()))
    }
}

async fn seeded_catalog(temp: &TempDir) -> PathBuf {
    let db = temp.path().join("nutria.db");
    let foods = FoodRepository::new(&db);
    foods.init_schema().await.unwrap();

    let drafts = [
        FoodDraft::new("Haba seca")
            .with_nutrient("protein", 26.12)
            .with_nutrient("lipid_tot", 1.53)
            .with_nutrient("iron", 6.7),
        FoodDraft::new("Pechuga de pollo")
            .with_nutrient("protein", 31.0)
            .with_nutrient("lipid_tot", 3.57)
            .with_nutrient("iron", 1.04),
        FoodDraft::new("Nopal")
            .with_nutrient("protein", 1.32)
            .with_nutrient("lipid_tot", 0.09)
            .with_nutrient("iron", 0.59),
        FoodDraft::new("Chicharrón")
            .with_nutrient("protein", 61.3)
            .with_nutrient("lipid_tot", 31.3)
            .with_nutrient("iron", 0.9),
    ];
    for draft in &drafts {
        foods.insert(draft).await.unwrap();
    }

    db
}

fn assistant(generator: Arc<Scripted>, db: &Path) -> Assistant {
    Assistant::new(
        generator,
        Arc::new(SqliteStore::read_only(db)),
        "gemini-2.5-flash",
        Duration::from_secs(30),
        RetryPolicy {
            max_attempts: 2,
            backoff_base_ms: 1,
        },
    )
}

#[tokio::test]
async fn test_high_protein_low_fat() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new(
        "Claro, aquí está la consulta:\n```sql\nSELECT codigomex2, nombre_del_alimento, protein FROM alimentos WHERE protein >= 10 AND lipid_tot <= 10 ORDER BY protein DESC;\n```",
    );
    let assistant = assistant(generator.clone(), &db);

    let question = Question::new("alimentos altos en proteína y bajos en grasa").with_row_cap(5);
    let translation = assistant.translate(&question).await.unwrap();
    assert_eq!(
        translation.sql,
        "SELECT codigomex2, nombre_del_alimento, protein FROM alimentos WHERE protein >= 10 AND lipid_tot <= 10 ORDER BY protein DESC LIMIT 5"
    );

    let rows = assistant.ask(&question).await.unwrap();
    let names: Vec<&str> = rows
        .iter()
        .map(|r| r["nombre_del_alimento"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Pechuga de pollo", "Haba seca"]);
    assert!((rows[0]["protein"].as_f64().unwrap() - 31.0).abs() < 1e-9);

    // The prompt carried the question and the cap
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("alimentos altos en proteína y bajos en grasa"));
    assert!(prompts[0].contains("max_results: 5"));
}

#[tokio::test]
async fn test_most_iron_keeps_model_limit() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator =
        Scripted::new("SELECT nombre_del_alimento, iron FROM alimentos ORDER BY iron DESC LIMIT 1");

    let rows = assistant(generator, &db)
        .ask(&Question::new("¿Qué alimento tiene más hierro?"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["nombre_del_alimento"], "Haba seca");
}

#[tokio::test]
async fn test_row_cap_bounds_results() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("SELECT * FROM alimentos");

    let rows = assistant(generator, &db)
        .ask(&Question::new("todo").with_row_cap(2))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    // All 30 columns come back for SELECT *
    assert_eq!(rows[0].len(), 30);
}

#[tokio::test]
async fn test_injection_attempt_leaves_table_intact() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("SELECT * FROM alimentos; DROP TABLE alimentos");

    // The extractor cuts at the separator, so what reaches the policy is harmless
    let rows = assert_ok!(assistant(generator, &db).ask(&Question::new("todo")).await);
    assert_eq!(rows.len(), 4);

    let generator = Scripted::new("SELECT * FROM alimentos WHERE 1=1 OR DROP");
    let err = assert_err!(assistant(generator, &db).ask(&Question::new("todo")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let foods = FoodRepository::new(&db);
    assert_eq!(assert_ok!(foods.list(100, 0).await).len(), 4);
}

#[tokio::test]
async fn test_in_table_cannot_read_other_tables() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE secretos (id INTEGER); INSERT INTO secretos VALUES (2);")
            .unwrap();
    }

    let generator = Scripted::new(
        "SELECT nombre_del_alimento FROM alimentos WHERE codigomex2 IN secretos",
    );
    let err = assert_err!(assistant(generator, &db).ask(&Question::new("secretos")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_inline_code_answer() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new(
        "Puedes usar `SELECT nombre_del_alimento FROM alimentos WHERE protein > 30` para eso.",
    );

    let rows = assert_ok!(assistant(generator, &db).ask(&Question::new("proteína")).await);
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_limit_all_is_validation_error() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("SELECT * FROM alimentos LIMIT ALL");

    let err = assert_err!(assistant(generator, &db).ask(&Question::new("todo")).await);
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_foreign_table_is_validation_error() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("SELECT name FROM sqlite_master");

    let err = assistant(generator, &db)
        .ask(&Question::new("tablas"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    // Generic message only
    assert!(!err.to_string().contains("sqlite_master"));
}

#[tokio::test]
async fn test_no_select_is_generation_error() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("Lo siento, no puedo ayudar con eso.");

    let err = assistant(generator, &db)
        .ask(&Question::new("hola"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Generation);
}

#[tokio::test]
async fn test_bad_column_is_execution_error() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    // Passes the policy (protein is known) but SQLite rejects the unknown column
    let generator = Scripted::new("SELECT protein, sugar FROM alimentos");

    let err = assistant(generator, &db)
        .ask(&Question::new("azúcar"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_empty_result() {
    let temp = TempDir::new().unwrap();
    let db = seeded_catalog(&temp).await;
    let generator = Scripted::new("SELECT * FROM alimentos WHERE protein > 1000");

    let rows = assistant(generator, &db)
        .ask(&Question::new("imposible"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}
