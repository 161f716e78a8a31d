//! Command-line interface for nutria.
//!
//! Provides commands for asking questions, browsing the food catalog,
//! generating recipes, serving the HTTP API, and bootstrapping a database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::adapters::GeminiClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{Assistant, GenerationClient, RecipeService};
use crate::domain::{FoodDraft, IngredientRequest, Question};
use crate::store::{FoodRepository, SqliteStore};

pub mod foods;

/// nutria - Natural-language questions over a nutrition database
#[derive(Parser, Debug)]
#[command(name = "nutria")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about the food catalog
    Ask {
        /// The question, in natural language
        question: String,

        /// Maximum number of rows (1-500)
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..=500))]
        max_results: Option<i64>,

        /// Print the validated SQL instead of running it
        #[arg(long)]
        sql_only: bool,
    },

    /// Browse and edit the food catalog
    Foods {
        #[command(subcommand)]
        command: foods::FoodsCommands,
    },

    /// Generate a recipe from food codes
    Recipe {
        /// Ingredients as code or code:grams (default 100g)
        #[arg(required = true, value_parser = parse_ingredient)]
        ingredients: Vec<IngredientRequest>,
    },

    /// Start the HTTP API
    Serve {
        /// Address to bind to (overrides configuration)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Create the food table, optionally importing foods from a JSON array
    Init {
        /// JSON file with an array of foods (name plus nutrient columns)
        #[arg(long)]
        from_json: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

fn parse_ingredient(s: &str) -> Result<IngredientRequest, String> {
    IngredientRequest::parse(s).ok_or_else(|| format!("expected code or code:grams, got '{}'", s))
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Ask {
                question,
                max_results,
                sql_only,
            } => ask(&question, max_results, sql_only).await,
            Commands::Foods { command } => foods::execute(command).await,
            Commands::Recipe { ingredients } => recipe(&ingredients).await,
            Commands::Serve { bind } => serve(bind).await,
            Commands::Init { from_json } => init(from_json).await,
            Commands::Config => show_config(),
        }
    }
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn assistant(cfg: &ResolvedConfig) -> Result<Assistant> {
    let generator = Arc::new(GeminiClient::from_settings(&cfg.generation)?);
    Ok(Assistant::new(
        generator,
        Arc::new(SqliteStore::read_only(&cfg.database)),
        cfg.generation.model.clone(),
        cfg.generation.timeout(),
        cfg.retry.clone(),
    ))
}

/// Answer a question, or show the SQL it translates to
async fn ask(text: &str, max_results: Option<i64>, sql_only: bool) -> Result<()> {
    let cfg = config::config()?;
    let assistant = assistant(cfg)?;

    let question = Question {
        text: text.trim().to_string(),
        requested_row_cap: max_results,
    };
    if question.text.is_empty() {
        anyhow::bail!("Question is empty");
    }

    if sql_only {
        let translation = assistant
            .translate(&question)
            .await
            .map_err(|e| anyhow::anyhow!("{} ({:?})", e, e.kind()))?;
        println!("{}", translation.sql);
        return Ok(());
    }

    let rows = assistant
        .ask(&question)
        .await
        .map_err(|e| anyhow::anyhow!("{} ({:?})", e, e.kind()))?;

    if rows.is_empty() {
        eprintln!("No results for the generated query.");
        return Ok(());
    }

    print_json(&rows)
}

/// Generate a recipe and print it
async fn recipe(ingredients: &[IngredientRequest]) -> Result<()> {
    let cfg = config::config()?;
    let generator = Arc::new(GeminiClient::from_settings(&cfg.generation)?);

    let service = RecipeService::new(
        FoodRepository::new(&cfg.database),
        GenerationClient::new(generator, cfg.generation.timeout()),
        cfg.generation.model.clone(),
    );

    let recipe = service.create(ingredients).await?;
    print_json(&recipe)
}

/// Serve the HTTP API
async fn serve(bind: Option<String>) -> Result<()> {
    let mut cfg = config::config()?.clone();
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }

    crate::server::serve(&cfg).await
}

/// Create the schema and optionally import foods
async fn init(from_json: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;

    if let Some(parent) = cfg.database.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let foods = FoodRepository::new(&cfg.database);
    foods.init_schema().await?;
    println!("Initialized {}", cfg.database.display());

    if let Some(path) = from_json {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let drafts: Vec<FoodDraft> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        for draft in &drafts {
            foods
                .insert(draft)
                .await
                .with_context(|| format!("Failed to import '{}'", draft.nombre_del_alimento))?;
        }
        println!("Imported {} foods from {}", drafts.len(), path.display());
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("nutria configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:     {}", cfg.home.display());
    println!("  Database: {}", cfg.database.display());
    println!();
    println!("Generation:");
    println!("  Model:    {}", cfg.generation.model);
    println!("  Endpoint: {}", cfg.generation.endpoint);
    println!("  Timeout:  {}s", cfg.generation.timeout_seconds);
    println!(
        "  API key:  {}",
        if cfg.generation.api_key.is_some() { "set" } else { "(not set)" }
    );
    println!();
    println!("Executor:");
    println!("  Max attempts: {}", cfg.retry.max_attempts);
    println!("  Backoff base: {}ms", cfg.retry.backoff_base_ms);
    println!();
    println!("Server:");
    println!("  Bind:         {}", cfg.server.bind);
    println!("  CORS origins: {}", cfg.server.cors_origins.join(", "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["nutria", "ask", "más hierro", "-m", "5"]).unwrap();
        match cli.command {
            Commands::Ask {
                question,
                max_results,
                sql_only,
            } => {
                assert_eq!(question, "más hierro");
                assert_eq!(max_results, Some(5));
                assert!(!sql_only);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_max_results_is_range_checked() {
        assert!(Cli::try_parse_from(["nutria", "ask", "q", "-m", "0"]).is_err());
        assert!(Cli::try_parse_from(["nutria", "ask", "q", "-m", "501"]).is_err());
    }

    #[test]
    fn test_parse_recipe_ingredients() {
        let cli = Cli::try_parse_from(["nutria", "recipe", "12", "34:250"]).unwrap();
        match cli.command {
            Commands::Recipe { ingredients } => {
                assert_eq!(ingredients.len(), 2);
                assert_eq!(ingredients[0].cantidad_g, 100.0);
                assert_eq!(ingredients[1].codigomex2, 34);
                assert_eq!(ingredients[1].cantidad_g, 250.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["nutria", "recipe", "abc"]).is_err());
    }
}
