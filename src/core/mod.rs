//! Core question-answering logic.
//!
//! This module contains:
//! - Prompt: question rendering for the generator
//! - Generation: deadline-bounded generator calls
//! - Extract: candidate statement extraction
//! - Safety: the SQL policy
//! - Limit: row cap enforcement
//! - Executor: retried execution and row normalization
//! - Assistant: the end-to-end pipeline
//! - Recipe: recipe generation with computed nutrition

pub mod assistant;
pub mod error;
pub mod executor;
pub mod extract;
pub mod generation;
pub mod limit;
pub mod prompt;
pub mod recipe;
pub mod safety;

// Re-export commonly used types
pub use assistant::{Assistant, Translation};
pub use error::{AskError, ErrorKind};
pub use executor::{normalize_row, QueryExecutor, RetryPolicy, Row};
pub use extract::extract_statement;
pub use generation::{GenerationClient, DEFAULT_DEADLINE};
pub use limit::enforce_limit;
pub use prompt::build_request;
pub use recipe::{RecipeError, RecipeService};
pub use safety::{PolicyViolation, SqlPolicy, ValidatedQuery, FORBIDDEN_KEYWORDS};
