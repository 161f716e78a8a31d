//! nutria - Natural-language questions over a nutrition database
//!
//! A question is translated into SQL by an external text generator, the
//! statement is checked against a strict read-only policy, and the rows
//! are returned.
//!
//! # Architecture
//!
//! The ask path is a linear pipeline that stops at the first failure:
//! - Prompt: render the question and the table contract
//! - Generation: call the generator under a hard deadline
//! - Extract: pull the first SELECT out of free-form text
//! - Safety: single statement, SELECT-only, one table, known columns
//! - Limit: make sure a row cap is present
//! - Executor: run on a fresh connection with bounded retries
//!
//! # Modules
//!
//! - `adapters`: External text generators (Gemini)
//! - `core`: The pipeline, the SQL policy, recipes
//! - `domain`: Data structures (Schema, Question, Food, Recipe)
//! - `store`: SQLite access and the food catalog
//! - `server`: HTTP API
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Create the database
//! nutria init --from-json foods.json
//!
//! # Ask a question
//! nutria ask "¿Qué alimento tiene más hierro?"
//!
//! # Serve the HTTP API
//! nutria serve --bind 0.0.0.0:8000
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod store;

// Re-export main types at crate root for convenience
pub use crate::core::{AskError, Assistant, ErrorKind, SqlPolicy};
pub use crate::domain::{Food, Question, Schema, FOODS};
pub use crate::store::{FoodRepository, RelationalStore, SqliteStore};
