//! Domain types for the nutrition assistant.
//!
//! This module contains the core data structures:
//! - Schema: the food table contract shared by prompt and policy
//! - Question: user questions and generation requests
//! - Food: catalog entries and filters
//! - Recipe: recipes and nutrient aggregation

pub mod food;
pub mod question;
pub mod recipe;
pub mod schema;

// Re-export commonly used types
pub use food::{Bound, Food, FoodDraft, FoodFilter, Nutrients};
pub use question::{clamp_row_cap, GenerationRequest, Question, DEFAULT_ROW_CAP, MAX_ROW_CAP};
pub use recipe::{IngredientRequest, NutritionTotals, Portion, Recipe};
pub use schema::{Schema, FOODS};
