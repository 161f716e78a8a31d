//! Recipes and proportional nutrient aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::food::Food;

fn default_grams() -> f64 {
    100.0
}

/// An ingredient requested by code and quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRequest {
    /// Food code
    pub codigomex2: i64,

    /// Quantity in grams (default: 100)
    #[serde(default = "default_grams")]
    pub cantidad_g: f64,
}

impl IngredientRequest {
    /// Parse `code` or `code:grams`
    pub fn parse(input: &str) -> Option<Self> {
        let (code, grams) = match input.split_once(':') {
            Some((code, grams)) => (code, grams.trim().parse().ok()?),
            None => (input, default_grams()),
        };

        Some(Self {
            codigomex2: code.trim().parse().ok()?,
            cantidad_g: grams,
        })
    }
}

/// A resolved ingredient: a stored food and its quantity
#[derive(Debug, Clone)]
pub struct Portion {
    pub food: Food,
    pub grams: f64,
}

/// Aggregated nutrition for a whole recipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub energ_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl NutritionTotals {
    /// Sum nutrients proportionally to each portion's weight, rounded to 2 decimals
    pub fn aggregate(portions: &[Portion]) -> Self {
        let mut totals = Self::default();

        for portion in portions {
            totals.energ_kcal += portion.food.amount_in("energ_kcal", portion.grams);
            totals.protein += portion.food.amount_in("protein", portion.grams);
            totals.fat += portion.food.amount_in("lipid_tot", portion.grams);
            totals.carbs += portion.food.amount_in("carbohydrt", portion.grams);
        }

        Self {
            energ_kcal: round2(totals.energ_kcal),
            protein: round2(totals.protein),
            fat: round2(totals.fat),
            carbs: round2(totals.carbs),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Title
    pub titulo: String,

    /// Ingredient lines, as written by the generator
    #[serde(default)]
    pub ingredientes: Vec<String>,

    /// Preparation steps
    #[serde(default)]
    pub instrucciones: String,

    /// Nutrition totals (always recomputed from the catalog)
    #[serde(default)]
    pub nutricion_total: NutritionTotals,

    /// When the recipe was generated
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}
