//! Recipe generation from catalog foods.
//!
//! The generator writes the title, ingredient lines and steps; nutrition
//! totals are always recomputed from the catalog.

use tracing::{debug, info};

use super::error::AskError;
use super::generation::GenerationClient;
use crate::domain::{GenerationRequest, IngredientRequest, NutritionTotals, Portion, Recipe};
use crate::store::{FoodRepository, StoreError};

/// Longest generator output kept in an error message
const MAX_ERROR_OUTPUT: usize = 200;

/// Recipe failures
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("No foods found for the given codes")]
    NoFoods,

    #[error("Recipe generation failed: {0}")]
    Generation(String),

    #[error("Recipe generation timed out")]
    Timeout,

    #[error("Generator did not return valid recipe JSON: {0}")]
    InvalidJson(String),

    #[error("Catalog error: {0}")]
    Store(#[from] StoreError),
}

/// Builds recipes from catalog foods
#[derive(Clone)]
pub struct RecipeService {
    foods: FoodRepository,
    generation: GenerationClient,
    model: String,
}

impl RecipeService {
    pub fn new(foods: FoodRepository, generation: GenerationClient, model: impl Into<String>) -> Self {
        Self {
            foods,
            generation,
            model: model.into(),
        }
    }

    /// Create a recipe from ingredient codes and quantities.
    ///
    /// Codes missing from the catalog are skipped; if none are found the
    /// call fails before the generator is contacted.
    pub async fn create(&self, ingredients: &[IngredientRequest]) -> Result<Recipe, RecipeError> {
        let codes: Vec<i64> = ingredients.iter().map(|i| i.codigomex2).collect();
        let foods = self.foods.get_many(&codes).await?;
        if foods.is_empty() {
            return Err(RecipeError::NoFoods);
        }

        let portions: Vec<Portion> = ingredients
            .iter()
            .filter_map(|i| {
                foods
                    .iter()
                    .find(|f| f.codigomex2 == i.codigomex2)
                    .map(|food| Portion {
                        food: food.clone(),
                        grams: i.cantidad_g,
                    })
            })
            .collect();

        let request = GenerationRequest {
            prompt: recipe_prompt(&portions),
            model: self.model.clone(),
            row_cap_hint: None,
        };

        let raw = self.generation.generate(&request).await.map_err(|e| match e {
            AskError::Timeout(_) => RecipeError::Timeout,
            other => RecipeError::Generation(other.to_string()),
        })?;

        let mut recipe = parse_recipe(&raw)?;
        recipe.nutricion_total = NutritionTotals::aggregate(&portions);

        info!(
            titulo = %recipe.titulo,
            ingredients = portions.len(),
            energ_kcal = recipe.nutricion_total.energ_kcal,
            "Recipe created"
        );
        Ok(recipe)
    }
}

fn recipe_prompt(portions: &[Portion]) -> String {
    let lines = portions
        .iter()
        .map(|p| format!("{}g de {}", p.grams, p.food.nombre_del_alimento))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a chef who invents recipes that are creative but consistent.
You receive the following ingredients with quantities:
{lines}

Return EXACTLY one JSON object with this format and nothing else:
{{
  "titulo": "Recipe name",
  "ingredientes": ["100g harina de haba", "50g queso cheddar"],
  "instrucciones": "Step by step preparation"
}}
"#
    )
}

/// Parse generator output as a recipe, tolerating a markdown code fence
pub fn parse_recipe(raw: &str) -> Result<Recipe, RecipeError> {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json").or_else(|| text.strip_prefix("```")) {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    serde_json::from_str(text).map_err(|e| {
        debug!(error = %e, raw = %raw, "Recipe output is not valid JSON");
        let excerpt: String = text.chars().take(MAX_ERROR_OUTPUT).collect();
        RecipeError::InvalidJson(excerpt)
    })
}
