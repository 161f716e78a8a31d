//! Food catalog entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::{Schema, FOODS};

/// Nutrient values keyed by column name (None = unknown)
pub type Nutrients = BTreeMap<String, Option<f64>>;

/// A stored food with its nutrient profile (values per 100g)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    /// Primary key
    pub codigomex2: i64,

    /// Display name
    pub nombre_del_alimento: String,

    /// Nutrient columns
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

impl Food {
    /// Value of a nutrient column, if known
    pub fn nutrient(&self, column: &str) -> Option<f64> {
        self.nutrients.get(column).copied().flatten()
    }

    /// Amount of a nutrient in `grams` of this food (unknown counts as zero)
    pub fn amount_in(&self, column: &str, grams: f64) -> f64 {
        self.nutrient(column).unwrap_or(0.0) * grams / 100.0
    }
}

/// A food to be inserted into the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodDraft {
    /// Display name
    pub nombre_del_alimento: String,

    /// Nutrient columns (must be known to the schema)
    #[serde(flatten)]
    pub nutrients: Nutrients,
}

impl FoodDraft {
    /// Create a draft with no nutrient data
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            nombre_del_alimento: name.into(),
            nutrients: Nutrients::new(),
        }
    }

    /// Set a nutrient value
    pub fn with_nutrient(mut self, column: impl Into<String>, value: f64) -> Self {
        self.nutrients.insert(column.into(), Some(value));
        self
    }

    /// Nutrient names that the schema does not know about
    pub fn unknown_nutrients(&self, schema: &Schema) -> Vec<String> {
        self.nutrients
            .keys()
            .filter(|k| !schema.is_nutrient(k))
            .cloned()
            .collect()
    }
}

/// Range filter over the four headline nutrients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodFilter {
    pub max_calorias: Option<f64>,
    pub min_calorias: Option<f64>,
    pub max_carbohidratos: Option<f64>,
    pub min_carbohidratos: Option<f64>,
    pub max_proteina: Option<f64>,
    pub min_proteina: Option<f64>,
    pub max_lipidos: Option<f64>,
    pub min_lipidos: Option<f64>,
}

/// Direction of a filter bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// column >= value
    Min,
    /// column <= value
    Max,
}

impl Bound {
    /// SQL comparison operator
    pub fn operator(&self) -> &'static str {
        match self {
            Bound::Min => ">=",
            Bound::Max => "<=",
        }
    }
}

impl FoodFilter {
    /// Set bounds as (column, bound, value), in a stable order
    pub fn bounds(&self) -> Vec<(&'static str, Bound, f64)> {
        let candidates = [
            ("energ_kcal", Bound::Min, self.min_calorias),
            ("energ_kcal", Bound::Max, self.max_calorias),
            ("carbohydrt", Bound::Min, self.min_carbohidratos),
            ("carbohydrt", Bound::Max, self.max_carbohidratos),
            ("protein", Bound::Min, self.min_proteina),
            ("protein", Bound::Max, self.max_proteina),
            ("lipid_tot", Bound::Min, self.min_lipidos),
            ("lipid_tot", Bound::Max, self.max_lipidos),
        ];

        candidates
            .into_iter()
            .filter_map(|(column, bound, value)| value.map(|v| (column, bound, v)))
            .filter(|(column, _, _)| FOODS.is_nutrient(column))
            .collect()
    }

    /// Whether no bound is set
    pub fn is_empty(&self) -> bool {
        self.bounds().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_food_json_is_flat() {
        let json = r#"{"codigomex2": 7, "nombre_del_alimento": "Haba", "protein": 26.1, "iron": null}"#;
        let food: Food = serde_json::from_str(json).unwrap();

        assert_eq!(food.codigomex2, 7);
        assert_eq!(food.nutrient("protein"), Some(26.1));
        assert_eq!(food.nutrient("iron"), None);
        assert_eq!(food.nutrient("zinc"), None);

        let back = serde_json::to_value(&food).unwrap();
        assert_eq!(back["protein"], serde_json::json!(26.1));
    }

    #[test]
    fn test_amount_in_is_proportional() {
        let food = Food {
            codigomex2: 1,
            nombre_del_alimento: "Avena".to_string(),
            nutrients: [("energ_kcal".to_string(), Some(380.0))].into_iter().collect(),
        };

        assert_eq!(food.amount_in("energ_kcal", 50.0), 190.0);
        assert_eq!(food.amount_in("protein", 50.0), 0.0);
    }

    #[test]
    fn test_draft_unknown_nutrients() {
        let draft = FoodDraft::new("Nopal")
            .with_nutrient("fiber_td", 2.2)
            .with_nutrient("password", 1.0);

        assert_eq!(draft.unknown_nutrients(&FOODS), vec!["password".to_string()]);
    }

    #[test]
    fn test_filter_bounds() {
        let filter = FoodFilter {
            min_proteina: Some(10.0),
            max_calorias: Some(300.0),
            ..Default::default()
        };

        let bounds = filter.bounds();
        assert_eq!(
            bounds,
            vec![
                ("energ_kcal", Bound::Max, 300.0),
                ("protein", Bound::Min, 10.0),
            ]
        );
        assert!(FoodFilter::default().is_empty());
    }
}
