//! Schema contract for the food table.
//!
//! The prompt builder renders this schema for the generator and the SQL
//! policy enforces it. Both read the same value, so a column added here is
//! advertised and allowed at the same time.

/// Name of the only table the assistant may query
pub const FOODS_TABLE: &str = "alimentos";

/// Primary key column
pub const KEY_COLUMN: &str = "codigomex2";

/// Display name column
pub const NAME_COLUMN: &str = "nombre_del_alimento";

/// Nutrient columns, all stored as NUMERIC(12,4) per 100g of food
pub const NUTRIENT_COLUMNS: &[&str] = &[
    "energ_kcal",
    "carbohydrt",
    "lipid_tot",
    "protein",
    "fiber_td",
    "calcium",
    "iron",
    "ironhem",
    "ironnohem",
    "zinc",
    "vit_c",
    "thiamin",
    "riboflavin",
    "niacin",
    "panto_acid",
    "vit_b6",
    "folic_acid",
    "food_folate",
    "folate_dfe",
    "vit_b12",
    "vit_a_rae",
    "vit_e",
    "vit_d_iu",
    "vit_k",
    "fa_sat",
    "fa_mono",
    "fa_poly",
    "chole",
];

/// Table name plus the queryable attribute names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Table name
    pub table: &'static str,

    /// Primary key column
    pub key_column: &'static str,

    /// Name column
    pub name_column: &'static str,

    /// Numeric nutrient columns
    pub nutrient_columns: &'static [&'static str],
}

/// The food catalog schema
pub static FOODS: Schema = Schema::foods();

impl Default for Schema {
    fn default() -> Self {
        Self::foods()
    }
}

impl Schema {
    /// The `alimentos` schema
    pub const fn foods() -> Self {
        Self {
            table: FOODS_TABLE,
            key_column: KEY_COLUMN,
            name_column: NAME_COLUMN,
            nutrient_columns: NUTRIENT_COLUMNS,
        }
    }

    /// All queryable columns in table order (key, name, nutrients)
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        [self.key_column, self.name_column]
            .into_iter()
            .chain(self.nutrient_columns.iter().copied())
    }

    /// Whether `name` is one of the nutrient columns
    pub fn is_nutrient(&self, name: &str) -> bool {
        self.nutrient_columns.contains(&name)
    }

    /// Comma-separated column list for SELECT statements
    pub fn select_list(&self) -> String {
        self.columns().collect::<Vec<_>>().join(", ")
    }

    /// DDL for the table (idempotent)
    pub fn create_table_sql(&self) -> String {
        let nutrients = self
            .nutrient_columns
            .iter()
            .map(|c| format!("    {} NUMERIC(12,4)", c))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {} INTEGER PRIMARY KEY,\n    {} TEXT NOT NULL,\n{}\n)",
            self.table, self.key_column, self.name_column, nutrients
        )
    }
}
