//! Food catalog subcommands.
//!
//! Provides commands to:
//! - `list`: Page through the catalog
//! - `show`: Display one food
//! - `search`: Filter by name or nutrient bounds
//! - `add`: Insert a food

use anyhow::{Context, Result};
use clap::Subcommand;

use super::print_json;
use crate::config;
use crate::domain::{FoodDraft, FoodFilter};
use crate::store::foods::{DEFAULT_NAME_PAGE_SIZE, DEFAULT_PAGE_SIZE};
use crate::store::FoodRepository;

/// Catalog-related subcommands
#[derive(Subcommand, Debug)]
pub enum FoodsCommands {
    /// List foods ordered by code
    List {
        /// Maximum number of foods to show
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,

        /// Number of foods to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Show one food by code
    Show {
        /// Food code (codigomex2)
        codigo: i64,
    },

    /// Search by name or nutrient bounds (per 100g)
    Search {
        /// Case-insensitive name substring
        #[arg(short, long)]
        name: Option<String>,

        #[arg(long)]
        min_calorias: Option<f64>,
        #[arg(long)]
        max_calorias: Option<f64>,
        #[arg(long)]
        min_carbohidratos: Option<f64>,
        #[arg(long)]
        max_carbohidratos: Option<f64>,
        #[arg(long)]
        min_proteina: Option<f64>,
        #[arg(long)]
        max_proteina: Option<f64>,
        #[arg(long)]
        min_lipidos: Option<f64>,
        #[arg(long)]
        max_lipidos: Option<f64>,

        /// Maximum number of foods to show
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of foods to skip
        #[arg(short, long, default_value_t = 0)]
        offset: u32,
    },

    /// Add a food to the catalog
    Add {
        /// Food name
        name: String,

        /// Nutrient value per 100g, as column=value (repeatable)
        #[arg(short = 'n', long = "nutrient", value_parser = parse_nutrient)]
        nutrients: Vec<(String, f64)>,
    },
}

/// Parse `column=value`
fn parse_nutrient(s: &str) -> Result<(String, f64), String> {
    let (column, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got '{}'", s))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for '{}': {}", column.trim(), e))?;
    Ok((column.trim().to_string(), value))
}

fn repository() -> Result<FoodRepository> {
    let cfg = config::config()?;
    Ok(FoodRepository::new(&cfg.database))
}

/// Execute catalog subcommands
pub async fn execute(command: FoodsCommands) -> Result<()> {
    let foods = repository()?;

    match command {
        FoodsCommands::List { limit, offset } => {
            print_json(&foods.list(limit, offset).await?)
        }
        FoodsCommands::Show { codigo } => {
            let food = foods
                .get(codigo)
                .await?
                .with_context(|| format!("Food {} not found", codigo))?;
            print_json(&food)
        }
        FoodsCommands::Search {
            name,
            min_calorias,
            max_calorias,
            min_carbohidratos,
            max_carbohidratos,
            min_proteina,
            max_proteina,
            min_lipidos,
            max_lipidos,
            limit,
            offset,
        } => {
            let filter = FoodFilter {
                max_calorias,
                min_calorias,
                max_carbohidratos,
                min_carbohidratos,
                max_proteina,
                min_proteina,
                max_lipidos,
                min_lipidos,
            };

            let results = match name {
                Some(name) => {
                    if !filter.is_empty() {
                        anyhow::bail!("--name cannot be combined with nutrient bounds");
                    }
                    let limit = limit.unwrap_or(DEFAULT_NAME_PAGE_SIZE);
                    foods.search_by_name(&name, limit, offset).await?
                }
                None => {
                    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
                    foods.search(&filter, limit, offset).await?
                }
            };
            print_json(&results)
        }
        FoodsCommands::Add { name, nutrients } => {
            let draft = nutrients
                .into_iter()
                .fold(FoodDraft::new(name), |draft, (column, value)| {
                    draft.with_nutrient(column, value)
                });
            let food = foods.insert(&draft).await?;
            eprintln!("Created food {}", food.codigomex2);
            print_json(&food)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nutrient() {
        assert_eq!(
            parse_nutrient("protein = 12.5").unwrap(),
            ("protein".to_string(), 12.5)
        );
        assert!(parse_nutrient("protein").is_err());
        assert!(parse_nutrient("protein=lots").is_err());
    }
}
