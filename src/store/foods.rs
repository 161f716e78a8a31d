//! Food catalog repository.
//!
//! Plain CRUD over the `alimentos` table. Column names always come from the
//! schema; user-supplied values are bound as parameters.

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use tracing::{debug, info};

use crate::domain::{Food, FoodDraft, FoodFilter, Nutrients, Schema, FOODS};

use super::sqlite::open_connection;
use super::StoreError;

/// Default page size for listings and filtered searches
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default page size for name searches
pub const DEFAULT_NAME_PAGE_SIZE: u32 = 50;

/// Repository over the food table
#[derive(Debug, Clone)]
pub struct FoodRepository {
    path: PathBuf,
    schema: Schema,
}

impl FoodRepository {
    /// Create a repository for the database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            schema: FOODS,
        }
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table if it does not exist
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let ddl = self.schema.create_table_sql();
        self.with_connection(false, move |conn| {
            conn.execute_batch(&ddl)?;
            Ok(())
        })
        .await?;
        info!(path = %self.path.display(), "Food table ready");
        Ok(())
    }

    /// List foods ordered by code
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Food>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} LIMIT ?1 OFFSET ?2",
            self.schema.select_list(),
            self.schema.table,
            self.schema.key_column
        );
        let params = vec![Value::Integer(limit as i64), Value::Integer(offset as i64)];
        self.query_foods(sql, params).await
    }

    /// Get a single food by code
    pub async fn get(&self, codigo: i64) -> Result<Option<Food>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.schema.select_list(),
            self.schema.table,
            self.schema.key_column
        );
        let mut foods = self.query_foods(sql, vec![Value::Integer(codigo)]).await?;
        Ok(foods.pop())
    }

    /// Get all foods whose code is in `codes` (missing codes are skipped)
    pub async fn get_many(&self, codes: &[i64]) -> Result<Vec<Food>, StoreError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=codes.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
            self.schema.select_list(),
            self.schema.table,
            self.schema.key_column,
            placeholders,
            self.schema.key_column
        );
        let params = codes.iter().map(|c| Value::Integer(*c)).collect();
        self.query_foods(sql, params).await
    }

    /// Search foods by nutrient ranges
    pub async fn search(
        &self,
        filter: &FoodFilter,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Food>, StoreError> {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        for (column, bound, value) in filter.bounds() {
            params.push(Value::Real(value));
            clauses.push(format!("{} {} ?{}", column, bound.operator(), params.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));
        let sql = format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            self.schema.select_list(),
            self.schema.table,
            where_clause,
            self.schema.key_column,
            params.len() - 1,
            params.len()
        );

        debug!(%sql, "Filtered food search");
        self.query_foods(sql, params).await
    }

    /// Case-insensitive substring search on the food name
    pub async fn search_by_name(
        &self,
        name: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Food>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE instr(lower({}), lower(?1)) > 0 ORDER BY {} LIMIT ?2 OFFSET ?3",
            self.schema.select_list(),
            self.schema.table,
            self.schema.name_column,
            self.schema.key_column
        );
        let params = vec![
            Value::Text(name.to_string()),
            Value::Integer(limit as i64),
            Value::Integer(offset as i64),
        ];
        self.query_foods(sql, params).await
    }

    /// Insert a food and return the stored row
    pub async fn insert(&self, draft: &FoodDraft) -> Result<Food, StoreError> {
        let unknown = draft.unknown_nutrients(&self.schema);
        if !unknown.is_empty() {
            return Err(StoreError::UnknownColumns(unknown));
        }

        let mut columns = vec![self.schema.name_column.to_string()];
        let mut params = vec![Value::Text(draft.nombre_del_alimento.clone())];
        for (column, value) in &draft.nutrients {
            columns.push(column.clone());
            params.push(value.map(Value::Real).unwrap_or(Value::Null));
        }

        let placeholders = (1..=params.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table,
            columns.join(", "),
            placeholders
        );
        let select = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.schema.select_list(),
            self.schema.table,
            self.schema.key_column
        );
        let schema = self.schema;

        let food = self
            .with_connection(false, move |conn| {
                conn.execute(&sql, params_from_iter(params.iter()))?;
                let id = conn.last_insert_rowid();
                let food = conn.query_row(&select, [id], |row| food_from_row(&schema, row))?;
                Ok(food)
            })
            .await?;

        info!(codigo = food.codigomex2, name = %food.nombre_del_alimento, "Food inserted");
        Ok(food)
    }

    async fn query_foods(&self, sql: String, params: Vec<Value>) -> Result<Vec<Food>, StoreError> {
        let schema = self.schema;
        self.with_connection(true, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let foods = stmt
                .query_map(params_from_iter(params.iter()), |row| food_from_row(&schema, row))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(foods)
        })
        .await
    }

    async fn with_connection<T, F>(&self, read_only: bool, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&path, read_only)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Map a row selected with `Schema::select_list` to a Food
fn food_from_row(schema: &Schema, row: &Row<'_>) -> rusqlite::Result<Food> {
    let mut nutrients = Nutrients::new();
    for (offset, column) in schema.nutrient_columns.iter().enumerate() {
        nutrients.insert(column.to_string(), row.get::<_, Option<f64>>(offset + 2)?);
    }

    Ok(Food {
        codigomex2: row.get(0)?,
        nombre_del_alimento: row.get(1)?,
        nutrients,
    })
}
