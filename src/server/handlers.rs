//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::error::ApiError;
use super::AppState;
use crate::core::{AskError, Row};
use crate::domain::{Food, FoodDraft, FoodFilter, IngredientRequest, Question, Recipe, MAX_ROW_CAP};
use crate::store::foods::DEFAULT_PAGE_SIZE;

/// Pagination query string
#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default = "default_page_size")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    pub ingredientes: Vec<IngredientRequest>,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "nutria API - OK".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Probe the catalog with a one-row listing
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    match state.foods.list(1, 0).await {
        Ok(rows) => Json(serde_json::json!({
            "status": "ok",
            "db_rows_returned": rows.len(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "error",
                    "detail": "database unreachable",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn list_foods(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<Food>>, ApiError> {
    Ok(Json(state.foods.list(page.limit, page.offset).await?))
}

pub async fn get_food(
    State(state): State<Arc<AppState>>,
    Path(codigo): Path<i64>,
) -> Result<Json<Food>, ApiError> {
    state
        .foods
        .get(codigo)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Food {}", codigo)))
}

pub async fn search_foods(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Page>,
    Json(filter): Json<FoodFilter>,
) -> Result<Json<Vec<Food>>, ApiError> {
    Ok(Json(state.foods.search(&filter, page.limit, page.offset).await?))
}

pub async fn create_food(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<FoodDraft>,
) -> Result<(StatusCode, Json<Food>), ApiError> {
    if draft.nombre_del_alimento.trim().is_empty() {
        return Err(ApiError::invalid_input("nombre_del_alimento must not be empty"));
    }

    let food = state.foods.insert(&draft).await?;
    info!(codigomex2 = food.codigomex2, "Food created");
    Ok((StatusCode::CREATED, Json(food)))
}

/// Answer a question; each ask runs on its own task
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<Vec<Row>>, ApiError> {
    let text = payload.question.trim();
    if text.is_empty() {
        return Err(ApiError::invalid_input("question must not be empty"));
    }
    if let Some(max) = payload.max_results {
        if !(1..=MAX_ROW_CAP as i64).contains(&max) {
            return Err(ApiError::invalid_input(format!(
                "max_results must be between 1 and {}",
                MAX_ROW_CAP
            )));
        }
    }

    let question = Question {
        text: text.to_string(),
        requested_row_cap: payload.max_results,
    };

    let assistant = state.assistant.clone();
    let rows = tokio::spawn(async move { assistant.ask(&question).await })
        .await
        .map_err(|e| {
            error!(error = %e, "Ask task failed");
            AskError::Unexpected(e.to_string())
        })??;

    if rows.is_empty() {
        return Err(ApiError::not_found("Results for the generated query"));
    }

    Ok(Json(rows))
}

pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecipeRequest>,
) -> Result<Json<Recipe>, ApiError> {
    if payload.ingredientes.is_empty() {
        return Err(ApiError::invalid_input("ingredientes must not be empty"));
    }

    Ok(Json(state.recipes.create(&payload.ingredientes).await?))
}
