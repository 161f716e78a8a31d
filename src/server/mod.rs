//! HTTP API for the food catalog and the assistant.
//!
//! Routes:
//! - `GET  /`                  service banner
//! - `GET  /health`            catalog probe
//! - `GET  /alimentos`         list foods
//! - `GET  /alimento/{codigo}` one food
//! - `POST /buscar`            filter by nutrient bounds
//! - `POST /alimento`          create a food
//! - `POST /ask`               natural-language question
//! - `POST /receta`            recipe from food codes

pub mod error;
pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub use error::ApiError;

use crate::adapters::{GeminiClient, TextGenerator};
use crate::config::{ResolvedConfig, ServerSettings};
use crate::core::{Assistant, GenerationClient, RecipeService};
use crate::store::{FoodRepository, SqliteStore};

/// Shared state for all handlers
pub struct AppState {
    pub assistant: Assistant,
    pub recipes: RecipeService,
    pub foods: FoodRepository,
}

impl AppState {
    /// Wire the components over one database and one generator
    pub fn new(config: &ResolvedConfig, generator: Arc<dyn TextGenerator>) -> Self {
        let generation = &config.generation;
        let foods = FoodRepository::new(&config.database);

        let assistant = Assistant::new(
            generator.clone(),
            Arc::new(SqliteStore::read_only(&config.database)),
            generation.model.clone(),
            generation.timeout(),
            config.retry.clone(),
        );
        let recipes = RecipeService::new(
            foods.clone(),
            GenerationClient::new(generator, generation.timeout()),
            generation.model.clone(),
        );

        Self {
            assistant,
            recipes,
            foods,
        }
    }
}

/// CORS layer from the configured origins
fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let origin = if settings.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = settings
            .cors_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the router
pub fn create_router(state: Arc<AppState>, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Catalog
        .route("/alimentos", get(handlers::list_foods))
        .route("/alimento/{codigo}", get(handlers::get_food))
        .route("/alimento", post(handlers::create_food))
        .route("/buscar", post(handlers::search_foods))
        // Assistant
        .route("/ask", post(handlers::ask))
        .route("/receta", post(handlers::create_recipe))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(settings))
        .with_state(state)
}

/// Serve the API until the process is interrupted
pub async fn serve(config: &ResolvedConfig) -> Result<()> {
    let generator = Arc::new(GeminiClient::from_settings(&config.generation)?);
    let state = Arc::new(AppState::new(config, generator));
    let router = create_router(state, &config.server);

    let addr = &config.server.bind;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        addr = %addr,
        database = %config.database.display(),
        model = %config.generation.model,
        "nutria API listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
