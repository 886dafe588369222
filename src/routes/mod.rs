use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::Cache,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{catalog::CatalogClient, recommendations::RecommendationPipeline},
};

pub mod planning;
pub mod recommendations;

/// Shared handler state
pub struct AppState {
    pub catalog: Arc<dyn CatalogClient>,
    pub pipeline: RecommendationPipeline,
    /// `None` disables result caching
    pub cache: Option<Cache>,
    /// Cached rankings younger than this are served without re-running
    pub freshness: chrono::Duration,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/users/:user/recommendations",
            get(recommendations::recommend),
        )
        .route("/planning", post(planning::add_to_planning))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
