use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::TitleId,
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PlanningRequest {
    pub title_id: TitleId,
}

#[derive(Debug, Serialize)]
pub struct PlanningResponse {
    pub title_id: TitleId,
    pub status: &'static str,
}

/// Adds a title to the user's planning list. Not part of scoring.
pub async fn add_to_planning(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<PlanningRequest>,
) -> AppResult<(StatusCode, Json<PlanningResponse>)> {
    if request.title_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Invalid title id {}",
            request.title_id
        )));
    }

    state
        .catalog
        .submit_planning_add(request.title_id)
        .await
        .map_err(|e| {
            tracing::warn!(
                request_id = %request_id,
                title_id = request.title_id,
                error = %e,
                "Planning add failed"
            );
            e
        })?;

    tracing::info!(
        request_id = %request_id,
        title_id = request.title_id,
        "Planning add submitted"
    );

    Ok((
        StatusCode::OK,
        Json(PlanningResponse {
            title_id: request.title_id,
            status: "planning",
        }),
    ))
}
