use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{normalize_user, CachedRecommendations, MediaFormat, PipelineOutcome},
    routes::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationParams {
    /// Ignore a fresh cached ranking and recompute
    #[serde(default)]
    pub refresh: bool,
    /// Only titles of this format
    #[serde(default)]
    pub format: Option<MediaFormat>,
    /// Leave out titles already on the planning list
    #[serde(default)]
    pub hide_planning: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user: String,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

/// Presentation filters; they drop entries but never reorder or rescore
fn apply_filters(outcome: PipelineOutcome, params: &RecommendationParams) -> PipelineOutcome {
    match outcome {
        PipelineOutcome::Empty => PipelineOutcome::Empty,
        PipelineOutcome::Ranked(list) => PipelineOutcome::Ranked(
            list.into_iter()
                .filter(|r| params.format.map_or(true, |f| r.format == f))
                .filter(|r| !(params.hide_planning && r.is_planning))
                .collect(),
        ),
    }
}

fn respond(
    result: CachedRecommendations,
    cached: bool,
    params: &RecommendationParams,
) -> RecommendationsResponse {
    RecommendationsResponse {
        user: result.user,
        generated_at: result.generated_at,
        cached,
        outcome: apply_filters(result.outcome, params),
    }
}

/// Handler for the per-user recommendations endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationsResponse>> {
    let normalized = normalize_user(&user);

    if !params.refresh {
        if let Some(cache) = &state.cache {
            match cache.get_recommendations(&normalized).await {
                Ok(Some(hit)) if hit.is_fresh(Utc::now(), state.freshness) => {
                    tracing::info!(
                        request_id = %request_id,
                        user = %normalized,
                        generated_at = %hit.generated_at,
                        "Serving cached recommendations"
                    );
                    return Ok(Json(respond(hit, true, &params)));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Result cache unavailable");
                }
            }
        }
    }

    tracing::info!(
        request_id = %request_id,
        user = %normalized,
        refresh = params.refresh,
        "Running recommendation pipeline"
    );

    let outcome = state.pipeline.run(&user).await?;
    let result = CachedRecommendations {
        user: normalized,
        generated_at: Utc::now(),
        outcome,
    };

    if let Some(cache) = &state.cache {
        cache.store_in_background(&result);
    }

    Ok(Json(respond(result, false, &params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::title;
    use crate::models::{CandidateEntry, Recommendation};

    fn recommendation(id: i64, format: MediaFormat, is_planning: bool) -> Recommendation {
        let mut t = title(id, &[], &[]);
        t.format = format;
        let mut entry = CandidateEntry::new(t);
        entry.is_planning = is_planning;
        entry.into()
    }

    fn ids(outcome: &PipelineOutcome) -> Vec<i64> {
        match outcome {
            PipelineOutcome::Ranked(list) => list.iter().map(|r| r.id).collect(),
            PipelineOutcome::Empty => vec![],
        }
    }

    #[test]
    fn test_filters_keep_order() {
        let outcome = PipelineOutcome::Ranked(vec![
            recommendation(1, MediaFormat::Tv, false),
            recommendation(2, MediaFormat::Movie, false),
            recommendation(3, MediaFormat::Tv, true),
            recommendation(4, MediaFormat::Tv, false),
        ]);

        let params = RecommendationParams {
            format: Some(MediaFormat::Tv),
            hide_planning: true,
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(outcome.clone(), &params)), vec![1, 4]);
        assert_eq!(
            ids(&apply_filters(outcome, &RecommendationParams::default())),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_empty_stays_empty() {
        let params = RecommendationParams {
            hide_planning: true,
            ..Default::default()
        };
        assert_eq!(
            apply_filters(PipelineOutcome::Empty, &params),
            PipelineOutcome::Empty
        );
    }

    #[test]
    fn test_response_flattens_outcome() {
        let response = RecommendationsResponse {
            user: "someone".to_string(),
            generated_at: Utc::now(),
            cached: false,
            outcome: PipelineOutcome::Empty,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "empty");
        assert_eq!(json["cached"], false);
    }
}
