use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    api::models::*,
    config::Settings,
    ranking::constraints::{DEFAULT_DIVERSITY, MAX_DIVERSITY, MIN_DIVERSITY},
    recommender::{RecommendationRequest, RecommendationSet, Recommender},
    Error, Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    pub settings: Settings,
}

/// POST /api/recommend - Ranked recipe recommendations
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationSet>> {
    debug!("Recommend request: {:?}", request);

    let results = state.recommender.recommend(&request).await?;
    Ok(Json(results))
}

/// GET /api/substitutions - Substitutes for a single ingredient
pub async fn substitutions(
    State(state): State<AppState>,
    Query(params): Query<SubstitutionParams>,
) -> Result<Json<SubstitutionResponse>> {
    debug!("Substitution request: {:?}", params);

    let ingredient = params.ingredient.trim();
    if ingredient.is_empty() {
        return Err(Error::Validation(
            "Ingredient parameter is required".to_string(),
        ));
    }

    let substitutes =
        state
            .recommender
            .substitutions(ingredient, &params.allergies, params.cuisine.as_deref());

    Ok(Json(SubstitutionResponse {
        ingredient: ingredient.to_string(),
        substitutes,
    }))
}

/// GET /api/options - Known health conditions and cuisines
pub async fn options(State(state): State<AppState>) -> Result<Json<OptionsResponse>> {
    let tables = state.recommender.tables();

    let mut health_conditions = vec!["none".to_string()];
    health_conditions.extend(tables.condition_names());

    let mut cuisines = vec!["any".to_string()];
    cuisines.extend(tables.cuisine_names());

    Ok(Json(OptionsResponse {
        health_conditions,
        cuisines,
        diversity: DiversityRange {
            min: MIN_DIVERSITY,
            max: MAX_DIVERSITY,
            default: DEFAULT_DIVERSITY,
        },
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    Ok(Json(ReadinessResponse {
        ready: state.recommender.is_ready(),
        index_name: state.settings.vector.index_name.clone(),
        vector_dimension: state.recommender.dimension(),
        rules_version: state.recommender.tables().version,
    }))
}
