//! Recommendation endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use mastery_core::{recommend, RecommendationInput};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::progress::{daily_seed, load_biome, mastery_scores};
use crate::AppState;

/// POST /api/learners/:learner_id/recommendation
pub async fn recommendation(
    State(state): State<AppState>,
    Path(learner_id): Path<Uuid>,
    Json(payload): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>> {
    if payload.subject_id.trim().is_empty() {
        return Err(ApiError::BadRequest("subject_id is required".to_string()));
    }

    let biome = load_biome(
        &state.db,
        state.catalog.as_ref(),
        learner_id,
        &payload.subject_id,
    )
    .await?;
    let mastery = mastery_scores(&state.db.list_skills(learner_id).await?);
    let seed = payload
        .seed
        .clone()
        .unwrap_or_else(|| daily_seed(learner_id, Utc::now().date_naive()));

    let recommendation = recommend(&RecommendationInput {
        biome: &biome,
        mastery: &mastery,
        allowed_skills: &payload.allowed_skills,
        seed: &seed,
        last_advice: payload.last_advice.as_ref(),
    })?;

    tracing::info!(
        %learner_id,
        subject = %payload.subject_id,
        advice = %recommendation.advice_id,
        "recommendation served"
    );

    let last_advice = recommendation.last_advice();
    Ok(Json(RecommendationResponse {
        recommendation,
        last_advice,
    }))
}
