//! Progress read endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::services::progress::load_biome;
use crate::AppState;

/// GET /api/learners/:learner_id/summary
pub async fn summary(
    State(state): State<AppState>,
    Path(learner_id): Path<Uuid>,
) -> Result<Json<LearnerSummaryResponse>> {
    let stats = state.db.get_stats(learner_id).await?;
    let summary = state.db.get_summary(learner_id).await?;

    Ok(Json(LearnerSummaryResponse { stats, summary }))
}

/// GET /api/learners/:learner_id/skills
pub async fn skills(
    State(state): State<AppState>,
    Path(learner_id): Path<Uuid>,
) -> Result<Json<Vec<SkillProgress>>> {
    let skills = state.db.list_skills(learner_id).await?;
    Ok(Json(skills))
}

/// GET /api/learners/:learner_id/progression/:subject_id
pub async fn progression(
    State(state): State<AppState>,
    Path((learner_id, subject_id)): Path<(Uuid, String)>,
) -> Result<Json<BiomeProgress>> {
    let biome = load_biome(&state.db, state.catalog.as_ref(), learner_id, &subject_id).await?;
    Ok(Json(biome))
}
