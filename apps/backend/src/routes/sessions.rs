//! Session endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::ledger;
use crate::AppState;

/// POST /api/learners/:learner_id/sessions
pub async fn record(
    State(state): State<AppState>,
    Path(learner_id): Path<Uuid>,
    Json(payload): Json<SessionInput>,
) -> Result<Json<SessionOutcome>> {
    if payload.subject_id.trim().is_empty() {
        return Err(ApiError::BadRequest("subject_id is required".to_string()));
    }
    if payload
        .items
        .iter()
        .any(|item| item.exercise_id.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "every item needs an exercise_id".to_string(),
        ));
    }

    let outcome = ledger::record_session(
        &state.db,
        learner_id,
        &payload,
        state.config.ledger_max_retries,
    )
    .await?;

    Ok(Json(outcome))
}

/// GET /api/learners/:learner_id/attempts/:attempt_id
pub async fn get_attempt(
    State(state): State<AppState>,
    Path((learner_id, attempt_id)): Path<(Uuid, String)>,
) -> Result<Json<AttemptRecord>> {
    let record = state
        .db
        .get_attempt(learner_id, &attempt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("attempt {}", attempt_id)))?;

    Ok(Json(record))
}
