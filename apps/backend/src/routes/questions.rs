//! Question selection endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use mastery_core::{select, Selection, SelectionRequest};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::services::progress::mastery_states;
use crate::AppState;

/// Answers considered for repair and freshness checks.
const HISTORY_LIMIT: i64 = 200;
const MAX_DESIRED_COUNT: usize = 50;

/// POST /api/learners/:learner_id/questions/select
pub async fn select_questions(
    State(state): State<AppState>,
    Path(learner_id): Path<Uuid>,
    Json(payload): Json<SelectQuestionsRequest>,
) -> Result<Json<Selection>> {
    if payload.target_skill.trim().is_empty() {
        return Err(ApiError::BadRequest("target_skill is required".to_string()));
    }
    if payload.desired_count > MAX_DESIRED_COUNT {
        return Err(ApiError::BadRequest(format!(
            "desired_count must be at most {}",
            MAX_DESIRED_COUNT
        )));
    }

    let mut skill_ids = vec![payload.target_skill.clone()];
    skill_ids.extend(payload.secondary_skills.iter().cloned());

    let pool = state.db.questions_for_skills(&skill_ids).await?;
    let history = state.db.recent_answers(learner_id, HISTORY_LIMIT).await?;
    let mastery = mastery_states(&state.db.list_skills(learner_id).await?);

    let request = SelectionRequest {
        target_skill: &payload.target_skill,
        secondary_skills: &payload.secondary_skills,
        session_kind: payload.session_kind,
        desired_count: payload.desired_count,
        mastery: &mastery,
        history: &history,
        now: Utc::now(),
    };
    let selection = select(&pool, &request);

    tracing::debug!(
        %learner_id,
        target = %payload.target_skill,
        pool = pool.len(),
        selected = selection.questions.len(),
        needs_repair = selection.needs_repair,
        "questions selected"
    );

    Ok(Json(selection))
}
