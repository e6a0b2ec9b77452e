//! Ledger service: runs session transactions with conflict retries.

use std::future::Future;

use chrono::Utc;
use uuid::Uuid;

use mastery_core::SessionClock;

use crate::db::Database;
use crate::error::{ApiError, Result};
use crate::models::{SessionInput, SessionOutcome};

/// Run `op` until it succeeds, fails for a reason other than a serialization
/// conflict, or has been retried `max_retries` times.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retries<T, F, Fut>(max_retries: u32, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Err(err) if err.is_serialization_conflict() => {
                if attempt > max_retries {
                    tracing::error!(attempt, "ledger retries exhausted");
                    return Err(ApiError::Transient(format!(
                        "session not recorded after {} attempts",
                        attempt
                    )));
                }
                tracing::warn!(attempt, error = %err, "ledger conflict, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Record a graded session for a learner.
///
/// An empty session returns a zero outcome without touching the store.
pub async fn record_session(
    db: &Database,
    learner_id: Uuid,
    input: &SessionInput,
    max_retries: u32,
) -> Result<SessionOutcome> {
    let items = input.normalized_items().len();
    if items == 0 {
        tracing::debug!(%learner_id, "empty session ignored");
        return Ok(SessionOutcome::default());
    }

    let attempt_id = Uuid::new_v4().to_string();
    let mut tries = 0;
    let outcome = with_retries(max_retries, |attempt| {
        tries = attempt;
        let clock = SessionClock::at(Utc::now());
        db.record_session(learner_id, input, &attempt_id, clock)
    })
    .await?;

    tracing::info!(
        %learner_id,
        subject = %input.subject_id,
        items,
        retries = tries.saturating_sub(1),
        score = outcome.score,
        out_of = outcome.out_of,
        streak_days = outcome.streak_days,
        "session recorded"
    );

    Ok(outcome)
}
