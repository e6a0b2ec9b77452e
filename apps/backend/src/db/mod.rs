//! PostgreSQL database operations

use std::collections::HashMap;

use sqlx::{postgres::PgPoolOptions, types::Json, PgConnection, PgPool};
use uuid::Uuid;

use mastery_core::{plan_session, LedgerSnapshot, RebuildTarget, SessionClock};

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === Ledger ===

    /// Run one ledger unit in a serializable transaction.
    ///
    /// Every read happens before the plan is computed and every write after
    /// it. A conflicting writer makes PostgreSQL abort the transaction; the
    /// caller retries the whole unit.
    pub async fn record_session(
        &self,
        learner_id: Uuid,
        input: &SessionInput,
        attempt_id: &str,
        clock: SessionClock,
    ) -> Result<SessionOutcome> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let snapshot = read_snapshot(&mut tx, learner_id, input).await?;

        let Some(plan) = plan_session(&snapshot, input, attempt_id, clock) else {
            tx.rollback().await?;
            return Ok(SessionOutcome::default());
        };

        upsert_stats(&mut tx, learner_id, &plan.stats).await?;
        upsert_summary(&mut tx, learner_id, &plan.summary).await?;
        for skill in &plan.skills {
            upsert_skill(&mut tx, learner_id, skill).await?;
        }
        for (skill_id, block) in &plan.blocks {
            upsert_block(&mut tx, learner_id, skill_id, block).await?;
        }
        if let Some(record) = &plan.attempt {
            insert_attempt(&mut tx, learner_id, record).await?;
        }
        if let Some((target, progress)) = &plan.rebuild {
            upsert_rebuild(&mut tx, learner_id, target, progress).await?;
        }

        tx.commit().await?;
        Ok(plan.outcome)
    }

    // === Learner Read Models ===

    pub async fn get_stats(&self, learner_id: Uuid) -> Result<LearnerStats> {
        let mut conn = self.pool.acquire().await?;
        fetch_stats(&mut conn, learner_id).await
    }

    pub async fn get_summary(&self, learner_id: Uuid) -> Result<ProgressSummary> {
        let mut conn = self.pool.acquire().await?;
        fetch_summary(&mut conn, learner_id).await
    }

    /// All skill progress of a learner, ordered by skill id
    pub async fn list_skills(&self, learner_id: Uuid) -> Result<Vec<SkillProgress>> {
        let rows = sqlx::query_as::<_, DbSkillProgress>(
            r#"
            SELECT skill_id, mastery, bucket, attempts, correct_answers, wrong_answers,
                   recent_results, streak_correct, streak_wrong, last_delta,
                   next_due_date, updated_at
            FROM skill_progress
            WHERE learner_id = $1
            ORDER BY skill_id
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbSkillProgress::to_core).collect())
    }

    pub async fn get_blocks(&self, learner_id: Uuid) -> Result<HashMap<String, BlockProgress>> {
        let rows = sqlx::query_as::<_, DbBlockProgress>(
            r#"
            SELECT skill_id, attempts, correct, success_rate, mastery_score, updated_at
            FROM block_progress
            WHERE learner_id = $1
            "#,
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.skill_id.clone(), row.to_core()))
            .collect())
    }

    /// Zone rebuild counters of one subject, keyed by `(subject_id, theme_id)`
    pub async fn get_zone_rebuilds(
        &self,
        learner_id: Uuid,
        subject_id: &str,
    ) -> Result<HashMap<(String, String), RebuildProgress>> {
        let rows = sqlx::query_as::<_, DbRebuildProgress>(
            r#"
            SELECT subject_id, theme_id AS group_id, correct_count, target, updated_at
            FROM zone_rebuild_progress
            WHERE learner_id = $1 AND subject_id = $2
            "#,
        )
        .bind(learner_id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ((row.subject_id.clone(), row.group_id.clone()), row.to_core()))
            .collect())
    }

    pub async fn get_biome_rebuild(
        &self,
        learner_id: Uuid,
        subject_id: &str,
    ) -> Result<Option<RebuildProgress>> {
        let mut conn = self.pool.acquire().await?;
        fetch_rebuild(&mut conn, learner_id, &RebuildTarget::biome(subject_id)).await
    }

    /// Most recent answers, newest first
    pub async fn recent_answers(&self, learner_id: Uuid, limit: i64) -> Result<Vec<AnswerRecord>> {
        let rows = sqlx::query_as::<_, DbAnswer>(
            r#"
            SELECT ai.exercise_id, ai.tags, ai.correct, a.created_at
            FROM attempt_items ai
            JOIN attempts a ON a.id = ai.attempt_id
            WHERE a.learner_id = $1
            ORDER BY a.created_at DESC, ai.position DESC
            LIMIT $2
            "#,
        )
        .bind(learner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbAnswer::to_core).collect())
    }

    /// Get one of a learner's attempts with its items
    pub async fn get_attempt(
        &self,
        learner_id: Uuid,
        attempt_id: &str,
    ) -> Result<Option<AttemptRecord>> {
        let attempt = sqlx::query_as::<_, DbAttempt>(
            r#"
            SELECT id, subject_id, theme_id, score, out_of, duration_sec,
                   items_count, date, created_at
            FROM attempts
            WHERE id = $1 AND learner_id = $2
            "#,
        )
        .bind(attempt_id)
        .bind(learner_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(attempt) = attempt else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, DbAttemptItem>(
            r#"
            SELECT exercise_id, tags, correct, difficulty, item_index
            FROM attempt_items
            WHERE attempt_id = $1
            ORDER BY position
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(AttemptRecord {
            attempt: attempt.to_core(),
            items: items.iter().map(DbAttemptItem::to_core).collect(),
        }))
    }

    // === Content Provider ===

    /// Questions tagged with any of `skill_ids`, ordered by id
    pub async fn questions_for_skills(&self, skill_ids: &[String]) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, DbQuestion>(
            r#"
            SELECT id, subject_id, tags, difficulty, content
            FROM questions
            WHERE tags && $1
            ORDER BY id
            "#,
        )
        .bind(skill_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(DbQuestion::to_core).collect())
    }

    /// Insert or replace a question
    pub async fn upsert_question(&self, subject_id: &str, question: &Question) -> Result<()> {
        let row = DbQuestion::from_core(subject_id, question);
        sqlx::query(
            r#"
            INSERT INTO questions (id, subject_id, tags, difficulty, content)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                subject_id = EXCLUDED.subject_id,
                tags = EXCLUDED.tags,
                difficulty = EXCLUDED.difficulty,
                content = EXCLUDED.content
            "#,
        )
        .bind(&row.id)
        .bind(&row.subject_id)
        .bind(&row.tags)
        .bind(row.difficulty)
        .bind(&row.content)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// === Transaction Reads ===

async fn read_snapshot(
    conn: &mut PgConnection,
    learner_id: Uuid,
    input: &SessionInput,
) -> Result<LedgerSnapshot> {
    let stats = fetch_stats(conn, learner_id).await?;
    let summary = fetch_summary(conn, learner_id).await?;

    let skill_ids = input.skill_ids();
    let rows = sqlx::query_as::<_, DbSkillProgress>(
        r#"
        SELECT skill_id, mastery, bucket, attempts, correct_answers, wrong_answers,
               recent_results, streak_correct, streak_wrong, last_delta,
               next_due_date, updated_at
        FROM skill_progress
        WHERE learner_id = $1 AND skill_id = ANY($2)
        "#,
    )
    .bind(learner_id)
    .bind(&skill_ids)
    .fetch_all(&mut *conn)
    .await?;
    let skills = rows
        .iter()
        .map(|row| (row.skill_id.clone(), row.to_core()))
        .collect();

    let rebuild = match &input.rebuild {
        Some(target) => fetch_rebuild(conn, learner_id, target).await?,
        None => None,
    };

    Ok(LedgerSnapshot {
        stats,
        summary,
        skills,
        rebuild,
    })
}

async fn fetch_stats(conn: &mut PgConnection, learner_id: Uuid) -> Result<LearnerStats> {
    let row = sqlx::query_as::<_, DbLearnerStats>(
        r#"
        SELECT xp, coins, streak_days, last_session_date, badges
        FROM learner_stats
        WHERE learner_id = $1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.to_core()).unwrap_or_default())
}

async fn fetch_summary(conn: &mut PgConnection, learner_id: Uuid) -> Result<ProgressSummary> {
    let row = sqlx::query_as::<_, DbProgressSummary>(
        r#"
        SELECT total_answers, correct_answers, total_attempts, mastery_buckets,
               last_attempt_id, last_date, top_weak_tags
        FROM progress_summaries
        WHERE learner_id = $1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| r.to_core()).unwrap_or_default())
}

async fn fetch_rebuild(
    conn: &mut PgConnection,
    learner_id: Uuid,
    target: &RebuildTarget,
) -> Result<Option<RebuildProgress>> {
    let row = match target {
        RebuildTarget::Zone {
            subject_id,
            theme_id,
        } => {
            sqlx::query_as::<_, DbRebuildProgress>(
                r#"
                SELECT subject_id, theme_id AS group_id, correct_count, target, updated_at
                FROM zone_rebuild_progress
                WHERE learner_id = $1 AND subject_id = $2 AND theme_id = $3
                "#,
            )
            .bind(learner_id)
            .bind(subject_id)
            .bind(theme_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        RebuildTarget::Biome { subject_id } => {
            sqlx::query_as::<_, DbRebuildProgress>(
                r#"
                SELECT subject_id, subject_id AS group_id, correct_count, target, updated_at
                FROM biome_rebuild_progress
                WHERE learner_id = $1 AND subject_id = $2
                "#,
            )
            .bind(learner_id)
            .bind(subject_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };

    Ok(row.map(|r| r.to_core()))
}

// === Transaction Writes ===

async fn upsert_stats(conn: &mut PgConnection, learner_id: Uuid, stats: &LearnerStats) -> Result<()> {
    let badges: Vec<String> = stats.badges.iter().cloned().collect();
    sqlx::query(
        r#"
        INSERT INTO learner_stats (learner_id, xp, coins, streak_days, last_session_date, badges, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (learner_id) DO UPDATE SET
            xp = EXCLUDED.xp,
            coins = EXCLUDED.coins,
            streak_days = EXCLUDED.streak_days,
            last_session_date = EXCLUDED.last_session_date,
            badges = EXCLUDED.badges,
            updated_at = NOW()
        "#,
    )
    .bind(learner_id)
    .bind(stats.xp as i64)
    .bind(stats.coins as i64)
    .bind(stats.streak_days as i32)
    .bind(stats.last_session_date)
    .bind(&badges)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_summary(
    conn: &mut PgConnection,
    learner_id: Uuid,
    summary: &ProgressSummary,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO progress_summaries (learner_id, total_answers, correct_answers, total_attempts,
                                        mastery_buckets, last_attempt_id, last_date, top_weak_tags,
                                        updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (learner_id) DO UPDATE SET
            total_answers = EXCLUDED.total_answers,
            correct_answers = EXCLUDED.correct_answers,
            total_attempts = EXCLUDED.total_attempts,
            mastery_buckets = EXCLUDED.mastery_buckets,
            last_attempt_id = EXCLUDED.last_attempt_id,
            last_date = EXCLUDED.last_date,
            top_weak_tags = EXCLUDED.top_weak_tags,
            updated_at = NOW()
        "#,
    )
    .bind(learner_id)
    .bind(summary.total_answers as i64)
    .bind(summary.correct_answers as i64)
    .bind(summary.total_attempts as i64)
    .bind(Json(&summary.mastery_buckets))
    .bind(&summary.last_attempt_id)
    .bind(summary.last_date)
    .bind(Json(&summary.top_weak_tags))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_skill(conn: &mut PgConnection, learner_id: Uuid, skill: &SkillProgress) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO skill_progress (learner_id, skill_id, mastery, bucket, attempts, correct_answers,
                                    wrong_answers, recent_results, streak_correct, streak_wrong,
                                    last_delta, next_due_date, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, COALESCE($13, NOW()))
        ON CONFLICT (learner_id, skill_id) DO UPDATE SET
            mastery = EXCLUDED.mastery,
            bucket = EXCLUDED.bucket,
            attempts = EXCLUDED.attempts,
            correct_answers = EXCLUDED.correct_answers,
            wrong_answers = EXCLUDED.wrong_answers,
            recent_results = EXCLUDED.recent_results,
            streak_correct = EXCLUDED.streak_correct,
            streak_wrong = EXCLUDED.streak_wrong,
            last_delta = EXCLUDED.last_delta,
            next_due_date = EXCLUDED.next_due_date,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(learner_id)
    .bind(&skill.skill_id)
    .bind(skill.mastery as i16)
    .bind(skill.bucket.as_str())
    .bind(skill.attempts as i32)
    .bind(skill.correct_answers as i32)
    .bind(skill.wrong_answers as i32)
    .bind(&skill.recent_results)
    .bind(skill.streak_correct as i32)
    .bind(skill.streak_wrong as i32)
    .bind(skill.last_delta)
    .bind(skill.next_due_date)
    .bind(skill.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn upsert_block(
    conn: &mut PgConnection,
    learner_id: Uuid,
    skill_id: &str,
    block: &BlockProgress,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO block_progress (learner_id, skill_id, attempts, correct, success_rate,
                                    mastery_score, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()))
        ON CONFLICT (learner_id, skill_id) DO UPDATE SET
            attempts = EXCLUDED.attempts,
            correct = EXCLUDED.correct,
            success_rate = EXCLUDED.success_rate,
            mastery_score = EXCLUDED.mastery_score,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(learner_id)
    .bind(skill_id)
    .bind(block.attempts as i32)
    .bind(block.correct as i32)
    .bind(block.success_rate)
    .bind(block.mastery_score as i16)
    .bind(block.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_attempt(
    conn: &mut PgConnection,
    learner_id: Uuid,
    record: &AttemptRecord,
) -> Result<()> {
    let attempt = &record.attempt;
    sqlx::query(
        r#"
        INSERT INTO attempts (id, learner_id, subject_id, theme_id, score, out_of, duration_sec,
                              items_count, date, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(&attempt.id)
    .bind(learner_id)
    .bind(&attempt.subject_id)
    .bind(&attempt.theme_id)
    .bind(attempt.score as i32)
    .bind(attempt.out_of as i32)
    .bind(attempt.duration_sec as i32)
    .bind(attempt.items_count as i32)
    .bind(attempt.date)
    .bind(attempt.created_at)
    .execute(&mut *conn)
    .await?;

    for (position, item) in record.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO attempt_items (attempt_id, position, item_index, exercise_id, tags,
                                       correct, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&attempt.id)
        .bind(position as i32)
        .bind(item.index as i32)
        .bind(&item.exercise_id)
        .bind(&item.tags)
        .bind(item.correct)
        .bind(item.difficulty as i16)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn upsert_rebuild(
    conn: &mut PgConnection,
    learner_id: Uuid,
    target: &RebuildTarget,
    progress: &RebuildProgress,
) -> Result<()> {
    let query = match target {
        RebuildTarget::Zone {
            subject_id,
            theme_id,
        } => sqlx::query(
            r#"
            INSERT INTO zone_rebuild_progress
                (learner_id, subject_id, theme_id, correct_count, target, updated_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
            ON CONFLICT (learner_id, subject_id, theme_id) DO UPDATE SET
                correct_count = EXCLUDED.correct_count,
                target = EXCLUDED.target,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(learner_id)
        .bind(subject_id)
        .bind(theme_id),
        RebuildTarget::Biome { subject_id } => sqlx::query(
            r#"
            INSERT INTO biome_rebuild_progress (learner_id, subject_id, correct_count, target, updated_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
            ON CONFLICT (learner_id, subject_id) DO UPDATE SET
                correct_count = EXCLUDED.correct_count,
                target = EXCLUDED.target,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(learner_id)
        .bind(subject_id),
    };

    query
        .bind(progress.correct_count as i32)
        .bind(progress.target as i32)
        .bind(progress.updated_at)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
