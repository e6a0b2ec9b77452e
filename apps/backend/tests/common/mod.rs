//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up the test environment with a database
//! - Helpers for creating learners and seeding questions
//!
//! # Requirements
//! Integration tests require a PostgreSQL database (set DATABASE_URL env var).

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use mastery_backend::config::Config;
use mastery_backend::db::Database;
use mastery_backend::models::Question;
use mastery_backend::AppState;

/// Test context containing database connection and router.
///
/// Requires DATABASE_URL environment variable to be set.
pub struct TestContext {
    pub db: Arc<Database>,
    app: Router,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let config = Config::from_env().expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&config.database_url, config.db_max_connections)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let db = Arc::new(db);

        let state = AppState {
            db: db.clone(),
            catalog: Arc::new(fixtures::catalog()),
            config: Arc::new(config),
        };

        let app = mastery_backend::app(state);

        Self { db, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// A fresh learner id; learners need no registration.
    pub fn new_learner(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Insert questions into the content table.
    pub async fn seed_questions(&self, subject_id: &str, questions: &[Question]) {
        for question in questions {
            self.db
                .upsert_question(subject_id, question)
                .await
                .expect("Failed to seed question");
        }
    }

    /// Remove seeded questions.
    pub async fn cleanup_questions(&self, ids: &[String]) {
        let _ = sqlx::query("DELETE FROM questions WHERE id = ANY($1)")
            .bind(ids)
            .execute(self.db.pool())
            .await;
    }

    /// Clean up test data for a learner.
    ///
    /// Call this after tests to remove test data.
    pub async fn cleanup_learner(&self, learner_id: Uuid) {
        // attempt_items go with their attempt
        for table in [
            "attempts",
            "skill_progress",
            "block_progress",
            "zone_rebuild_progress",
            "biome_rebuild_progress",
            "progress_summaries",
            "learner_stats",
        ] {
            let _ = sqlx::query(&format!("DELETE FROM {} WHERE learner_id = $1", table))
                .bind(learner_id)
                .execute(self.db.pool())
                .await;
        }
    }
}

/// Path of a learner-scoped endpoint.
pub fn learner_path(learner_id: Uuid, rest: &str) -> String {
    format!("/api/learners/{}/{}", learner_id, rest)
}
