//! Database models and API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;

// Re-export shared types from mastery-core
pub use mastery_core::ledger::AttemptRecord;
pub use mastery_core::{
    AnswerRecord, Attempt, AttemptItem, BiomeProgress, BlockProgress, LastAdvice, LearnerStats,
    MasteryBucket, ProgressSummary, Question, RebuildProgress, Recommendation, SessionInput,
    SessionKind, SessionOutcome, SkillProgress, WeakTag,
};

fn to_u32(value: i32) -> u32 {
    value.max(0) as u32
}

fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

// === Database Entity Types ===

/// Learner rewards row
#[derive(Debug, Clone, FromRow)]
pub struct DbLearnerStats {
    pub xp: i64,
    pub coins: i64,
    pub streak_days: i32,
    pub last_session_date: Option<NaiveDate>,
    pub badges: Vec<String>,
}

impl DbLearnerStats {
    pub fn to_core(&self) -> LearnerStats {
        LearnerStats {
            xp: to_u64(self.xp),
            coins: to_u64(self.coins),
            streak_days: to_u32(self.streak_days),
            last_session_date: self.last_session_date,
            badges: self.badges.iter().cloned().collect(),
        }
    }
}

/// Aggregate counters row
#[derive(Debug, Clone, FromRow)]
pub struct DbProgressSummary {
    pub total_answers: i64,
    pub correct_answers: i64,
    pub total_attempts: i64,
    pub mastery_buckets: Json<BTreeMap<MasteryBucket, u32>>,
    pub last_attempt_id: Option<String>,
    pub last_date: Option<NaiveDate>,
    pub top_weak_tags: Json<Vec<WeakTag>>,
}

impl DbProgressSummary {
    pub fn to_core(&self) -> ProgressSummary {
        ProgressSummary {
            total_answers: to_u64(self.total_answers),
            correct_answers: to_u64(self.correct_answers),
            total_attempts: to_u64(self.total_attempts),
            mastery_buckets: self.mastery_buckets.0.clone(),
            last_attempt_id: self.last_attempt_id.clone(),
            last_date: self.last_date,
            top_weak_tags: self.top_weak_tags.0.clone(),
        }
    }
}

/// Per-skill mastery row
#[derive(Debug, Clone, FromRow)]
pub struct DbSkillProgress {
    pub skill_id: String,
    pub mastery: i16,
    pub bucket: String,
    pub attempts: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub recent_results: Vec<bool>,
    pub streak_correct: i32,
    pub streak_wrong: i32,
    pub last_delta: i32,
    pub next_due_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl DbSkillProgress {
    /// The bucket is recomputed from the stored mastery, never trusted as-is.
    pub fn to_core(&self) -> SkillProgress {
        let mastery = self.mastery.clamp(0, 100) as u8;
        SkillProgress {
            skill_id: self.skill_id.clone(),
            mastery,
            bucket: mastery_core::bucket_of(mastery),
            attempts: to_u32(self.attempts),
            correct_answers: to_u32(self.correct_answers),
            wrong_answers: to_u32(self.wrong_answers),
            recent_results: self.recent_results.clone(),
            streak_correct: to_u32(self.streak_correct),
            streak_wrong: to_u32(self.streak_wrong),
            last_delta: self.last_delta,
            next_due_date: self.next_due_date,
            updated_at: Some(self.updated_at),
        }
    }
}

/// UI-facing counters row
#[derive(Debug, Clone, FromRow)]
pub struct DbBlockProgress {
    pub skill_id: String,
    pub attempts: i32,
    pub correct: i32,
    pub success_rate: f64,
    pub mastery_score: i16,
    pub updated_at: DateTime<Utc>,
}

impl DbBlockProgress {
    pub fn to_core(&self) -> BlockProgress {
        BlockProgress {
            attempts: to_u32(self.attempts),
            correct: to_u32(self.correct),
            success_rate: self.success_rate,
            mastery_score: self.mastery_score.clamp(0, 100) as u8,
            updated_at: Some(self.updated_at),
        }
    }
}

/// Zone or biome rebuild counter row; `group_id` is the theme for zones and
/// the subject again for biomes
#[derive(Debug, Clone, FromRow)]
pub struct DbRebuildProgress {
    pub subject_id: String,
    pub group_id: String,
    pub correct_count: i32,
    pub target: i32,
    pub updated_at: DateTime<Utc>,
}

impl DbRebuildProgress {
    pub fn to_core(&self) -> RebuildProgress {
        RebuildProgress {
            correct_count: to_u32(self.correct_count),
            target: to_u32(self.target),
            updated_at: Some(self.updated_at),
        }
    }
}

/// Completed session row
#[derive(Debug, Clone, FromRow)]
pub struct DbAttempt {
    pub id: String,
    pub subject_id: String,
    pub theme_id: String,
    pub score: i32,
    pub out_of: i32,
    pub duration_sec: i32,
    pub items_count: i32,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl DbAttempt {
    pub fn to_core(&self) -> Attempt {
        Attempt {
            id: self.id.clone(),
            subject_id: self.subject_id.clone(),
            theme_id: self.theme_id.clone(),
            score: to_u32(self.score),
            out_of: to_u32(self.out_of),
            duration_sec: to_u32(self.duration_sec),
            items_count: to_u32(self.items_count),
            date: self.date,
            created_at: self.created_at,
        }
    }
}

/// Answered item row
#[derive(Debug, Clone, FromRow)]
pub struct DbAttemptItem {
    pub exercise_id: String,
    pub tags: Vec<String>,
    pub correct: bool,
    pub difficulty: i16,
    pub item_index: i32,
}

impl DbAttemptItem {
    pub fn to_core(&self) -> AttemptItem {
        AttemptItem {
            exercise_id: self.exercise_id.clone(),
            tags: self.tags.clone(),
            correct: self.correct,
            difficulty: self.difficulty.clamp(1, 3) as u8,
            index: to_u32(self.item_index),
        }
    }
}

/// Past answer joined with its attempt timestamp
#[derive(Debug, Clone, FromRow)]
pub struct DbAnswer {
    pub exercise_id: String,
    pub tags: Vec<String>,
    pub correct: bool,
    pub created_at: DateTime<Utc>,
}

impl DbAnswer {
    pub fn to_core(&self) -> AnswerRecord {
        AnswerRecord {
            question_id: self.exercise_id.clone(),
            tags: self.tags.clone(),
            correct: self.correct,
            answered_at: self.created_at,
        }
    }
}

/// Question served by the content provider
#[derive(Debug, Clone, FromRow)]
pub struct DbQuestion {
    pub id: String,
    pub subject_id: String,
    pub tags: Vec<String>,
    pub difficulty: i16,
    pub content: Json<serde_json::Value>,
}

impl DbQuestion {
    pub fn to_core(&self) -> Question {
        let content = match &self.content.0 {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        Question {
            id: self.id.clone(),
            tags: self.tags.clone(),
            difficulty: self.difficulty.clamp(0, u8::MAX as i16) as u8,
            content,
        }
    }

    pub fn from_core(subject_id: &str, question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            subject_id: subject_id.to_string(),
            tags: question.tags.clone(),
            difficulty: question.difficulty as i16,
            content: Json(serde_json::Value::Object(question.content.clone())),
        }
    }
}

// === API Request/Response Types ===

/// Response for GET /api/learners/{learner_id}/summary
#[derive(Debug, Serialize, Deserialize)]
pub struct LearnerSummaryResponse {
    pub stats: LearnerStats,
    pub summary: ProgressSummary,
}

fn default_desired_count() -> usize {
    10
}

/// Request for POST /api/learners/{learner_id}/questions/select
#[derive(Debug, Serialize, Deserialize)]
pub struct SelectQuestionsRequest {
    pub target_skill: String,
    #[serde(default)]
    pub secondary_skills: Vec<String>,
    #[serde(default)]
    pub session_kind: SessionKind,
    #[serde(default = "default_desired_count")]
    pub desired_count: usize,
}

/// Request for POST /api/learners/{learner_id}/recommendation
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub subject_id: String,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub allowed_skills: Vec<String>,
    #[serde(default)]
    pub last_advice: Option<LastAdvice>,
}

/// Response for POST /api/learners/{learner_id}/recommendation
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    /// Breadcrumb to send back as `last_advice` next time.
    pub last_advice: LastAdvice,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_skill_row_recomputes_bucket() {
        let row = DbSkillProgress {
            skill_id: "math-add".to_string(),
            mastery: 82,
            bucket: "weak".to_string(),
            attempts: 20,
            correct_answers: 18,
            wrong_answers: 2,
            recent_results: vec![true, true, false],
            streak_correct: 0,
            streak_wrong: 1,
            last_delta: -1,
            next_due_date: None,
            updated_at: Utc::now(),
        };
        let skill = row.to_core();
        assert_eq!(skill.bucket, MasteryBucket::Mastered);
        assert_eq!(skill.recent_results, vec![true, true, false]);
    }

    #[test]
    fn test_negative_counters_clamp_to_zero() {
        let row = DbLearnerStats {
            xp: -5,
            coins: 12,
            streak_days: -1,
            last_session_date: None,
            badges: vec!["streak_3".to_string(), "streak_3".to_string()],
        };
        let stats = row.to_core();
        assert_eq!(stats.xp, 0);
        assert_eq!(stats.streak_days, 0);
        assert_eq!(stats.badges.len(), 1);
    }

    #[test]
    fn test_question_content_round_trip() {
        let question: Question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "tags": ["math-add"],
            "difficulty": 2,
            "prompt": "2 + 2"
        }))
        .unwrap();
        let row = DbQuestion::from_core("math", &question);
        assert_eq!(row.to_core(), question);
    }

    #[test]
    fn test_select_request_defaults() {
        let request: SelectQuestionsRequest =
            serde_json::from_str(r#"{"target_skill": "math-add"}"#).unwrap();
        assert_eq!(request.desired_count, 10);
        assert_eq!(request.session_kind, SessionKind::Practice);
        assert!(request.secondary_skills.is_empty());
    }
}
