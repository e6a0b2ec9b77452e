//! Adaptive mastery engine shared by the backend and any offline client.
//!
//! Provides:
//! - Mastery ledger planning (attempts -> mastery, buckets, due dates, counters)
//! - Spaced scheduling helpers (bucket classification, next due date)
//! - Question selection for a skill and session kind
//! - Progression state machine (skills, zones, biomes)
//! - Seeded, weighted recommendation of the next action
//! - Catalog lookup with fallback for unknown skills

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod progression;
pub mod recommendation;
pub mod rng;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use catalog::{CatalogLookup, SkillInfo, StaticCatalog};
pub use error::{EngineError, Result};
pub use ledger::{plan_session, LedgerSnapshot, SessionClock, SessionInput, SessionOutcome, SessionPlan};
pub use progression::{BiomeProgress, BiomeRebuildStatus, BiomeState, SkillState, SkillView, ZoneProgress, ZoneState};
pub use recommendation::{recommend, AdviceOption, AdvicePayload, Recommendation, RecommendationInput};
pub use scheduler::{bucket_of, next_due_date};
pub use selector::{select, AnswerRecord, Question, Selection, SelectionRequest};
pub use types::{
    ActionType, Attempt, AttemptItem, BlockProgress, LastAdvice, LearnerStats, MasteryBucket,
    MasteryState, ProgressSummary, RebuildProgress, RebuildTarget, SessionKind, SkillProgress,
    WeakTag,
};
