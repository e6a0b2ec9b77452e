//! Core types for the mastery engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Number of answers kept in `SkillProgress::recent_results`.
pub const RECENT_RESULTS_WINDOW: usize = 7;

/// Maximum number of skills a single answered item contributes to.
pub const MAX_TAGS_PER_ITEM: usize = 3;

/// Default rebuild target for a zone (theme group).
pub const ZONE_REBUILD_TARGET: u32 = 35;

/// Default rebuild target for a biome (subject group).
pub const BIOME_REBUILD_TARGET: u32 = 100;

/// Coarse mastery classification stored with each skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryBucket {
    Weak,
    Developing,
    Nearly,
    Mastered,
}

impl Default for MasteryBucket {
    fn default() -> Self {
        Self::Weak
    }
}

impl MasteryBucket {
    pub const ALL: [MasteryBucket; 4] = [Self::Weak, Self::Developing, Self::Nearly, Self::Mastered];

    /// Get the bucket name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Developing => "developing",
            Self::Nearly => "nearly",
            Self::Mastered => "mastered",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "weak" => Some(Self::Weak),
            "developing" => Some(Self::Developing),
            "nearly" => Some(Self::Nearly),
            "mastered" => Some(Self::Mastered),
            _ => None,
        }
    }
}

/// Three-level mastery classification used when picking question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryState {
    Discovering,
    Progressing,
    Mastered,
}

impl Default for MasteryState {
    fn default() -> Self {
        Self::Discovering
    }
}

impl MasteryState {
    /// Collapse the four stored buckets onto the three selection states.
    pub fn from_bucket(bucket: MasteryBucket) -> Self {
        match bucket {
            MasteryBucket::Weak => Self::Discovering,
            MasteryBucket::Developing | MasteryBucket::Nearly => Self::Progressing,
            MasteryBucket::Mastered => Self::Mastered,
        }
    }

    /// Difficulties a question may have to be served in this state.
    ///
    /// `Mastered` nominally asks for 2..=4; packs that cap at 3 still match
    /// through their difficulty-3 questions.
    pub fn allowed_difficulties(&self) -> &'static [u8] {
        match self {
            Self::Discovering => &[1, 2],
            Self::Progressing => &[1, 2, 3],
            Self::Mastered => &[2, 3, 4],
        }
    }

    pub fn allows(&self, difficulty: u8) -> bool {
        self.allowed_difficulties().contains(&difficulty)
    }
}

/// Kind of session the learner asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    #[serde(alias = "mine")]
    Practice,
    Repair,
    #[serde(alias = "craft")]
    Combine,
}

impl Default for SessionKind {
    fn default() -> Self {
        Self::Practice
    }
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Repair => "repair",
            Self::Combine => "combine",
        }
    }
}

/// Per-learner, per-skill mastery record. Only the ledger mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub skill_id: String,
    pub mastery: u8,
    pub bucket: MasteryBucket,
    pub attempts: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    /// Oldest first, at most `RECENT_RESULTS_WINDOW` entries.
    pub recent_results: Vec<bool>,
    pub streak_correct: u32,
    pub streak_wrong: u32,
    pub last_delta: i32,
    pub next_due_date: Option<NaiveDate>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SkillProgress {
    /// A skill that has never been answered.
    pub fn new(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: skill_id.into(),
            mastery: 0,
            bucket: MasteryBucket::Weak,
            attempts: 0,
            correct_answers: 0,
            wrong_answers: 0,
            recent_results: Vec::new(),
            streak_correct: 0,
            streak_wrong: 0,
            last_delta: 0,
            next_due_date: None,
            updated_at: None,
        }
    }
}

/// UI-facing counters per skill, read by the progression state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProgress {
    pub attempts: u32,
    pub correct: u32,
    /// Percentage in 0..=100.
    pub success_rate: f64,
    pub mastery_score: u8,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BlockProgress {
    /// Derive block counters from the canonical skill record.
    pub fn from_skill(skill: &SkillProgress) -> Self {
        let success_rate = if skill.attempts == 0 {
            0.0
        } else {
            skill.correct_answers as f64 / skill.attempts as f64 * 100.0
        };
        Self {
            attempts: skill.attempts,
            correct: skill.correct_answers,
            success_rate,
            mastery_score: skill.mastery,
            updated_at: skill.updated_at,
        }
    }
}

/// One answered question inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptItem {
    pub exercise_id: String,
    pub tags: Vec<String>,
    pub correct: bool,
    pub difficulty: u8,
    #[serde(default)]
    pub index: u32,
}

/// One completed session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub subject_id: String,
    pub theme_id: String,
    pub score: u32,
    pub out_of: u32,
    pub duration_sec: u32,
    pub items_count: u32,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Entry of the bounded weakest-skills list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakTag {
    pub skill_id: String,
    pub mastery: u8,
}

/// Aggregate counters per learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_answers: u64,
    pub correct_answers: u64,
    pub total_attempts: u64,
    /// Number of skills per bucket; sums to the number of tracked skills.
    pub mastery_buckets: BTreeMap<MasteryBucket, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
    pub top_weak_tags: Vec<WeakTag>,
}

impl ProgressSummary {
    pub fn bucket_count(&self, bucket: MasteryBucket) -> u32 {
        self.mastery_buckets.get(&bucket).copied().unwrap_or(0)
    }

    pub fn tracked_skills(&self) -> u32 {
        self.mastery_buckets.values().sum()
    }
}

/// Rewards and streak state per learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerStats {
    pub xp: u64,
    pub coins: u64,
    pub streak_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session_date: Option<NaiveDate>,
    pub badges: BTreeSet<String>,
}

/// Counter gating the rebuild narrative of a zone or a biome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildProgress {
    pub correct_count: u32,
    pub target: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RebuildProgress {
    pub fn zone_default() -> Self {
        Self {
            correct_count: 0,
            target: ZONE_REBUILD_TARGET,
            updated_at: None,
        }
    }

    pub fn biome_default() -> Self {
        Self {
            correct_count: 0,
            target: BIOME_REBUILD_TARGET,
            updated_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.correct_count >= self.target
    }

    /// Progress towards the target, 0.0 when the target is zero.
    pub fn ratio(&self) -> f64 {
        if self.target == 0 {
            return 0.0;
        }
        self.correct_count as f64 / self.target as f64
    }
}

/// Counter a session contributes to when it was launched as a rebuild.
///
/// A zone is a theme within one subject, so zone counters carry both ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RebuildTarget {
    Zone { subject_id: String, theme_id: String },
    Biome { subject_id: String },
}

impl RebuildTarget {
    pub fn zone(subject_id: impl Into<String>, theme_id: impl Into<String>) -> Self {
        Self::Zone {
            subject_id: subject_id.into(),
            theme_id: theme_id.into(),
        }
    }

    pub fn biome(subject_id: impl Into<String>) -> Self {
        Self::Biome {
            subject_id: subject_id.into(),
        }
    }
}

/// Kind of action a recommendation deep-links into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    RebuildZone,
    RebuildBiome,
    TagSession,
    Explore,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RebuildZone => "rebuild_zone",
            Self::RebuildBiome => "rebuild_biome",
            Self::TagSession => "tag_session",
            Self::Explore => "explore",
        }
    }
}

/// Breadcrumb of the previously shown recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAdvice {
    pub advice_id: String,
    pub action_type: ActionType,
    pub message_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names_round_trip() {
        for bucket in MasteryBucket::ALL {
            assert_eq!(MasteryBucket::from_str(bucket.as_str()), Some(bucket));
        }
        assert_eq!(MasteryBucket::from_str("unknown"), None);
    }

    #[test]
    fn mastery_state_difficulty_sets() {
        assert!(MasteryState::Discovering.allows(2));
        assert!(!MasteryState::Discovering.allows(3));
        assert!(MasteryState::Progressing.allows(3));
        assert!(!MasteryState::Mastered.allows(1));
        assert!(MasteryState::Mastered.allows(3));
    }

    #[test]
    fn block_progress_success_rate() {
        let mut skill = SkillProgress::new("s1");
        assert_eq!(BlockProgress::from_skill(&skill).success_rate, 0.0);
        skill.attempts = 4;
        skill.correct_answers = 1;
        skill.mastery = 12;
        let block = BlockProgress::from_skill(&skill);
        assert_eq!(block.success_rate, 25.0);
        assert_eq!(block.mastery_score, 12);
    }

    #[test]
    fn session_kind_accepts_aliases() {
        let kind: SessionKind = serde_json::from_str("\"mine\"").unwrap();
        assert_eq!(kind, SessionKind::Practice);
        let kind: SessionKind = serde_json::from_str("\"craft\"").unwrap();
        assert_eq!(kind, SessionKind::Combine);
    }

    #[test]
    fn rebuild_ratio_handles_zero_target() {
        let progress = RebuildProgress {
            correct_count: 5,
            target: 0,
            updated_at: None,
        };
        assert_eq!(progress.ratio(), 0.0);
        assert!(progress.is_complete());
    }

    #[test]
    fn zone_target_names_its_subject() {
        let target: RebuildTarget = serde_json::from_str(
            r#"{"kind": "zone", "subject_id": "math", "theme_id": "general"}"#,
        )
        .unwrap();
        assert_eq!(target, RebuildTarget::zone("math", "general"));
        assert_ne!(target, RebuildTarget::zone("fr", "general"));

        let target: RebuildTarget =
            serde_json::from_str(r#"{"kind": "biome", "subject_id": "fr"}"#).unwrap();
        assert_eq!(target, RebuildTarget::biome("fr"));
    }
}
