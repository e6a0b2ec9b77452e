//! Mastery ledger planning.
//!
//! The store owns the transaction: it reads a [`LedgerSnapshot`] for the
//! learner, calls [`plan_session`], then writes every row of the returned
//! [`SessionPlan`] before committing. Nothing here performs I/O, so the same
//! plan can be recomputed from fresh reads whenever the store retries.

use crate::scheduler::{bucket_of, next_due_date};
use crate::types::{
    Attempt, AttemptItem, BlockProgress, LearnerStats, MasteryBucket, ProgressSummary,
    RebuildProgress, RebuildTarget, SkillProgress, WeakTag, MAX_TAGS_PER_ITEM,
    RECENT_RESULTS_WINDOW,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const BADGE_STREAK_3: &str = "streak_3";
pub const BADGE_STREAK_7: &str = "streak_7";
pub const BADGE_PERFECT_10: &str = "perfect_10";

/// Bound of `ProgressSummary::top_weak_tags`.
pub const TOP_WEAK_TAGS: usize = 5;

const XP_PER_CORRECT: u32 = 10;
const MAX_COINS: u32 = 3;
const PERFECT_BADGE_MIN_ITEMS: u32 = 10;

/// Mastery change for one answer at a given difficulty.
pub fn mastery_delta(difficulty: u8, correct: bool) -> i32 {
    match (difficulty.clamp(1, 3), correct) {
        (1, true) => 3,
        (1, false) => -1,
        (2, true) => 5,
        (2, false) => -2,
        (_, true) => 7,
        (_, false) => -3,
    }
}

/// Reference instants for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl SessionClock {
    /// Clock whose calendar day is the UTC date of `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            today: now.date_naive(),
            now,
        }
    }
}

fn default_persist_attempt() -> bool {
    true
}

/// A graded session submitted to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInput {
    pub subject_id: String,
    pub theme_id: String,
    pub items: Vec<AttemptItem>,
    #[serde(default)]
    pub duration_sec: u32,
    /// `false` skips the attempt rows (dry-run or replay).
    #[serde(default = "default_persist_attempt")]
    pub persist_attempt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebuild: Option<RebuildTarget>,
}

impl SessionInput {
    /// Items in chronological order with tags deduplicated and capped, and
    /// difficulty clamped to 1..=3.
    pub fn normalized_items(&self) -> Vec<AttemptItem> {
        let mut items: Vec<AttemptItem> = self
            .items
            .iter()
            .map(|item| {
                let mut tags: Vec<String> = Vec::with_capacity(MAX_TAGS_PER_ITEM);
                for tag in &item.tags {
                    if tags.len() == MAX_TAGS_PER_ITEM {
                        break;
                    }
                    if !tag.is_empty() && !tags.contains(tag) {
                        tags.push(tag.clone());
                    }
                }
                AttemptItem {
                    exercise_id: item.exercise_id.clone(),
                    tags,
                    correct: item.correct,
                    difficulty: item.difficulty.clamp(1, 3),
                    index: item.index,
                }
            })
            .collect();
        items.sort_by_key(|item| item.index);
        items
    }

    /// Skill ids the session touches; these are the rows the store must read.
    pub fn skill_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .normalized_items()
            .into_iter()
            .flat_map(|item| item.tags)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Everything the ledger reads before computing a session.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub stats: LearnerStats,
    pub summary: ProgressSummary,
    /// Current progress of the touched skills; absent means never answered.
    pub skills: HashMap<String, SkillProgress>,
    /// Current value of the rebuild counter named by the session, if any.
    pub rebuild: Option<RebuildProgress>,
}

impl LedgerSnapshot {
    /// Fold a committed plan back into the snapshot.
    pub fn apply(&mut self, plan: &SessionPlan) {
        self.stats = plan.stats.clone();
        self.summary = plan.summary.clone();
        for skill in &plan.skills {
            self.skills.insert(skill.skill_id.clone(), skill.clone());
        }
        if let Some((_, progress)) = &plan.rebuild {
            self.rebuild = Some(progress.clone());
        }
    }
}

/// Result returned to the caller of `record_session`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub xp_gain: u32,
    pub coins_gain: u32,
    pub streak_days: u32,
    /// Full badge set after this session.
    pub badges: Vec<String>,
    /// Badges unlocked by this session only.
    pub new_badges: Vec<String>,
    pub score: u32,
    pub out_of: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
}

/// Attempt row plus its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt: Attempt,
    pub items: Vec<AttemptItem>,
}

/// Every write produced by one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub outcome: SessionOutcome,
    pub attempt: Option<AttemptRecord>,
    pub skills: Vec<SkillProgress>,
    pub blocks: Vec<(String, BlockProgress)>,
    pub stats: LearnerStats,
    pub summary: ProgressSummary,
    pub rebuild: Option<(RebuildTarget, RebuildProgress)>,
}

impl SkillProgress {
    /// Apply a batch of chronological results for this skill.
    ///
    /// This is the only place mastery changes, and the bucket and due date are
    /// always recomputed from the new mastery.
    pub fn record(&mut self, results: &[bool], delta: i32, clock: SessionClock) {
        let correct = results.iter().filter(|r| **r).count() as u32;
        self.attempts += results.len() as u32;
        self.correct_answers += correct;
        self.wrong_answers += results.len() as u32 - correct;

        for &result in results {
            self.recent_results.push(result);
            if result {
                self.streak_correct += 1;
                self.streak_wrong = 0;
            } else {
                self.streak_wrong += 1;
                self.streak_correct = 0;
            }
        }
        if self.recent_results.len() > RECENT_RESULTS_WINDOW {
            let overflow = self.recent_results.len() - RECENT_RESULTS_WINDOW;
            self.recent_results.drain(..overflow);
        }

        self.mastery = (self.mastery as i32 + delta).clamp(0, 100) as u8;
        self.bucket = bucket_of(self.mastery);
        self.last_delta = delta;
        self.next_due_date = Some(next_due_date(self.mastery, self.bucket, clock.today));
        self.updated_at = Some(clock.now);
    }
}

#[derive(Debug, Default)]
struct SkillBatch {
    results: Vec<bool>,
    delta: i32,
}

/// Compute the writes for one session from the snapshot.
///
/// Returns `None` for an empty session: nothing is written and the caller
/// reports `SessionOutcome::default()`.
pub fn plan_session(
    snapshot: &LedgerSnapshot,
    input: &SessionInput,
    attempt_id: &str,
    clock: SessionClock,
) -> Option<SessionPlan> {
    let items = input.normalized_items();
    if items.is_empty() {
        return None;
    }

    let out_of = items.len() as u32;
    let score = items.iter().filter(|item| item.correct).count() as u32;

    let mut batches: BTreeMap<&str, SkillBatch> = BTreeMap::new();
    for item in &items {
        for tag in &item.tags {
            let batch = batches.entry(tag.as_str()).or_default();
            batch.results.push(item.correct);
            batch.delta += mastery_delta(item.difficulty, item.correct);
        }
    }

    let mut summary = snapshot.summary.clone();
    let mut skills = Vec::with_capacity(batches.len());
    let mut blocks = Vec::with_capacity(batches.len());
    for (skill_id, batch) in &batches {
        let previous = snapshot.skills.get(*skill_id);
        let mut progress = previous
            .cloned()
            .unwrap_or_else(|| SkillProgress::new(*skill_id));
        progress.record(&batch.results, batch.delta, clock);

        match previous {
            Some(old) if old.bucket != progress.bucket => {
                decrement(&mut summary.mastery_buckets, old.bucket);
                increment(&mut summary.mastery_buckets, progress.bucket);
            }
            Some(_) => {}
            None => increment(&mut summary.mastery_buckets, progress.bucket),
        }

        blocks.push((progress.skill_id.clone(), BlockProgress::from_skill(&progress)));
        skills.push(progress);
    }

    let mut stats = snapshot.stats.clone();
    stats.streak_days = next_streak(&snapshot.stats, clock.today);
    stats.last_session_date = Some(clock.today);
    let xp_gain = score * XP_PER_CORRECT;
    let coins_gain = coins_for(score, out_of);
    stats.xp += xp_gain as u64;
    stats.coins += coins_gain as u64;

    let mut new_badges = Vec::new();
    for badge in unlocked_badges(stats.streak_days, score, out_of) {
        if stats.badges.insert(badge.to_string()) {
            new_badges.push(badge.to_string());
        }
    }

    summary.total_answers += out_of as u64;
    summary.correct_answers += score as u64;
    summary.total_attempts += 1;
    summary.last_date = Some(clock.today);
    if input.persist_attempt {
        summary.last_attempt_id = Some(attempt_id.to_string());
    }
    summary.top_weak_tags = merge_weak_tags(&summary.top_weak_tags, &skills);

    let attempt = input.persist_attempt.then(|| AttemptRecord {
        attempt: Attempt {
            id: attempt_id.to_string(),
            subject_id: input.subject_id.clone(),
            theme_id: input.theme_id.clone(),
            score,
            out_of,
            duration_sec: input.duration_sec,
            items_count: out_of,
            date: clock.today,
            created_at: clock.now,
        },
        items: items.clone(),
    });

    let rebuild = input.rebuild.as_ref().map(|target| {
        let mut progress = snapshot.rebuild.clone().unwrap_or_else(|| match target {
            RebuildTarget::Zone { .. } => RebuildProgress::zone_default(),
            RebuildTarget::Biome { .. } => RebuildProgress::biome_default(),
        });
        progress.correct_count += score;
        progress.updated_at = Some(clock.now);
        (target.clone(), progress)
    });

    let outcome = SessionOutcome {
        xp_gain,
        coins_gain,
        streak_days: stats.streak_days,
        badges: stats.badges.iter().cloned().collect(),
        new_badges,
        score,
        out_of,
        attempt_id: attempt.as_ref().map(|record| record.attempt.id.clone()),
    };

    Some(SessionPlan {
        outcome,
        attempt,
        skills,
        blocks,
        stats,
        summary,
        rebuild,
    })
}

fn increment(histogram: &mut BTreeMap<MasteryBucket, u32>, bucket: MasteryBucket) {
    *histogram.entry(bucket).or_insert(0) += 1;
}

fn decrement(histogram: &mut BTreeMap<MasteryBucket, u32>, bucket: MasteryBucket) {
    if let Some(count) = histogram.get_mut(&bucket) {
        *count = count.saturating_sub(1);
    }
}

fn next_streak(stats: &LearnerStats, today: NaiveDate) -> u32 {
    match stats.last_session_date {
        Some(last) if last == today => stats.streak_days,
        Some(last) if last + Duration::days(1) == today => stats.streak_days + 1,
        _ => 1,
    }
}

fn coins_for(score: u32, out_of: u32) -> u32 {
    if out_of == 0 {
        return 1;
    }
    let ratio = score as f64 / out_of as f64;
    ((ratio * MAX_COINS as f64).round() as u32).clamp(1, MAX_COINS)
}

fn unlocked_badges(streak_days: u32, score: u32, out_of: u32) -> Vec<&'static str> {
    let mut badges = Vec::new();
    if streak_days >= 3 {
        badges.push(BADGE_STREAK_3);
    }
    if streak_days >= 7 {
        badges.push(BADGE_STREAK_7);
    }
    if score == out_of && out_of >= PERFECT_BADGE_MIN_ITEMS {
        badges.push(BADGE_PERFECT_10);
    }
    badges
}

fn merge_weak_tags(previous: &[WeakTag], updated: &[SkillProgress]) -> Vec<WeakTag> {
    let mut merged: BTreeMap<String, u8> = previous
        .iter()
        .map(|tag| (tag.skill_id.clone(), tag.mastery))
        .collect();
    for skill in updated {
        merged.insert(skill.skill_id.clone(), skill.mastery);
    }

    let mut weak: Vec<WeakTag> = merged
        .into_iter()
        .filter(|(_, mastery)| bucket_of(*mastery) < MasteryBucket::Nearly)
        .map(|(skill_id, mastery)| WeakTag { skill_id, mastery })
        .collect();
    weak.sort_by(|a, b| a.mastery.cmp(&b.mastery).then_with(|| a.skill_id.cmp(&b.skill_id)));
    weak.truncate(TOP_WEAK_TAGS);
    weak
}
