//! Question selection for a session.
//!
//! Ranks a candidate pool against a target skill, the learner's mastery and
//! answer history, then fills the session according to its kind.

use crate::types::{MasteryState, SessionKind};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// History entries considered when deciding whether a skill needs repair.
pub const REPAIR_WINDOW: usize = 10;
/// Wrong answers within the repair window that trigger repair.
pub const REPAIR_WRONG_THRESHOLD: usize = 4;
/// Most recent answers (any skill) penalized as "just seen".
pub const RECENT_QUESTIONS: usize = 10;

const SCORE_TARGET: i32 = 100;
const SCORE_SECONDARY: i32 = 30;
const SCORE_UNSEEN: i32 = 20;
const SCORE_FEW_ANSWERS: i32 = 10;
const SCORE_RETRY_WRONG: i32 = 15;
const SCORE_RECENT: i32 = -50;
const SCORE_SAME_DAY: i32 = -20;
const SCORE_REPAIR_WRONG: i32 = 25;

const REPAIR_TARGET_SHARE: f64 = 0.9;
const PRACTICE_TARGET_SHARE: f64 = 0.8;

/// A question-like record from the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub difficulty: u8,
    /// Provider-specific fields carried through untouched.
    #[serde(flatten)]
    pub content: serde_json::Map<String, serde_json::Value>,
}

impl Question {
    pub fn has_tag(&self, skill_id: &str) -> bool {
        self.tags.iter().any(|tag| tag == skill_id)
    }

    fn has_any_tag(&self, skill_ids: &[String]) -> bool {
        skill_ids.iter().any(|skill| self.has_tag(skill))
    }
}

/// One past answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Parameters of one selection.
#[derive(Debug, Clone)]
pub struct SelectionRequest<'a> {
    pub target_skill: &'a str,
    pub secondary_skills: &'a [String],
    pub session_kind: SessionKind,
    pub desired_count: usize,
    pub mastery: &'a HashMap<String, MasteryState>,
    pub history: &'a [AnswerRecord],
    pub now: DateTime<Utc>,
}

/// Ordered questions plus the session kind actually used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub session_kind: SessionKind,
    pub needs_repair: bool,
    pub questions: Vec<Question>,
}

/// Whether the learner's recent answers on `skill_id` call for repair.
///
/// Looks at the `REPAIR_WINDOW` most recent answers tagged with the skill:
/// too many wrong answers, or two wrong answers in a row, both qualify.
pub fn needs_repair(skill_id: &str, history: &[AnswerRecord]) -> bool {
    let mut touching: Vec<&AnswerRecord> = history
        .iter()
        .filter(|record| record.tags.iter().any(|tag| tag == skill_id))
        .collect();
    touching.sort_by(|a, b| b.answered_at.cmp(&a.answered_at));
    touching.truncate(REPAIR_WINDOW);

    let wrong = touching.iter().filter(|record| !record.correct).count();
    if wrong >= REPAIR_WRONG_THRESHOLD {
        return true;
    }
    touching
        .windows(2)
        .any(|pair| !pair[0].correct && !pair[1].correct)
}

/// Session kind after the silent practice -> repair upgrade.
pub fn effective_session_kind(requested: SessionKind, repair_needed: bool) -> SessionKind {
    match requested {
        SessionKind::Practice if repair_needed => SessionKind::Repair,
        other => other,
    }
}

#[derive(Debug, Default)]
struct QuestionHistory {
    answers: usize,
    last_answered: Option<DateTime<Utc>>,
    old_wrong: bool,
    wrong_on_target: bool,
}

struct Ranked {
    question: Question,
    score: i32,
}

/// Rank `pool` and pick up to `desired_count` questions.
///
/// An empty pool or a zero count yields an empty selection.
pub fn select(pool: &[Question], request: &SelectionRequest<'_>) -> Selection {
    let repair_needed = needs_repair(request.target_skill, request.history);
    let session_kind = effective_session_kind(request.session_kind, repair_needed);

    let state = request
        .mastery
        .get(request.target_skill)
        .copied()
        .unwrap_or_default();

    let ranked = rank(pool, request, state, session_kind);
    let questions = if request.desired_count == 0 {
        Vec::new()
    } else {
        fill(ranked, request, session_kind)
    };

    Selection {
        session_kind,
        needs_repair: repair_needed,
        questions,
    }
}

fn rank(
    pool: &[Question],
    request: &SelectionRequest<'_>,
    state: MasteryState,
    session_kind: SessionKind,
) -> Vec<Ranked> {
    // Later duplicates replace earlier ones but keep the first position.
    let mut order: Vec<Question> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for question in pool.iter().filter(|q| state.allows(q.difficulty)) {
        match positions.get(question.id.as_str()) {
            Some(&at) => order[at] = question.clone(),
            None => {
                positions.insert(question.id.as_str(), order.len());
                order.push(question.clone());
            }
        }
    }

    let mut recent_answers: Vec<&AnswerRecord> = request.history.iter().collect();
    recent_answers.sort_by(|a, b| b.answered_at.cmp(&a.answered_at));
    let recent_ids: HashSet<&str> = recent_answers
        .iter()
        .take(RECENT_QUESTIONS)
        .map(|record| record.question_id.as_str())
        .collect();

    let retry_cutoff = request.now - Duration::minutes(30);
    let mut per_question: HashMap<&str, QuestionHistory> = HashMap::new();
    for record in request.history {
        let entry = per_question.entry(record.question_id.as_str()).or_default();
        entry.answers += 1;
        if entry.last_answered.map_or(true, |at| record.answered_at > at) {
            entry.last_answered = Some(record.answered_at);
        }
        if !record.correct {
            if record.answered_at < retry_cutoff {
                entry.old_wrong = true;
            }
            if record.tags.iter().any(|tag| tag == request.target_skill) {
                entry.wrong_on_target = true;
            }
        }
    }

    let same_day_cutoff = request.now - Duration::hours(24);
    let mut ranked: Vec<Ranked> = order
        .into_iter()
        .map(|question| {
            let mut score = 0;
            if question.has_tag(request.target_skill) {
                score += SCORE_TARGET;
            }
            if question.has_any_tag(request.secondary_skills) {
                score += SCORE_SECONDARY;
            }

            match per_question.get(question.id.as_str()) {
                None => score += SCORE_UNSEEN,
                Some(seen) => {
                    if (1..=2).contains(&seen.answers) {
                        score += SCORE_FEW_ANSWERS;
                    }
                    if seen.old_wrong {
                        score += SCORE_RETRY_WRONG;
                    }
                    if seen.last_answered.map_or(false, |at| at > same_day_cutoff) {
                        score += SCORE_SAME_DAY;
                    }
                    if session_kind == SessionKind::Repair && seen.wrong_on_target {
                        score += SCORE_REPAIR_WRONG;
                    }
                }
            }
            if recent_ids.contains(question.id.as_str()) {
                score += SCORE_RECENT;
            }

            Ranked { question, score }
        })
        .collect();

    // Stable: equal scores keep pool order.
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

struct Picker {
    desired: usize,
    taken: HashSet<String>,
    picked: Vec<Question>,
}

impl Picker {
    fn new(desired: usize) -> Self {
        Self {
            desired,
            taken: HashSet::new(),
            picked: Vec::with_capacity(desired),
        }
    }

    fn is_full(&self) -> bool {
        self.picked.len() >= self.desired
    }

    /// Take one question unless it is already picked; returns whether it was taken.
    fn take(&mut self, question: &Question) -> bool {
        if self.is_full() || self.taken.contains(&question.id) {
            return false;
        }
        self.taken.insert(question.id.clone());
        self.picked.push(question.clone());
        true
    }

    fn take_up_to<'a>(&mut self, limit: usize, from: impl IntoIterator<Item = &'a Question>) {
        let mut count = 0;
        for question in from {
            if count >= limit || self.is_full() {
                break;
            }
            if self.take(question) {
                count += 1;
            }
        }
    }
}

fn fill(ranked: Vec<Ranked>, request: &SelectionRequest<'_>, session_kind: SessionKind) -> Vec<Question> {
    let all: Vec<&Question> = ranked.iter().map(|r| &r.question).collect();
    let target = request.target_skill;
    let secondary = request.secondary_skills;
    let mut picker = Picker::new(request.desired_count);

    match session_kind {
        SessionKind::Repair | SessionKind::Practice => {
            let share = if session_kind == SessionKind::Repair {
                REPAIR_TARGET_SHARE
            } else {
                PRACTICE_TARGET_SHARE
            };
            let target_quota = ((request.desired_count as f64 * share).round() as usize)
                .min(request.desired_count);

            let (on_target, others): (Vec<&Question>, Vec<&Question>) =
                all.iter().copied().partition(|q| q.has_tag(target));
            picker.take_up_to(target_quota, on_target.iter().copied());
            picker.take_up_to(usize::MAX, others.iter().copied());
            picker.take_up_to(usize::MAX, on_target.iter().copied());
        }
        SessionKind::Combine => {
            let both: Vec<&Question> = all
                .iter()
                .copied()
                .filter(|q| q.has_tag(target) && q.has_any_tag(secondary))
                .collect();
            let target_only: Vec<&Question> = all
                .iter()
                .copied()
                .filter(|q| q.has_tag(target) && !q.has_any_tag(secondary))
                .collect();
            let secondary_only: Vec<&Question> = all
                .iter()
                .copied()
                .filter(|q| !q.has_tag(target) && q.has_any_tag(secondary))
                .collect();

            picker.take_up_to(usize::MAX, both.iter().copied());

            let mut left = target_only.iter();
            let mut right = secondary_only.iter();
            loop {
                if picker.is_full() {
                    break;
                }
                let a = left.next();
                let b = right.next();
                if a.is_none() && b.is_none() {
                    break;
                }
                if let Some(q) = a {
                    picker.take(q);
                }
                if let Some(q) = b {
                    picker.take(q);
                }
            }
        }
    }

    picker.take_up_to(usize::MAX, all.iter().copied());
    picker.picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn question(id: &str, tags: &[&str], difficulty: u8) -> Question {
        Question {
            id: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            difficulty,
            content: serde_json::Map::new(),
        }
    }

    fn answer(id: &str, tags: &[&str], correct: bool, minutes_ago: i64) -> AnswerRecord {
        AnswerRecord {
            question_id: id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            correct,
            answered_at: now() - Duration::minutes(minutes_ago),
        }
    }

    fn request<'a>(
        target: &'a str,
        secondary: &'a [String],
        kind: SessionKind,
        count: usize,
        mastery: &'a HashMap<String, MasteryState>,
        history: &'a [AnswerRecord],
    ) -> SelectionRequest<'a> {
        SelectionRequest {
            target_skill: target,
            secondary_skills: secondary,
            session_kind: kind,
            desired_count: count,
            mastery,
            history,
            now: now(),
        }
    }

    fn ids(selection: &Selection) -> Vec<&str> {
        selection.questions.iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn repair_needed_after_four_wrong() {
        let history = vec![
            answer("q1", &["s1"], false, 100),
            answer("q2", &["s1"], true, 90),
            answer("q3", &["s1"], false, 80),
            answer("q4", &["s1"], true, 70),
            answer("q5", &["s1"], false, 60),
            answer("q6", &["s1"], true, 50),
            answer("q7", &["s1"], false, 40),
            answer("q8", &["s1"], true, 30),
        ];
        assert!(needs_repair("s1", &history));
    }

    #[test]
    fn three_scattered_wrong_do_not_need_repair() {
        let history = vec![
            answer("q1", &["s1"], false, 100),
            answer("q2", &["s1"], true, 90),
            answer("q3", &["s1"], false, 80),
            answer("q4", &["s1"], true, 70),
            answer("q5", &["s1"], false, 60),
            answer("q6", &["s1"], true, 50),
        ];
        assert!(!needs_repair("s1", &history));
    }

    #[test]
    fn adjacent_wrong_answers_need_repair() {
        let history = vec![
            answer("q1", &["s1"], true, 30),
            answer("q2", &["s1"], false, 20),
            answer("other", &["s2"], true, 15),
            answer("q3", &["s1"], false, 10),
        ];
        assert!(needs_repair("s1", &history));
    }

    #[test]
    fn repair_window_ignores_old_mistakes() {
        let mut history = vec![
            answer("old1", &["s1"], false, 500),
            answer("old2", &["s1"], false, 490),
        ];
        for i in 0..10 {
            history.push(answer(&format!("q{}", i), &["s1"], true, 100 - i));
        }
        assert!(!needs_repair("s1", &history));
    }

    #[test]
    fn empty_pool_yields_empty_selection() {
        let mastery = HashMap::new();
        let selection = select(&[], &request("s1", &[], SessionKind::Practice, 5, &mastery, &[]));
        assert!(selection.questions.is_empty());
    }

    #[test]
    fn difficulty_follows_mastery_state() {
        let pool = vec![
            question("d1", &["s1"], 1),
            question("d2", &["s1"], 2),
            question("d3", &["s1"], 3),
            question("d4", &["s1"], 4),
        ];
        let mut mastery = HashMap::new();
        let discovering = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &[]));
        assert_eq!(ids(&discovering), vec!["d1", "d2"]);

        mastery.insert("s1".to_string(), MasteryState::Mastered);
        let mastered = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &[]));
        assert_eq!(ids(&mastered), vec!["d2", "d3", "d4"]);
    }

    #[test]
    fn duplicates_keep_last_version() {
        let mut replacement = question("q1", &["s1"], 2);
        replacement
            .content
            .insert("prompt".to_string(), serde_json::json!("new"));
        let pool = vec![question("q1", &["s1"], 1), question("q2", &["s1"], 1), replacement];
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &[]));
        assert_eq!(ids(&selection), vec!["q1", "q2"]);
        assert_eq!(selection.questions[0].difficulty, 2);
    }

    #[test]
    fn practice_prefers_target_then_others() {
        let mut pool = Vec::new();
        for i in 0..10 {
            pool.push(question(&format!("t{}", i), &["s1"], 1));
            pool.push(question(&format!("o{}", i), &["s2"], 1));
        }
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &[]));
        let picked = ids(&selection);
        assert_eq!(picked.len(), 10);
        assert_eq!(picked.iter().filter(|id| id.starts_with('t')).count(), 8);
        assert_eq!(&picked[..8], &["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7"]);
    }

    #[test]
    fn practice_upgrades_to_repair() {
        let mut pool = Vec::new();
        for i in 0..10 {
            pool.push(question(&format!("t{}", i), &["s1"], 1));
            pool.push(question(&format!("o{}", i), &["s2"], 1));
        }
        let history = vec![answer("x", &["s1"], false, 5), answer("y", &["s1"], false, 4)];
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &history));
        assert_eq!(selection.session_kind, SessionKind::Repair);
        assert!(selection.needs_repair);
        assert_eq!(selection.questions.iter().filter(|q| q.has_tag("s1")).count(), 9);
    }

    #[test]
    fn backfills_when_target_pool_is_short() {
        let pool = vec![
            question("t1", &["s1"], 1),
            question("o1", &["s2"], 1),
            question("o2", &["s2"], 1),
            question("o3", &["s2"], 1),
        ];
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 3, &mastery, &[]));
        assert_eq!(ids(&selection), vec!["t1", "o1", "o2"]);
    }

    #[test]
    fn practice_on_target_only_pool_fills_every_slot() {
        let pool: Vec<Question> = (0..12)
            .map(|i| question(&format!("t{}", i), &["s1"], 1))
            .collect();
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 10, &mastery, &[]));
        assert_eq!(selection.questions.len(), 10);
        assert!(selection.questions.iter().all(|q| q.has_tag("s1")));
    }

    #[test]
    fn recently_seen_questions_sink() {
        let pool = vec![question("seen", &["s1"], 1), question("fresh", &["s1"], 1)];
        let history = vec![answer("seen", &["s1"], true, 5)];
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Practice, 2, &mastery, &history));
        assert_eq!(ids(&selection), vec!["fresh", "seen"]);
    }

    #[test]
    fn old_mistakes_rise_in_repair() {
        let pool = vec![question("clean", &["s1"], 1), question("missed", &["s1"], 1)];
        let mut history = vec![answer("missed", &["s1"], false, 3 * 24 * 60)];
        // Push "missed" out of the recent window and away from repair triggers.
        for i in 0..12 {
            history.push(answer(&format!("filler{}", i), &["s9"], true, 60 + i));
        }
        history.push(answer("clean", &["s1"], true, 2 * 24 * 60));
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &[], SessionKind::Repair, 2, &mastery, &history));
        // missed: 100 + 10 + 15 + 25, clean: 100 + 10
        assert_eq!(ids(&selection), vec!["missed", "clean"]);
    }

    #[test]
    fn combine_starts_with_questions_tagged_with_both() {
        let secondary = vec!["s2".to_string()];
        let pool = vec![
            question("t1", &["s1"], 1),
            question("t2", &["s1"], 1),
            question("b1", &["s1", "s2"], 1),
            question("s1x", &["s2"], 1),
            question("s2x", &["s2"], 1),
            question("n1", &["s3"], 1),
        ];
        let mastery = HashMap::new();
        let selection = select(&pool, &request("s1", &secondary, SessionKind::Combine, 5, &mastery, &[]));
        assert_eq!(ids(&selection), vec!["b1", "t1", "s1x", "t2", "s2x"]);
    }

    #[test]
    fn never_exceeds_count_or_repeats() {
        let mut pool = Vec::new();
        for i in 0..30 {
            pool.push(question(&format!("q{}", i % 12), &["s1"], (i % 3 + 1) as u8));
        }
        let mut mastery = HashMap::new();
        mastery.insert("s1".to_string(), MasteryState::Progressing);
        for count in [0usize, 1, 5, 12, 40] {
            for kind in [SessionKind::Practice, SessionKind::Repair, SessionKind::Combine] {
                let selection = select(&pool, &request("s1", &[], kind, count, &mastery, &[]));
                assert!(selection.questions.len() <= count);
                let unique: HashSet<&str> = selection.questions.iter().map(|q| q.id.as_str()).collect();
                assert_eq!(unique.len(), selection.questions.len());
                assert!(selection.questions.iter().all(|q| MasteryState::Progressing.allows(q.difficulty)));
            }
        }
    }
}
