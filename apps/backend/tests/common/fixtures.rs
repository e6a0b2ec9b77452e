//! Test fixtures and factory functions for creating test data.

use serde_json::json;

use mastery_backend::models::Question;
use mastery_core::{SkillInfo, StaticCatalog};

pub const SUBJECT: &str = "math";

/// Small math catalog: two themes, four skills.
pub fn catalog() -> StaticCatalog {
    let skill = |id: &str, theme: &str, label: &str| SkillInfo {
        id: id.to_string(),
        subject: SUBJECT.to_string(),
        theme: theme.to_string(),
        label: label.to_string(),
    };
    StaticCatalog::new(
        vec![SUBJECT.to_string(), "fr".to_string()],
        vec![
            skill("math-add-10", "addition", "Add within 10"),
            skill("math-add-20", "addition", "Add within 20"),
            skill("math-sub-10", "subtraction", "Subtract within 10"),
            skill("math-sub-20", "subtraction", "Subtract within 20"),
        ],
    )
}

/// One answered item.
pub fn item(exercise_id: &str, tags: &[&str], correct: bool, difficulty: u8, index: u32) -> serde_json::Value {
    json!({
        "exercise_id": exercise_id,
        "tags": tags,
        "correct": correct,
        "difficulty": difficulty,
        "index": index,
    })
}

/// `count` items on one skill, all with the same result.
pub fn items(skill_id: &str, count: u32, correct: bool, difficulty: u8) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| item(&format!("{}-ex{}", skill_id, i), &[skill_id], correct, difficulty, i))
        .collect()
}

/// Session request body.
pub fn session_request(theme_id: &str, items: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "subject_id": SUBJECT,
        "theme_id": theme_id,
        "items": items,
        "duration_sec": 60,
    })
}

/// Question with a prompt payload.
pub fn question(id: &str, tags: &[&str], difficulty: u8) -> Question {
    serde_json::from_value(json!({
        "id": id,
        "tags": tags,
        "difficulty": difficulty,
        "prompt": format!("Prompt for {}", id),
    }))
    .expect("valid question")
}

/// Question ids namespaced per test run so parallel tests never collide.
pub fn question_id(prefix: &str, n: usize) -> String {
    format!("{}-{}", prefix, n)
}
