//! Skill catalog lookup.
//!
//! Catalogs evolve independently of stored progress, so unknown skill ids are
//! never an error: they get a synthesized label and an inferred subject.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Subject used when nothing can be inferred from a skill id.
pub const DEFAULT_SUBJECT: &str = "fr";

/// Theme used for skills missing from the catalog.
pub const DEFAULT_THEME: &str = "general";

/// Display metadata for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: String,
    pub subject: String,
    pub theme: String,
    pub label: String,
}

/// Maps skill ids to their subject, theme and label.
pub trait CatalogLookup: Send + Sync {
    /// Catalog entry, if the skill is known.
    fn find(&self, skill_id: &str) -> Option<SkillInfo>;

    /// Known subject ids.
    fn subjects(&self) -> Vec<String>;

    /// Known skills of a subject, in catalog order.
    fn skills_in_subject(&self, subject: &str) -> Vec<SkillInfo>;

    /// Catalog entry or a synthesized one for unknown ids.
    fn lookup(&self, skill_id: &str) -> SkillInfo {
        self.find(skill_id)
            .unwrap_or_else(|| fallback_skill(skill_id, &self.subjects()))
    }
}

/// Synthesize display metadata for a skill the catalog does not know.
pub fn fallback_skill(skill_id: &str, known_subjects: &[String]) -> SkillInfo {
    let (prefix, rest) = match skill_id.find(['-', '_', '.']) {
        Some(at) => (&skill_id[..at], &skill_id[at + 1..]),
        None => ("", skill_id),
    };

    let subject = if !prefix.is_empty() && known_subjects.iter().any(|s| s == prefix) {
        prefix.to_string()
    } else {
        DEFAULT_SUBJECT.to_string()
    };

    let label_source = if subject == prefix { rest } else { skill_id };
    SkillInfo {
        id: skill_id.to_string(),
        subject,
        theme: DEFAULT_THEME.to_string(),
        label: humanize(label_source),
    }
}

pub(crate) fn humanize(raw: &str) -> String {
    let words: Vec<&str> = raw
        .split(['-', '_', '.'])
        .filter(|word| !word.is_empty())
        .collect();
    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => raw.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    subjects: Vec<String>,
    skills: Vec<SkillInfo>,
}

/// In-memory catalog, usually loaded from a JSON document.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    subjects: Vec<String>,
    skills: Vec<SkillInfo>,
    index: HashMap<String, usize>,
}

impl StaticCatalog {
    pub fn new(subjects: Vec<String>, skills: Vec<SkillInfo>) -> Self {
        let mut subjects = subjects;
        for skill in &skills {
            if !subjects.contains(&skill.subject) {
                subjects.push(skill.subject.clone());
            }
        }
        let index = skills
            .iter()
            .enumerate()
            .map(|(i, skill)| (skill.id.clone(), i))
            .collect();
        Self {
            subjects,
            skills,
            index,
        }
    }

    /// Parse `{ "subjects": [...], "skills": [{id, subject, theme, label}] }`.
    pub fn from_json(content: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        Ok(Self::new(document.subjects, document.skills))
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl CatalogLookup for StaticCatalog {
    fn find(&self, skill_id: &str) -> Option<SkillInfo> {
        self.index.get(skill_id).map(|&i| self.skills[i].clone())
    }

    fn subjects(&self) -> Vec<String> {
        self.subjects.clone()
    }

    fn skills_in_subject(&self, subject: &str) -> Vec<SkillInfo> {
        self.skills
            .iter()
            .filter(|skill| skill.subject == subject)
            .cloned()
            .collect()
    }
}
