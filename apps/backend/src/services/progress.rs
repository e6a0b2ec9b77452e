//! Read models assembled from stored counters and the catalog.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use mastery_core::{BiomeProgress, CatalogLookup, MasteryState, SkillProgress};

use crate::db::Database;
use crate::error::Result;

/// Progression of one subject for a learner.
pub async fn load_biome<C: CatalogLookup + ?Sized>(
    db: &Database,
    catalog: &C,
    learner_id: Uuid,
    subject_id: &str,
) -> Result<BiomeProgress> {
    let blocks = db.get_blocks(learner_id).await?;
    let zone_rebuilds = db.get_zone_rebuilds(learner_id, subject_id).await?;
    let biome_rebuild = db.get_biome_rebuild(learner_id, subject_id).await?;

    Ok(BiomeProgress::build(
        catalog,
        subject_id,
        &blocks,
        &zone_rebuilds,
        biome_rebuild,
        Utc::now(),
    ))
}

/// Mastery score per skill.
pub fn mastery_scores(skills: &[SkillProgress]) -> HashMap<String, u8> {
    skills
        .iter()
        .map(|skill| (skill.skill_id.clone(), skill.mastery))
        .collect()
}

/// Selection state per skill, derived from the stored bucket.
pub fn mastery_states(skills: &[SkillProgress]) -> HashMap<String, MasteryState> {
    skills
        .iter()
        .map(|skill| (skill.skill_id.clone(), MasteryState::from_bucket(skill.bucket)))
        .collect()
}

/// Seed that keeps recommendations stable for a learner within a UTC day.
pub fn daily_seed(learner_id: Uuid, today: chrono::NaiveDate) -> String {
    format!("{}:{}", learner_id, today.format("%Y-%m-%d"))
}
