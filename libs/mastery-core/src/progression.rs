//! Visual progression states derived from block counters.
//!
//! Three nested levels: a skill, a zone (skills sharing a theme) and a biome
//! (zones sharing a subject). Nothing here is stored; every state is recomputed
//! from `BlockProgress` and the rebuild counters on each read.

use crate::catalog::CatalogLookup;
use crate::types::{BlockProgress, RebuildProgress};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A skill untouched for longer than this is weathered.
pub const WEATHERING_DAYS: i64 = 14;

pub const BEAUTIFIED_MASTERY: u8 = 80;
pub const CRACKED_SUCCESS_RATE: f64 = 40.0;

pub const FRAGILE_THRESHOLD: f64 = 70.0;
pub const STABLE_THRESHOLD: f64 = 80.0;
pub const RECOVERING_THRESHOLD: f64 = 40.0;

/// Share of rebuilt zones that makes a biome ready for its own rebuild.
pub const BIOME_READY_ZONE_PCT: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillState {
    Locked,
    Cracked,
    Repaired,
    Beautified,
}

impl SkillState {
    pub fn of(block: Option<&BlockProgress>) -> Self {
        match block {
            None => Self::Locked,
            Some(block) if block.attempts == 0 => Self::Locked,
            Some(block) if block.mastery_score >= BEAUTIFIED_MASTERY => Self::Beautified,
            Some(block) if block.success_rate < CRACKED_SUCCESS_RATE => Self::Cracked,
            Some(_) => Self::Repaired,
        }
    }

    pub fn is_fragile(&self) -> bool {
        matches!(self, Self::Locked | Self::Cracked)
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Repaired | Self::Beautified)
    }
}

/// Weathering is independent of the four skill states.
pub fn is_weathered(block: Option<&BlockProgress>, now: DateTime<Utc>) -> bool {
    block
        .and_then(|block| block.updated_at)
        .map(|updated_at| now - updated_at > Duration::days(WEATHERING_DAYS))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillView {
    pub skill_id: String,
    pub label: String,
    pub state: SkillState,
    pub weathered: bool,
}

impl SkillView {
    pub fn new(
        skill_id: impl Into<String>,
        label: impl Into<String>,
        block: Option<&BlockProgress>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            skill_id: skill_id.into(),
            label: label.into(),
            state: SkillState::of(block),
            weathered: is_weathered(block, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    Ruins,
    Building,
    RebuiltReady,
    Rebuilding,
    Rebuilt,
}

impl ZoneState {
    pub fn classify(fragile_pct: f64, stable_pct: f64, rebuild: &RebuildProgress) -> Self {
        if rebuild.is_complete() {
            Self::Rebuilt
        } else if rebuild.correct_count > 0 {
            Self::Rebuilding
        } else if fragile_pct >= FRAGILE_THRESHOLD {
            Self::Ruins
        } else if stable_pct >= STABLE_THRESHOLD {
            Self::RebuiltReady
        } else {
            Self::Building
        }
    }
}

/// Fragile and stable percentages over a set of skills. Empty sets are 0/0.
fn shares<'a>(skills: impl IntoIterator<Item = &'a SkillView>) -> (f64, f64) {
    let (mut total, mut fragile, mut stable) = (0usize, 0usize, 0usize);
    for skill in skills {
        total += 1;
        if skill.state.is_fragile() {
            fragile += 1;
        } else if skill.state.is_stable() {
            stable += 1;
        }
    }
    if total == 0 {
        return (0.0, 0.0);
    }
    let pct = |count: usize| count as f64 / total as f64 * 100.0;
    (pct(fragile), pct(stable))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProgress {
    pub theme_id: String,
    pub subject_id: String,
    pub skills: Vec<SkillView>,
    pub fragile_pct: f64,
    pub stable_pct: f64,
    pub rebuild: RebuildProgress,
    pub state: ZoneState,
}

impl ZoneProgress {
    pub fn new(
        subject_id: impl Into<String>,
        theme_id: impl Into<String>,
        skills: Vec<SkillView>,
        rebuild: Option<RebuildProgress>,
    ) -> Self {
        let rebuild = rebuild.unwrap_or_else(RebuildProgress::zone_default);
        let (fragile_pct, stable_pct) = shares(&skills);
        let state = ZoneState::classify(fragile_pct, stable_pct, &rebuild);
        Self {
            theme_id: theme_id.into(),
            subject_id: subject_id.into(),
            skills,
            fragile_pct,
            stable_pct,
            rebuild,
            state,
        }
    }

    pub fn contains(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|skill| skill.skill_id == skill_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeState {
    Wasteland,
    Recovering,
    Thriving,
    Neglected,
}

impl BiomeState {
    pub fn classify(fragile_pct: f64, stable_pct: f64) -> Self {
        if fragile_pct >= FRAGILE_THRESHOLD {
            Self::Wasteland
        } else if stable_pct >= STABLE_THRESHOLD {
            Self::Thriving
        } else if stable_pct >= RECOVERING_THRESHOLD {
            Self::Recovering
        } else {
            Self::Neglected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiomeRebuildStatus {
    NotReady,
    Ready,
    Rebuilding,
    Rebuilt,
}

impl BiomeRebuildStatus {
    pub fn classify(rebuilt_zone_pct: f64, zone_count: usize, rebuild: &RebuildProgress) -> Self {
        if rebuild.is_complete() {
            Self::Rebuilt
        } else if rebuild.correct_count > 0 {
            Self::Rebuilding
        } else if zone_count > 0 && rebuilt_zone_pct >= BIOME_READY_ZONE_PCT {
            Self::Ready
        } else {
            Self::NotReady
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeProgress {
    pub subject_id: String,
    pub zones: Vec<ZoneProgress>,
    pub fragile_pct: f64,
    pub stable_pct: f64,
    pub state: BiomeState,
    pub rebuilt_zone_pct: f64,
    pub rebuild_status: BiomeRebuildStatus,
    pub rebuild: RebuildProgress,
}

impl BiomeProgress {
    pub fn from_zones(
        subject_id: impl Into<String>,
        zones: Vec<ZoneProgress>,
        rebuild: Option<RebuildProgress>,
    ) -> Self {
        let rebuild = rebuild.unwrap_or_else(RebuildProgress::biome_default);
        let (fragile_pct, stable_pct) = shares(zones.iter().flat_map(|zone| zone.skills.iter()));
        let rebuilt = zones
            .iter()
            .filter(|zone| zone.state == ZoneState::Rebuilt)
            .count();
        let rebuilt_zone_pct = if zones.is_empty() {
            0.0
        } else {
            rebuilt as f64 / zones.len() as f64 * 100.0
        };
        Self {
            subject_id: subject_id.into(),
            fragile_pct,
            stable_pct,
            state: BiomeState::classify(fragile_pct, stable_pct),
            rebuilt_zone_pct,
            rebuild_status: BiomeRebuildStatus::classify(rebuilt_zone_pct, zones.len(), &rebuild),
            rebuild,
            zones,
        }
    }

    /// Assemble a biome from the catalog plus every skill with block counters.
    ///
    /// Catalog skills come first in catalog order so never-attempted skills show
    /// as locked; attempted skills the catalog does not know are grouped through
    /// the fallback lookup. Zones keep first-appearance order. Zone counters
    /// are keyed by `(subject_id, theme_id)`.
    pub fn build<C: CatalogLookup + ?Sized>(
        catalog: &C,
        subject_id: &str,
        blocks: &HashMap<String, BlockProgress>,
        zone_rebuilds: &HashMap<(String, String), RebuildProgress>,
        biome_rebuild: Option<RebuildProgress>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut members = catalog.skills_in_subject(subject_id);
        let mut extra: Vec<_> = blocks
            .keys()
            .filter(|id| catalog.find(id).is_none())
            .map(|id| catalog.lookup(id))
            .filter(|info| info.subject == subject_id)
            .collect();
        extra.sort_by(|a, b| a.id.cmp(&b.id));
        members.extend(extra);

        let mut themes: Vec<(String, Vec<SkillView>)> = Vec::new();
        for info in members {
            let view = SkillView::new(&info.id, &info.label, blocks.get(&info.id), now);
            match themes.iter_mut().find(|(theme, _)| *theme == info.theme) {
                Some((_, skills)) => skills.push(view),
                None => themes.push((info.theme, vec![view])),
            }
        }

        let zones = themes
            .into_iter()
            .map(|(theme, skills)| {
                let rebuild = zone_rebuilds
                    .get(&(subject_id.to_string(), theme.clone()))
                    .cloned();
                ZoneProgress::new(subject_id, theme, skills, rebuild)
            })
            .collect();

        Self::from_zones(subject_id, zones, biome_rebuild)
    }

    pub fn zone_of(&self, skill_id: &str) -> Option<&ZoneProgress> {
        self.zones.iter().find(|zone| zone.contains(skill_id))
    }

    pub fn skills(&self) -> impl Iterator<Item = &SkillView> {
        self.zones.iter().flat_map(|zone| zone.skills.iter())
    }
}
