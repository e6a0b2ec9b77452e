//! Weighted, seed-deterministic choice of the next action.
//!
//! The engine builds every eligible option for a biome, weights them by
//! category, draws one with a seeded generator and avoids repeating the advice
//! shown last time. The previous advice is passed in explicitly and the
//! breadcrumb to persist comes back in the result.

use crate::catalog::humanize;
use crate::error::{EngineError, Result};
use crate::progression::{BiomeProgress, BiomeRebuildStatus, ZoneProgress, ZoneState};
use crate::rng::Mulberry32;
use crate::types::{ActionType, LastAdvice, SessionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const REPAIR_BELOW: u8 = 50;
pub const PRACTICE_FROM: u8 = 30;
pub const PRACTICE_BELOW: u8 = 80;

/// Weight multiplier for options matching the previous advice.
pub const REPEAT_PENALTY: f64 = 0.25;

/// Category an option's weight is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceCategory {
    Theme,
    Remediation,
    Progress,
    Biome,
    Fallback,
}

impl AdviceCategory {
    const ALL: [AdviceCategory; 5] = [
        Self::Theme,
        Self::Remediation,
        Self::Progress,
        Self::Biome,
        Self::Fallback,
    ];
}

/// Base weight per category before the biome boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightProfile {
    pub theme: f64,
    pub remediation: f64,
    pub progress: f64,
    pub biome: f64,
    pub fallback: f64,
}

impl WeightProfile {
    pub const ACTIVE_REBUILD: Self = Self {
        theme: 0.55,
        remediation: 0.20,
        progress: 0.20,
        biome: 0.05,
        fallback: 0.05,
    };

    pub const REBUILD_AVAILABLE: Self = Self {
        theme: 0.45,
        remediation: 0.25,
        progress: 0.25,
        biome: 0.05,
        fallback: 0.05,
    };

    pub const BALANCED: Self = Self {
        theme: 0.20,
        remediation: 0.25,
        progress: 0.30,
        biome: 0.15,
        fallback: 0.10,
    };

    pub fn pick(has_zone_option: bool, zone_rebuilding: bool) -> Self {
        match (has_zone_option, zone_rebuilding) {
            (true, true) => Self::ACTIVE_REBUILD,
            (true, false) => Self::REBUILD_AVAILABLE,
            _ => Self::BALANCED,
        }
    }

    fn weight(&self, category: AdviceCategory) -> f64 {
        match category {
            AdviceCategory::Theme => self.theme,
            AdviceCategory::Remediation => self.remediation,
            AdviceCategory::Progress => self.progress,
            AdviceCategory::Biome => self.biome,
            AdviceCategory::Fallback => self.fallback,
        }
    }
}

/// Boost applied to the biome category near the end of a biome rebuild.
pub fn biome_boost(progress_ratio: f64) -> f64 {
    if progress_ratio >= 0.9 {
        2.0
    } else if progress_ratio >= 0.7 {
        1.5
    } else {
        1.0
    }
}

/// Deep-link parameters for the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvicePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_kind: Option<SessionKind>,
}

/// Extra facts an option was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdviceMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_state: Option<ZoneState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild_ratio: Option<f64>,
}

/// One eligible next action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceOption {
    pub advice_id: String,
    pub action_type: ActionType,
    pub category: AdviceCategory,
    pub payload: AdvicePayload,
    pub message_code: String,
    pub message_variants: Vec<String>,
    pub cta_label: String,
    pub meta: Option<AdviceMeta>,
}

impl AdviceOption {
    fn matches(&self, last: &LastAdvice) -> bool {
        self.advice_id == last.advice_id || self.action_type == last.action_type
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub biome: &'a BiomeProgress,
    /// Mastery score per skill id.
    pub mastery: &'a HashMap<String, u8>,
    /// When non-empty, only these skills may be suggested.
    pub allowed_skills: &'a [String],
    pub seed: &'a str,
    pub last_advice: Option<&'a LastAdvice>,
}

impl RecommendationInput<'_> {
    fn allows(&self, skill_id: &str) -> bool {
        self.allowed_skills.is_empty() || self.allowed_skills.iter().any(|id| id == skill_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedAdvice {
    pub advice_id: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub advice_id: String,
    pub action_type: ActionType,
    pub message: String,
    pub message_key: String,
    pub cta_label: String,
    pub payload: AdvicePayload,
    pub weights: Vec<WeightedAdvice>,
}

impl Recommendation {
    /// Breadcrumb the caller stores and sends back on the next call.
    pub fn last_advice(&self) -> LastAdvice {
        LastAdvice {
            advice_id: self.advice_id.clone(),
            action_type: self.action_type,
            message_key: self.message_key.clone(),
        }
    }
}

fn zone_option(zone: &ZoneProgress) -> AdviceOption {
    let name = humanize(&zone.theme_id);
    let message_variants = if zone.state == ZoneState::Rebuilding {
        vec![
            format!("{name} is rising again. Keep the bricks coming!"),
            format!("A few more good answers and {name} stands tall."),
            format!("The builders of {name} are waiting for you."),
        ]
    } else {
        vec![
            format!("{name} is ready to be rebuilt. Shall we start?"),
            format!("Everything is in place to rebuild {name}."),
            format!("Let's bring {name} back to life!"),
        ]
    };
    AdviceOption {
        advice_id: format!("rebuild_zone:{}", zone.theme_id),
        action_type: ActionType::RebuildZone,
        category: AdviceCategory::Theme,
        payload: AdvicePayload {
            subject_id: Some(zone.subject_id.clone()),
            theme_id: Some(zone.theme_id.clone()),
            ..Default::default()
        },
        message_code: "rebuild_zone".to_string(),
        message_variants,
        cta_label: "Rebuild".to_string(),
        meta: Some(AdviceMeta {
            zone_state: Some(zone.state),
            rebuild_ratio: Some(zone.rebuild.ratio()),
            ..Default::default()
        }),
    }
}

fn biome_option(biome: &BiomeProgress) -> AdviceOption {
    let name = humanize(&biome.subject_id);
    AdviceOption {
        advice_id: format!("rebuild_biome:{}", biome.subject_id),
        action_type: ActionType::RebuildBiome,
        category: AdviceCategory::Biome,
        payload: AdvicePayload {
            subject_id: Some(biome.subject_id.clone()),
            ..Default::default()
        },
        message_code: "rebuild_biome".to_string(),
        message_variants: vec![
            format!("The whole {name} land can be restored now."),
            format!("Most of {name} is rebuilt. Time for the grand restoration!"),
            format!("{name} is calling for its final rebuild."),
        ],
        cta_label: "Restore".to_string(),
        meta: Some(AdviceMeta {
            rebuild_ratio: Some(biome.rebuild.ratio()),
            ..Default::default()
        }),
    }
}

fn skill_option(skill_id: &str, label: &str, mastery: u8, kind: SessionKind) -> AdviceOption {
    let (prefix, code, category, cta_label, message_variants) = match kind {
        SessionKind::Repair => (
            "repair",
            "tag_repair",
            AdviceCategory::Remediation,
            "Repair",
            vec![
                format!("{label} has a few cracks. Let's fix them together."),
                format!("A quick repair on {label} will make it solid again."),
                format!("{label} needs some care today."),
            ],
        ),
        _ => (
            "practice",
            "tag_practice",
            AdviceCategory::Progress,
            "Practice",
            vec![
                format!("You are getting good at {label}. One more round?"),
                format!("{label} is almost shining. Keep going!"),
                format!("A little practice on {label} and it will be mastered."),
            ],
        ),
    };
    AdviceOption {
        advice_id: format!("{prefix}:{skill_id}"),
        action_type: ActionType::TagSession,
        category,
        payload: AdvicePayload {
            skill_id: Some(skill_id.to_string()),
            session_kind: Some(kind),
            ..Default::default()
        },
        message_code: code.to_string(),
        message_variants,
        cta_label: cta_label.to_string(),
        meta: Some(AdviceMeta {
            mastery: Some(mastery),
            ..Default::default()
        }),
    }
}

fn explore_option(subject_id: &str) -> AdviceOption {
    let name = humanize(subject_id);
    AdviceOption {
        advice_id: format!("explore:{subject_id}"),
        action_type: ActionType::Explore,
        category: AdviceCategory::Fallback,
        payload: AdvicePayload {
            subject_id: Some(subject_id.to_string()),
            ..Default::default()
        },
        message_code: "explore".to_string(),
        message_variants: vec![
            format!("Let's wander through {name} and see what we find."),
            format!("{name} still hides a few surprises."),
            format!("Pick any path in {name}, I will follow you."),
        ],
        cta_label: "Explore".to_string(),
        meta: None,
    }
}

/// Every eligible option, in a stable order.
pub fn build_options(input: &RecommendationInput<'_>) -> Vec<AdviceOption> {
    let biome = input.biome;
    let mut options = Vec::new();

    for zone in &biome.zones {
        if !matches!(zone.state, ZoneState::RebuiltReady | ZoneState::Rebuilding) {
            continue;
        }
        if !input.allowed_skills.is_empty()
            && !zone.skills.iter().any(|skill| input.allows(&skill.skill_id))
        {
            continue;
        }
        options.push(zone_option(zone));
    }

    if matches!(
        biome.rebuild_status,
        BiomeRebuildStatus::Ready | BiomeRebuildStatus::Rebuilding
    ) && !biome.rebuild.is_complete()
    {
        options.push(biome_option(biome));
    }

    let mut scored: Vec<(u8, &str, &str)> = biome
        .skills()
        .filter(|skill| input.allows(&skill.skill_id))
        .filter_map(|skill| {
            input
                .mastery
                .get(&skill.skill_id)
                .map(|&score| (score, skill.skill_id.as_str(), skill.label.as_str()))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);

    for &(score, skill_id, label) in &scored {
        if score < REPAIR_BELOW {
            options.push(skill_option(skill_id, label, score, SessionKind::Repair));
        }
    }
    for &(score, skill_id, label) in &scored {
        if !(PRACTICE_FROM..PRACTICE_BELOW).contains(&score) {
            continue;
        }
        let rebuilt = biome
            .zone_of(skill_id)
            .map(|zone| zone.state == ZoneState::Rebuilt)
            .unwrap_or(false);
        if !rebuilt {
            options.push(skill_option(skill_id, label, score, SessionKind::Practice));
        }
    }

    options.push(explore_option(&biome.subject_id));
    options
}

/// Normalized weight per option, summing to 1 over the given options.
pub fn option_weights(options: &[AdviceOption], biome_ratio: f64) -> Vec<f64> {
    let has_zone = options
        .iter()
        .any(|option| option.category == AdviceCategory::Theme);
    let zone_rebuilding = options.iter().any(|option| {
        option
            .meta
            .as_ref()
            .and_then(|meta| meta.zone_state)
            .map(|state| state == ZoneState::Rebuilding)
            .unwrap_or(false)
    });
    let profile = WeightProfile::pick(has_zone, zone_rebuilding);

    let mut per_category = HashMap::new();
    for category in AdviceCategory::ALL {
        let count = options
            .iter()
            .filter(|option| option.category == category)
            .count();
        if count == 0 {
            continue;
        }
        let mut weight = profile.weight(category);
        if category == AdviceCategory::Biome {
            weight *= biome_boost(biome_ratio);
        }
        per_category.insert(category, weight / count as f64);
    }

    let raw: Vec<f64> = options
        .iter()
        .map(|option| per_category.get(&option.category).copied().unwrap_or(0.0))
        .collect();
    normalize(raw)
}

fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        let even = 1.0 / weights.len().max(1) as f64;
        return vec![even; weights.len()];
    }
    weights.into_iter().map(|weight| weight / total).collect()
}

/// Cumulative draw; rounding leftovers fall on the last option.
fn draw(weights: &[f64], rng: &mut Mulberry32) -> usize {
    let roll = rng.next_f64();
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if roll < cumulative {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}

fn parse_message_key(key: &str) -> Option<(&str, usize)> {
    let (code, index) = key.rsplit_once(':')?;
    Some((code, index.parse().ok()?))
}

/// Variant index to show for `option` given the previous advice.
pub fn message_index(option: &AdviceOption, last: Option<&LastAdvice>) -> usize {
    let count = option.message_variants.len();
    if count == 0 {
        return 0;
    }
    let previous = last.and_then(|last| {
        parse_message_key(&last.message_key).map(|(code, index)| (last, code, index))
    });
    match previous {
        Some((last, code, index))
            if last.advice_id == option.advice_id
                && code == option.message_code
                && index < count =>
        {
            index
        }
        Some((_, code, index)) if code == option.message_code => (index + 1) % count,
        _ => 0,
    }
}

/// Pick the next action for a biome.
pub fn recommend(input: &RecommendationInput<'_>) -> Result<Recommendation> {
    let options = build_options(input);
    if options.is_empty() {
        return Err(EngineError::NoEligibleAdvice {
            biome_id: input.biome.subject_id.clone(),
        });
    }

    let weights = option_weights(&options, input.biome.rebuild.ratio());

    let chosen = if options.len() == 1 {
        0
    } else {
        let mut rng = Mulberry32::from_seed_str(input.seed);
        let first = draw(&weights, &mut rng);
        match input.last_advice {
            Some(last) if options[first].matches(last) => {
                let penalized: Vec<f64> = options
                    .iter()
                    .zip(&weights)
                    .map(|(option, &weight)| {
                        if option.matches(last) {
                            weight * REPEAT_PENALTY
                        } else {
                            weight
                        }
                    })
                    .collect();
                draw(&normalize(penalized), &mut rng)
            }
            _ => first,
        }
    };

    let option = &options[chosen];
    let index = message_index(option, input.last_advice);
    let message = option
        .message_variants
        .get(index)
        .cloned()
        .unwrap_or_default();

    Ok(Recommendation {
        advice_id: option.advice_id.clone(),
        action_type: option.action_type,
        message,
        message_key: format!("{}:{}", option.message_code, index),
        cta_label: option.cta_label.clone(),
        payload: option.payload.clone(),
        weights: options
            .iter()
            .zip(&weights)
            .map(|(option, &weight)| WeightedAdvice {
                advice_id: option.advice_id.clone(),
                weight,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::{SkillState, SkillView};
    use crate::types::RebuildProgress;

    fn skill(id: &str, state: SkillState) -> SkillView {
        SkillView {
            skill_id: id.to_string(),
            label: humanize(id),
            state,
            weathered: false,
        }
    }

    fn counter(count: u32, target: u32) -> RebuildProgress {
        RebuildProgress {
            correct_count: count,
            target,
            updated_at: None,
        }
    }

    fn biome(zone_counts: &[u32], biome_count: u32) -> BiomeProgress {
        let zones = zone_counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let skills = vec![
                    skill(&format!("z{i}-a"), SkillState::Beautified),
                    skill(&format!("z{i}-b"), SkillState::Repaired),
                ];
                ZoneProgress::new("math", format!("zone{i}"), skills, Some(counter(count, 35)))
            })
            .collect();
        BiomeProgress::from_zones("math", zones, Some(counter(biome_count, 100)))
    }

    fn input<'a>(
        biome: &'a BiomeProgress,
        mastery: &'a HashMap<String, u8>,
        seed: &'a str,
        last: Option<&'a LastAdvice>,
    ) -> RecommendationInput<'a> {
        RecommendationInput {
            biome,
            mastery,
            allowed_skills: &[],
            seed,
            last_advice: last,
        }
    }

    fn scores(entries: &[(&str, u8)]) -> HashMap<String, u8> {
        entries
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .collect()
    }

    #[test]
    fn explore_alone_is_returned_directly() {
        let biome = BiomeProgress::from_zones("math", vec![], None);
        let mastery = HashMap::new();
        let rec = recommend(&input(&biome, &mastery, "any", None)).unwrap();
        assert_eq!(rec.advice_id, "explore:math");
        assert_eq!(rec.action_type, ActionType::Explore);
        assert_eq!(rec.message_key, "explore:0");
        assert_eq!(rec.weights.len(), 1);
        assert!((rec.weights[0].weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn options_follow_zone_and_score_rules() {
        // zone0 rebuilding, zone1 rebuilt, zone2 rebuilt_ready
        let biome = biome(&[5, 35, 0], 0);
        let mastery = scores(&[("z0-a", 20), ("z0-b", 45), ("z1-a", 60), ("z2-a", 85)]);
        let ids: Vec<String> = build_options(&input(&biome, &mastery, "s", None))
            .into_iter()
            .map(|option| option.advice_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "rebuild_zone:zone0",
                "rebuild_zone:zone2",
                "repair:z0-a",
                "repair:z0-b",
                "practice:z0-b",
                "explore:math",
            ]
        );
    }

    #[test]
    fn biome_option_when_ready_and_incomplete() {
        let ready = biome(&[35, 35, 0], 0);
        assert_eq!(ready.rebuild_status, BiomeRebuildStatus::Ready);
        let mastery = HashMap::new();
        let options = build_options(&input(&ready, &mastery, "s", None));
        assert!(options.iter().any(|o| o.advice_id == "rebuild_biome:math"));

        let done = biome(&[35, 35, 0], 100);
        let options = build_options(&input(&done, &mastery, "s", None));
        assert!(options.iter().all(|o| o.action_type != ActionType::RebuildBiome));
    }

    #[test]
    fn allowed_skills_filter_zones_and_tags() {
        let biome = biome(&[5, 0], 0);
        let mastery = scores(&[("z0-a", 10), ("z1-a", 10)]);
        let allowed = vec!["z1-a".to_string()];
        let request = RecommendationInput {
            allowed_skills: &allowed,
            ..input(&biome, &mastery, "s", None)
        };
        let ids: Vec<String> = build_options(&request)
            .into_iter()
            .map(|option| option.advice_id)
            .collect();
        assert_eq!(ids, vec!["rebuild_zone:zone1", "repair:z1-a", "explore:math"]);
    }

    #[test]
    fn weights_sum_to_one_and_follow_profile() {
        let biome = biome(&[5], 0);
        let mastery = scores(&[("z0-a", 10), ("z0-b", 40)]);
        let options = build_options(&input(&biome, &mastery, "s", None));
        let weights = option_weights(&options, 0.0);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);

        // theme .55, remediation .20 split over two, progress .20, fallback .05
        let total = 0.55 + 0.20 + 0.20 + 0.05;
        assert!((weights[0] - 0.55 / total).abs() < 1e-9);
        assert!((weights[1] - 0.10 / total).abs() < 1e-9);
        assert!((weights[2] - 0.10 / total).abs() < 1e-9);
    }

    #[test]
    fn biome_boost_steps() {
        assert_eq!(biome_boost(0.5), 1.0);
        assert_eq!(biome_boost(0.7), 1.5);
        assert_eq!(biome_boost(0.95), 2.0);
    }

    #[test]
    fn same_seed_same_advice() {
        let biome = biome(&[5, 0, 0], 0);
        let mastery = scores(&[("z0-a", 10), ("z1-a", 40), ("z2-b", 70)]);
        let first = recommend(&input(&biome, &mastery, "kid-42:2026-10-18", None)).unwrap();
        for _ in 0..5 {
            let again = recommend(&input(&biome, &mastery, "kid-42:2026-10-18", None)).unwrap();
            assert_eq!(again.advice_id, first.advice_id);
            assert_eq!(again.message, first.message);
        }
    }

    #[test]
    fn penalty_moves_away_from_dominant_repeat() {
        let biome = biome(&[5], 0);
        let mastery = HashMap::new();
        let last = LastAdvice {
            advice_id: "rebuild_zone:zone0".to_string(),
            action_type: ActionType::RebuildZone,
            message_key: "rebuild_zone:1".to_string(),
        };
        let mut plain_repeats = 0;
        let mut biased_repeats = 0;
        for day in 0..200 {
            let seed = format!("kid:{day}");
            let plain = recommend(&input(&biome, &mastery, &seed, None)).unwrap();
            let biased = recommend(&input(&biome, &mastery, &seed, Some(&last))).unwrap();
            if plain.advice_id == last.advice_id {
                plain_repeats += 1;
            }
            if biased.advice_id == last.advice_id {
                biased_repeats += 1;
            }
        }
        assert!(biased_repeats < plain_repeats, "{biased_repeats} vs {plain_repeats}");
    }

    #[test]
    fn message_rotation_rules() {
        let option = explore_option("math");
        let last = |id: &str, key: &str| LastAdvice {
            advice_id: id.to_string(),
            action_type: ActionType::Explore,
            message_key: key.to_string(),
        };
        assert_eq!(message_index(&option, None), 0);
        assert_eq!(message_index(&option, Some(&last("explore:math", "explore:2"))), 2);
        assert_eq!(message_index(&option, Some(&last("explore:fr", "explore:2"))), 0);
        assert_eq!(message_index(&option, Some(&last("explore:fr", "explore:1"))), 2);
        assert_eq!(message_index(&option, Some(&last("explore:math", "explore:9"))), 1);
        assert_eq!(message_index(&option, Some(&last("repair:x", "tag_repair:1"))), 0);
        assert_eq!(message_index(&option, Some(&last("explore:math", "garbage"))), 0);
    }

    #[test]
    fn breadcrumb_round_trips_message_key() {
        let biome = biome(&[], 0);
        let mastery = HashMap::new();
        let rec = recommend(&input(&biome, &mastery, "x", None)).unwrap();
        let crumb = rec.last_advice();
        let again = recommend(&input(&biome, &mastery, "y", Some(&crumb))).unwrap();
        assert_eq!(again.message, rec.message);
    }

    #[test]
    fn biome_weight_is_boosted_near_completion() {
        let mastery = scores(&[("z0-a", 10)]);

        // every zone rebuilt: balanced profile, options are biome, repair, explore
        let weights_at = |biome_count: u32| {
            let biome = biome(&[35, 35], biome_count);
            let options = build_options(&input(&biome, &mastery, "s", None));
            let kinds: Vec<AdviceCategory> = options.iter().map(|o| o.category).collect();
            assert_eq!(
                kinds,
                vec![
                    AdviceCategory::Biome,
                    AdviceCategory::Remediation,
                    AdviceCategory::Fallback
                ]
            );
            option_weights(&options, biome.rebuild.ratio())
        };

        let doubled = weights_at(95);
        let total = 0.15 * 2.0 + 0.25 + 0.10;
        assert!((doubled[0] - 0.15 * 2.0 / total).abs() < 1e-9);
        assert!((doubled[1] - 0.25 / total).abs() < 1e-9);
        assert!((doubled.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let boosted = weights_at(75);
        let total = 0.15 * 1.5 + 0.25 + 0.10;
        assert!((boosted[0] - 0.15 * 1.5 / total).abs() < 1e-9);

        let plain = weights_at(20);
        assert!((plain[0] - 0.15 / 0.50).abs() < 1e-9);
    }
}
