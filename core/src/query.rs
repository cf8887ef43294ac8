//! Read-side views over the profile store for downstream consumers
//! (dialogue, pricing, AI, debug overlays). Nothing here mutates state.

use crate::{
    geometry::clamp,
    profile::{ProfileStore, ReputationProfile, ScopeKey, ScopeKind},
    trait_map::{ReputationTrait, TraitMap},
    types::{CellId, EntityId, FactionId},
};
use serde::{Deserialize, Serialize};

/// Where a scoped lookup found its answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Scope(ScopeKind),
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopedTraitSnapshot {
    pub value:      f64,
    pub confidence: f64,
    pub source:     SnapshotSource,
    pub scope_id:   Option<String>,
}

/// The most specific opinion available: witness, then cell, then faction.
///
/// A profile only answers when its sample carries some confidence or a
/// nonzero value; otherwise the lookup falls through.
pub fn scoped_trait_snapshot(
    profiles:   &ProfileStore,
    witness_id: Option<&str>,
    cell_id:    Option<&str>,
    faction_id: Option<&str>,
    t:          ReputationTrait,
) -> ScopedTraitSnapshot {
    let order = [
        witness_id.map(|id| ScopeKey::Witness(id.to_string())),
        cell_id.map(|id| ScopeKey::Cell(id.to_string())),
        faction_id.map(|id| ScopeKey::Faction(id.to_string())),
    ];

    for key in order.into_iter().flatten() {
        let Some(profile) = profiles.get(&key) else {
            continue;
        };
        let sample = profile.sample(t);
        if sample.confidence > 0.0 || sample.value != 0.0 {
            return ScopedTraitSnapshot {
                value:      sample.value,
                confidence: sample.confidence,
                source:     SnapshotSource::Scope(key.kind()),
                scope_id:   Some(key.id().to_string()),
            };
        }
    }

    ScopedTraitSnapshot {
        value:      0.0,
        confidence: 0.0,
        source:     SnapshotSource::Fallback,
        scope_id:   None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraitReading {
    #[serde(rename = "trait")]
    pub trait_:     ReputationTrait,
    pub value:      f64,
    pub confidence: f64,
}

pub const DEFAULT_TOP_TRAITS: usize = 3;

/// Up to `limit` nonzero traits of a scope, strongest magnitude first.
/// Unknown scopes yield nothing.
pub fn top_traits(profiles: &ProfileStore, key: &ScopeKey, limit: usize) -> Vec<TraitReading> {
    let Some(profile) = profiles.get(key) else {
        return Vec::new();
    };

    let mut readings: Vec<TraitReading> = profile
        .traits
        .iter()
        .filter(|(_, s)| s.value != 0.0)
        .map(|(t, s)| TraitReading { trait_: t, value: s.value, confidence: s.confidence })
        .collect();

    // Stable sort keeps trait order among equal magnitudes.
    readings.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    readings.truncate(limit);
    readings
}

// ── Effective faction standing ───────────────────────────────────────────────

const FACTION_PROFILE_MULTIPLIER: f64 = 0.7;
const CELL_PROFILE_MULTIPLIER:    f64 = 0.55;
const WITNESS_PROFILE_MULTIPLIER: f64 = 0.9;
const CONFIDENCE_WEIGHT_SCALE:    f64 = 10.0;

/// How much each trait moves faction standing.
pub fn standing_weights() -> TraitMap<f64> {
    TraitMap::from_fn(|t| match t {
        ReputationTrait::Heroic       => 0.12,
        ReputationTrait::Cruel        => -0.14,
        ReputationTrait::Sneaky       => -0.08,
        ReputationTrait::Intimidating => -0.07,
        ReputationTrait::Competent    => 0.1,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EffectiveStanding {
    pub value:      f64,
    pub confidence: f64,
}

fn weighted_contribution(profile: &ReputationProfile, weights: &TraitMap<f64>) -> (f64, f64) {
    profile
        .traits
        .iter()
        .filter(|(_, s)| s.confidence > 0.0)
        .fold((0.0, 0.0), |(value, weight), (t, s)| {
            (
                value + s.value * weights[t] * s.confidence,
                weight + weights[t].abs() * s.confidence,
            )
        })
}

/// A faction's base standing adjusted by what its members, the local cell
/// and one specific witness believe about the actor.
pub fn effective_faction_standing(
    profiles:      &ProfileStore,
    faction_id:    &FactionId,
    base_standing: f64,
    cell_id:       Option<&CellId>,
    witness_id:    Option<&EntityId>,
) -> EffectiveStanding {
    let weights = standing_weights();
    let sources = [
        (Some(ScopeKey::Faction(faction_id.clone())), FACTION_PROFILE_MULTIPLIER),
        (cell_id.map(|id| ScopeKey::Cell(id.clone())), CELL_PROFILE_MULTIPLIER),
        (witness_id.map(|id| ScopeKey::Witness(id.clone())), WITNESS_PROFILE_MULTIPLIER),
    ];

    let mut value = base_standing;
    let mut cumulative_weight = 0.0;
    for (key, multiplier) in sources {
        let Some(profile) = key.as_ref().and_then(|k| profiles.get(k)) else {
            continue;
        };
        let (contribution, weight) = weighted_contribution(profile, &weights);
        value += contribution * multiplier;
        cumulative_weight += weight * f64::abs(multiplier);
    }

    let confidence = if cumulative_weight > 0.0 {
        (cumulative_weight / CONFIDENCE_WEIGHT_SCALE).min(1.0)
    } else {
        0.0
    };

    EffectiveStanding { value, confidence }
}

// ── Heatmap ──────────────────────────────────────────────────────────────────

pub const HEATMAP_LIMIT: f64 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeatmapCell {
    pub cell_id: CellId,
    pub value:   f64,
}

/// One display value per cell profile, sorted by cell id.
pub fn cell_heatmap(profiles: &ProfileStore) -> Vec<HeatmapCell> {
    use ReputationTrait::*;
    profiles
        .iter()
        .filter_map(|profile| match &profile.scope {
            ScopeKey::Cell(cell_id) => {
                let t = &profile.traits;
                let raw = t[Heroic].value - t[Cruel].value + t[Intimidating].value * 0.4;
                Some(HeatmapCell {
                    cell_id: cell_id.clone(),
                    value:   clamp(raw, -HEATMAP_LIMIT, HEATMAP_LIMIT),
                })
            }
            _ => None,
        })
        .collect()
}
