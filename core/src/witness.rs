//! Witness sampling: who perceived an event, and how clearly.
//!
//! For every observer within range this computes a composite visibility
//! score from distance, line of sight, lighting, noise and disguise, then
//! sorts observers into direct witnesses, rumor-only hearers, or nobody.
//!
//! Pure: the same event, grid and roster always yield the same candidates
//! in the same order.

use crate::{
    config::{ReputationConfig, DEFAULT_BIAS_FACTION},
    event::ReputationEvent,
    geometry::{clamp, clamp01, distance_between, resolve_cell_id, sample_line_of_sight},
    trait_map::TraitMap,
    types::{CellId, EntityId, FactionId, Position, ZoneId},
    world::{Observer, TileGrid},
};
use serde::{Deserialize, Serialize};

/// How an observer slants what they see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WitnessBias {
    /// Per-trait multipliers. 0 means "no opinion" and reads as 1.
    pub trait_weights:       TraitMap<f64>,
    pub skepticism:          f64,
    pub appetite_for_rumors: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WitnessCandidate {
    pub witness_id:       EntityId,
    pub name:             String,
    pub faction_id:       Option<FactionId>,
    pub zone_id:          ZoneId,
    pub cell_id:          CellId,
    pub position:         Position,
    pub distance:         f64,
    pub line_of_sight:    f64,
    pub distance_factor:  f64,
    pub lighting_factor:  f64,
    pub noise_factor:     f64,
    pub disguise_factor:  f64,
    pub visibility_score: f64,
    pub base_confidence:  f64,
    pub is_rumor_only:    bool,
    pub bias:             WitnessBias,
}

/// Ambient inputs for one sampling pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplingParams {
    pub ambient_lighting:     f64,
    pub ambient_noise:        f64,
    pub disguise_penalty:     f64,
    pub max_distance:         f64,
    pub visibility_threshold: f64,
}

impl SamplingParams {
    /// Ambient values with range and threshold taken from config.
    pub fn new(
        ambient_lighting: f64,
        ambient_noise:    f64,
        disguise_penalty: f64,
        config:           &ReputationConfig,
    ) -> Self {
        Self {
            ambient_lighting,
            ambient_noise,
            disguise_penalty,
            max_distance:         config.witness.max_distance,
            visibility_threshold: config.witness.visibility_threshold,
        }
    }

    pub fn with_visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold;
        self
    }
}

/// Score every observer against the event and keep those who noticed.
///
/// Sorted by descending visibility; ties break on witness id.
pub fn sample_witnesses(
    event:        &ReputationEvent,
    grid:         &dyn TileGrid,
    observers:    &[Observer],
    zone_faction: Option<&str>,
    params:       &SamplingParams,
    config:       &ReputationConfig,
) -> Vec<WitnessCandidate> {
    let mut candidates: Vec<WitnessCandidate> = observers
        .iter()
        .filter_map(|observer| score_observer(event, grid, observer, zone_faction, params, config))
        .collect();

    candidates.sort_by(|a, b| {
        b.visibility_score
            .total_cmp(&a.visibility_score)
            .then_with(|| a.witness_id.cmp(&b.witness_id))
    });
    candidates
}

fn score_observer(
    event:        &ReputationEvent,
    grid:         &dyn TileGrid,
    observer:     &Observer,
    zone_faction: Option<&str>,
    params:       &SamplingParams,
    config:       &ReputationConfig,
) -> Option<WitnessCandidate> {
    let distance = distance_between(observer.position, event.position);
    if !distance.is_finite() || distance > params.max_distance {
        return None;
    }

    let distance_factor = clamp01(1.0 - distance / (params.max_distance + 1.0));
    let line_of_sight = sample_line_of_sight(grid, observer.position, event.position);
    let lighting_factor = clamp(params.ambient_lighting * event.visibility.lighting_factor, 0.2, 1.1);
    let noise_factor = clamp(
        params.ambient_noise * 0.35 + event.visibility.noise_level * 0.65,
        0.1,
        1.0,
    );
    let disguise_factor = clamp(event.visibility.disguise_factor - params.disguise_penalty, 0.25, 1.0);

    let visibility_score = clamp01(
        event.visibility.base
            * distance_factor
            * line_of_sight
            * lighting_factor
            * (0.5 + noise_factor * 0.5)
            * (1.0 - (1.0 - disguise_factor) * 0.6),
    );

    if visibility_score < config.witness.rumor_threshold {
        return None;
    }

    let faction_id = resolve_faction(observer, zone_faction);
    let bias = resolve_bias(observer, faction_id.as_deref(), config);
    let base_confidence = observer_confidence(
        observer,
        visibility_score,
        distance_factor,
        line_of_sight,
        config,
    );

    Some(WitnessCandidate {
        witness_id: observer.id.clone(),
        name: observer.name.clone(),
        faction_id,
        zone_id: event.zone_id.clone(),
        cell_id: resolve_cell_id(observer.position, config.witness.cell_size),
        position: observer.position,
        distance,
        line_of_sight,
        distance_factor,
        lighting_factor,
        noise_factor,
        disguise_factor,
        visibility_score,
        base_confidence,
        is_rumor_only: visibility_score < params.visibility_threshold,
        bias,
    })
}

/// Explicit faction, then a faction-marking tag, then the zone default.
pub fn resolve_faction(observer: &Observer, zone_faction: Option<&str>) -> Option<FactionId> {
    if let Some(faction) = &observer.faction_id {
        return Some(faction.clone());
    }
    const TAG_FACTIONS: [(&str, &str); 3] = [
        ("corpsec", "corpsec"),
        ("scavenger", "scavengers"),
        ("resistance", "resistance"),
    ];
    TAG_FACTIONS
        .iter()
        .find(|(tag, _)| observer.has_tag(tag))
        .map(|(_, faction)| faction.to_string())
        .or_else(|| zone_faction.map(str::to_string))
}

pub fn resolve_bias(
    observer:   &Observer,
    faction_id: Option<&str>,
    config:     &ReputationConfig,
) -> WitnessBias {
    let trait_weights = observer
        .reputation_bias
        .or_else(|| faction_id.and_then(|f| config.faction_biases.get(f)).copied())
        .or_else(|| config.faction_biases.get(DEFAULT_BIAS_FACTION).copied())
        .unwrap_or_else(|| TraitMap::splat(1.0));

    let gossip_hub = observer.has_tag("gossip_hub");
    let skepticism = if gossip_hub { 0.35 } else { 0.55 };
    let appetite_for_rumors = if gossip_hub {
        0.75
    } else if observer.has_tag("guard") {
        0.25
    } else {
        0.5
    };

    WitnessBias {
        trait_weights,
        skepticism:          clamp(skepticism, 0.15, 0.85),
        appetite_for_rumors: clamp(appetite_for_rumors, 0.15, 0.9),
    }
}

fn observer_confidence(
    observer:         &Observer,
    visibility_score: f64,
    distance_factor:  f64,
    line_of_sight:    f64,
    config:           &ReputationConfig,
) -> f64 {
    let alert_bonus = if observer.has_tag("sentinel") {
        config.witness.sentinel_confidence_bonus
    } else if observer.has_tag("guard") {
        config.witness.guard_confidence_bonus
    } else {
        0.0
    };
    clamp01(visibility_score * 0.65 + distance_factor * 0.2 + line_of_sight * 0.15 + alert_bonus)
}
