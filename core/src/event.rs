//! Reputation events: immutable facts about something the actor did.
//!
//! RULE: An event is built once by `create_reputation_event` and never
//! mutated afterwards. Everything downstream only reads it.

use crate::{
    geometry::{clamp, clamp01, finite, resolve_cell_id},
    rng::DeterministicRng,
    trait_map::{ReputationTrait, TraitMap},
    types::{CellId, EntityId, Position, Timestamp, ZoneId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw trait deltas are clamped to this magnitude before intensity scaling.
pub const MAX_RAW_TRAIT_DELTA: f64 = 40.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    #[default]
    Minor,
    Moderate,
    Major,
    Legendary,
}

impl Intensity {
    pub const fn weight(self) -> f64 {
        match self {
            Self::Minor     => 0.4,
            Self::Moderate  => 0.65,
            Self::Major     => 0.85,
            Self::Legendary => 1.0,
        }
    }
}

/// How perceptible the act was, all factors in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EventVisibility {
    pub base:            f64,
    pub noise_level:     f64,
    pub lighting_factor: f64,
    pub disguise_factor: f64,
    pub crowd_density:   f64,
}

impl Default for EventVisibility {
    fn default() -> Self {
        Self {
            base:            0.7,
            noise_level:     0.6,
            lighting_factor: 0.85,
            disguise_factor: 0.8,
            crowd_density:   0.5,
        }
    }
}

/// Caller-supplied overrides; absent fields take the defaults above.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct VisibilityOverrides {
    #[serde(default)]
    pub base:            Option<f64>,
    #[serde(default)]
    pub noise_level:     Option<f64>,
    #[serde(default)]
    pub lighting_factor: Option<f64>,
    #[serde(default)]
    pub disguise_factor: Option<f64>,
    #[serde(default)]
    pub crowd_density:   Option<f64>,
}

impl VisibilityOverrides {
    /// Every field present and already clamped.
    pub fn resolved(&self) -> Self {
        let v = self.sanitize();
        Self {
            base:            Some(v.base),
            noise_level:     Some(v.noise_level),
            lighting_factor: Some(v.lighting_factor),
            disguise_factor: Some(v.disguise_factor),
            crowd_density:   Some(v.crowd_density),
        }
    }

    fn sanitize(&self) -> EventVisibility {
        let d = EventVisibility::default();
        EventVisibility {
            base:            clamp01(self.base.unwrap_or(d.base)),
            noise_level:     clamp01(self.noise_level.unwrap_or(d.noise_level)),
            lighting_factor: clamp01(self.lighting_factor.unwrap_or(d.lighting_factor)),
            disguise_factor: clamp01(self.disguise_factor.unwrap_or(d.disguise_factor)),
            crowd_density:   clamp01(self.crowd_density.unwrap_or(d.crowd_density)),
        }
    }
}

/// An action report as the caller describes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationEventInput {
    pub actor_id: EntityId,
    #[serde(default)]
    pub actor_label: Option<String>,
    pub zone_id: ZoneId,
    #[serde(default)]
    pub cell_id: Option<CellId>,
    pub position: Position,
    pub intensity: Intensity,
    /// Sparse raw deltas, pre-intensity.
    #[serde(default)]
    pub traits: BTreeMap<ReputationTrait, f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub visibility: VisibilityOverrides,
}

impl ReputationEventInput {
    pub fn new(
        actor_id: impl Into<EntityId>,
        zone_id: impl Into<ZoneId>,
        position: Position,
        intensity: Intensity,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_label: None,
            zone_id: zone_id.into(),
            cell_id: None,
            position,
            intensity,
            traits: BTreeMap::new(),
            tags: Vec::new(),
            timestamp: None,
            visibility: VisibilityOverrides::default(),
        }
    }

    pub fn with_trait(mut self, t: ReputationTrait, delta: f64) -> Self {
        self.traits.insert(t, delta);
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The same report with every number finite, ready to be journaled.
    ///
    /// `create_reputation_event` treats the result as it treats the
    /// original, except for coordinates: NaN is pinned to 0 and infinities
    /// saturate. Applying it twice changes nothing.
    pub fn sanitized(mut self) -> Self {
        self.position = Position::new(finite(self.position.x), finite(self.position.y));
        self.traits.retain(|_, raw| raw.is_finite() && *raw != 0.0);
        for raw in self.traits.values_mut() {
            *raw = clamp(*raw, -MAX_RAW_TRAIT_DELTA, MAX_RAW_TRAIT_DELTA);
        }
        self.timestamp = self.timestamp.filter(|t| t.is_finite());
        self.visibility = self.visibility.resolved();
        self
    }
}

/// The normalized, immutable fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationEvent {
    pub id:          String,
    pub actor_id:    EntityId,
    pub actor_label: String,
    pub zone_id:     ZoneId,
    pub cell_id:     CellId,
    pub position:    Position,
    pub intensity:   Intensity,
    /// Intensity-scaled deltas; zero means the trait is not involved.
    pub traits:      TraitMap<f64>,
    pub tags:        Vec<String>,
    pub timestamp:   Timestamp,
    pub visibility:  EventVisibility,
}

impl ReputationEvent {
    pub fn intensity_weight(&self) -> f64 {
        self.intensity.weight()
    }
}

/// Normalize an action report into a `ReputationEvent`.
///
/// Never fails. Missing cell ids are derived from the position, missing
/// timestamps fall back to `now`, visibility is filled and clamped, raw
/// deltas are clamped to ±40 then scaled by intensity, and zero or
/// non-finite deltas are dropped.
pub fn create_reputation_event(
    input:     &ReputationEventInput,
    now:       Timestamp,
    cell_size: f64,
    ids:       &mut dyn DeterministicRng,
) -> ReputationEvent {
    let weight = input.intensity.weight();

    let mut traits = TraitMap::splat(0.0);
    for (t, raw) in &input.traits {
        if !raw.is_finite() || *raw == 0.0 {
            continue;
        }
        traits[*t] = clamp(*raw, -MAX_RAW_TRAIT_DELTA, MAX_RAW_TRAIT_DELTA) * weight;
    }

    let timestamp = input.timestamp.filter(|t| t.is_finite()).unwrap_or(now);

    ReputationEvent {
        id:          ids.next_uuid().to_string(),
        actor_id:    input.actor_id.clone(),
        actor_label: input.actor_label.clone().unwrap_or_else(|| "Player".to_string()),
        zone_id:     input.zone_id.clone(),
        cell_id:     input
            .cell_id
            .clone()
            .unwrap_or_else(|| resolve_cell_id(input.position, cell_size)),
        position:    input.position,
        intensity:   input.intensity,
        traits,
        tags:        input.tags.clone(),
        timestamp,
        visibility:  input.visibility.sanitize(),
    }
}
