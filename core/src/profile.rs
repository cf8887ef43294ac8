//! Reputation profiles: the durable output of the pipeline.
//!
//! A profile tracks, per trait, a signed value in [-100, 100], a confidence
//! in [0, 1] and the ids of the last few records that moved it. Profiles
//! are created lazily by the first mutation that targets their scope and
//! are never deleted; decay only drives them back toward zero.
//!
//! Scope derivation ratios are fixed:
//!   witness: delta,                         confidence
//!   faction: delta × (0.55 + 0.2 × conf),   confidence × 0.7
//!   cell:    delta × (0.7 + 0.15 × conf),   confidence × 0.8

use crate::{
    config::ProfileConfig,
    geometry::{clamp, clamp01},
    interpretation::WitnessRecord,
    trait_map::{ReputationTrait, TraitMap},
    types::{CellId, EntityId, FactionId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const FACTION_DELTA_BASE:       f64 = 0.55;
const FACTION_DELTA_PER_CONF:   f64 = 0.2;
const FACTION_CONFIDENCE_SCALE: f64 = 0.7;
const CELL_DELTA_BASE:          f64 = 0.7;
const CELL_DELTA_PER_CONF:      f64 = 0.15;
const CELL_CONFIDENCE_SCALE:    f64 = 0.8;

/// Values below this snap to zero after decay.
const VALUE_SNAP: f64 = 0.01;
/// Confidences below this snap to zero (and clear sources) after decay.
const CONFIDENCE_SNAP: f64 = 0.02;

// ── Scope ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Witness,
    Cell,
    Faction,
}

/// Identifies one profile. Ids from different scopes never collide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ScopeKey {
    Witness(EntityId),
    Cell(CellId),
    Faction(FactionId),
}

impl ScopeKey {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Witness(_) => ScopeKind::Witness,
            Self::Cell(_)    => ScopeKind::Cell,
            Self::Faction(_) => ScopeKind::Faction,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Witness(id) | Self::Cell(id) | Self::Faction(id) => id,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Witness(id) => format!("Witness::{id}"),
            Self::Cell(id)    => format!("Cell {id}"),
            Self::Faction(id) => format!("Faction {id}"),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Witness(id) => write!(f, "witness:{id}"),
            Self::Cell(id)    => write!(f, "cell:{id}"),
            Self::Faction(id) => write!(f, "faction:{id}"),
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TraitSample {
    pub value:           f64,
    pub confidence:      f64,
    pub last_updated_at: Timestamp,
    pub decay_seconds:   f64,
    /// Most recent first.
    pub sources:         Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationProfile {
    pub scope:      ScopeKey,
    pub label:      String,
    pub faction_id: Option<FactionId>,
    pub cell_id:    Option<CellId>,
    pub traits:     TraitMap<TraitSample>,
    pub updated_at: Timestamp,
}

impl ReputationProfile {
    pub fn new(
        scope:      ScopeKey,
        faction_id: Option<FactionId>,
        cell_id:    Option<CellId>,
        timestamp:  Timestamp,
        config:     &ProfileConfig,
    ) -> Self {
        Self {
            label: scope.label(),
            scope,
            faction_id,
            cell_id,
            traits: TraitMap::from_fn(|t| TraitSample {
                value:           0.0,
                confidence:      0.0,
                last_updated_at: timestamp,
                decay_seconds:   config.decay_seconds[t],
                sources:         Vec::new(),
            }),
            updated_at: timestamp,
        }
    }

    pub fn sample(&self, t: ReputationTrait) -> &TraitSample {
        &self.traits[t]
    }
}

/// One change to one trait of one profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileMutation {
    pub scope:            ScopeKey,
    pub faction_id:       Option<FactionId>,
    pub cell_id:          Option<CellId>,
    #[serde(rename = "trait")]
    pub trait_:           ReputationTrait,
    pub delta:            f64,
    pub confidence:       f64,
    pub source_record_id: String,
    pub witness_id:       Option<EntityId>,
}

/// Fold a mutation into a profile.
pub fn apply_mutation(
    profile:   &mut ReputationProfile,
    mutation:  &ProfileMutation,
    timestamp: Timestamp,
    config:    &ProfileConfig,
) {
    let limit = config.value_clamp;
    let sample = &mut profile.traits[mutation.trait_];

    let delta = clamp(mutation.delta, -limit, limit);
    sample.value = clamp(sample.value + delta, -limit, limit);
    sample.confidence = clamp01(
        sample.confidence + clamp01(mutation.confidence) * (1.0 - sample.confidence * 0.5),
    );
    sample.last_updated_at = timestamp;

    if !mutation.source_record_id.is_empty() {
        sample.sources.insert(0, mutation.source_record_id.clone());
        sample.sources.truncate(config.max_source_ids);
    }

    profile.updated_at = timestamp;
}

/// Move every trait toward zero value and zero confidence.
///
/// Monotone: for `elapsed_seconds > 0` neither |value| nor confidence grows.
pub fn apply_decay(profile: &mut ReputationProfile, elapsed_seconds: f64, timestamp: Timestamp) {
    for (_, sample) in profile.traits.iter_mut() {
        let ratio = clamp01(elapsed_seconds / sample.decay_seconds);
        if ratio <= 0.0 {
            continue;
        }

        sample.value -= sample.value * ratio * 0.5;
        sample.confidence = clamp01(sample.confidence - sample.confidence * ratio * 0.6);
        sample.last_updated_at = timestamp;

        if sample.value.abs() < VALUE_SNAP {
            sample.value = 0.0;
        }
        if sample.confidence < CONFIDENCE_SNAP {
            sample.confidence = 0.0;
            sample.sources.clear();
        }
    }
    profile.updated_at = timestamp;
}

/// Fan each interpreted trait delta out into witness, faction and cell
/// mutations. The faction mutation is skipped when no faction is known.
pub fn mutations_from_records(records: &[WitnessRecord]) -> Vec<ProfileMutation> {
    let mut mutations = Vec::with_capacity(records.len() * 3);

    for record in records {
        for td in &record.traits {
            let conf = td.confidence;
            let base = |scope: ScopeKey, delta: f64, confidence: f64| ProfileMutation {
                scope,
                faction_id: record.faction_id.clone(),
                cell_id: Some(record.cell_id.clone()),
                trait_: td.trait_,
                delta,
                confidence,
                source_record_id: record.id.clone(),
                witness_id: Some(record.witness_id.clone()),
            };

            mutations.push(base(ScopeKey::Witness(record.witness_id.clone()), td.delta, conf));

            if let Some(faction) = &record.faction_id {
                let mut m = base(
                    ScopeKey::Faction(faction.clone()),
                    td.delta * (FACTION_DELTA_BASE + conf * FACTION_DELTA_PER_CONF),
                    conf * FACTION_CONFIDENCE_SCALE,
                );
                m.cell_id = None;
                mutations.push(m);
            }

            mutations.push(base(
                ScopeKey::Cell(record.cell_id.clone()),
                td.delta * (CELL_DELTA_BASE + conf * CELL_DELTA_PER_CONF),
                conf * CELL_CONFIDENCE_SCALE,
            ));
        }
    }

    mutations
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Owns every profile for one session. Iteration order is by scope key.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    config:   ProfileConfig,
    profiles: BTreeMap<ScopeKey, ReputationProfile>,
}

impl ProfileStore {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config, profiles: BTreeMap::new() }
    }

    pub fn get(&self, key: &ScopeKey) -> Option<&ReputationProfile> {
        self.profiles.get(key)
    }

    /// # Panics
    /// Panics if the scope has never been mutated. Use `get` when absence
    /// is a normal outcome.
    pub fn profile(&self, key: &ScopeKey) -> &ReputationProfile {
        match self.profiles.get(key) {
            Some(profile) => profile,
            None => panic!("profile for scope {key} does not exist"),
        }
    }

    /// Apply a mutation, creating the target profile on first touch.
    pub fn apply(&mut self, mutation: &ProfileMutation, timestamp: Timestamp) {
        let config = &self.config;
        let profile = self.profiles.entry(mutation.scope.clone()).or_insert_with(|| {
            let faction_id = match &mutation.scope {
                ScopeKey::Faction(id) => Some(id.clone()),
                _ => None,
            };
            let cell_id = match &mutation.scope {
                ScopeKey::Cell(id) => Some(id.clone()),
                _ => None,
            };
            ReputationProfile::new(mutation.scope.clone(), faction_id, cell_id, timestamp, config)
        });
        apply_mutation(profile, mutation, timestamp, config);
    }

    pub fn apply_all(&mut self, mutations: &[ProfileMutation], timestamp: Timestamp) {
        for mutation in mutations {
            self.apply(mutation, timestamp);
        }
    }

    pub fn decay_all(&mut self, elapsed_seconds: f64, timestamp: Timestamp) {
        for profile in self.profiles.values_mut() {
            apply_decay(profile, elapsed_seconds, timestamp);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReputationProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
