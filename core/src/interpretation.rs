//! Interpretation: turning what an observer saw into what they believe.
//!
//! Each witness candidate's bias reshapes the event's trait deltas:
//! per-trait weights rescale them, skepticism and rumor distance erode
//! confidence, and anything too uncertain to matter is dropped.

use crate::{
    config::ReputationConfig,
    event::ReputationEvent,
    geometry::{clamp, clamp01},
    rng::uuid_from_seed,
    trait_map::ReputationTrait,
    types::{CellId, EntityId, FactionId, Timestamp, ZoneId},
    witness::{WitnessBias, WitnessCandidate},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeltaSource {
    Witness,
    Rumor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraitDelta {
    #[serde(rename = "trait")]
    pub trait_:     ReputationTrait,
    pub delta:      f64,
    pub confidence: f64,
    pub source:     DeltaSource,
}

/// One observer's belief about one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WitnessRecord {
    pub id:               String,
    pub event_id:         String,
    pub witness_id:       EntityId,
    pub witness_name:     String,
    pub faction_id:       Option<FactionId>,
    pub zone_id:          ZoneId,
    pub cell_id:          CellId,
    pub timestamp:        Timestamp,
    pub visibility_score: f64,
    /// Mean of the surviving trait confidences.
    pub confidence:       f64,
    pub is_rumor_only:    bool,
    pub traits:           Vec<TraitDelta>,
}

/// Interpret every candidate's view of the event.
///
/// Records with no surviving trait deltas are omitted. Record ids are
/// derived from `"{event_id}:{witness_id}"` so repeated runs agree.
pub fn interpret_witness_records(
    event:      &ReputationEvent,
    candidates: &[WitnessCandidate],
    config:     &ReputationConfig,
) -> Vec<WitnessRecord> {
    candidates
        .iter()
        .filter_map(|candidate| interpret_candidate(event, candidate, config))
        .collect()
}

fn interpret_candidate(
    event:     &ReputationEvent,
    candidate: &WitnessCandidate,
    config:    &ReputationConfig,
) -> Option<WitnessRecord> {
    let tuning = &config.interpretation;
    let rumor_scale = if candidate.is_rumor_only { tuning.rumor_dampening } else { 1.0 };

    let traits: Vec<TraitDelta> = event
        .traits
        .nonzero()
        .filter_map(|(t, base_delta)| {
            let delta = apply_trait_weight(t, &candidate.bias, base_delta)
                * event.intensity_weight()
                * rumor_scale;
            if delta == 0.0 || !delta.is_finite() {
                return None;
            }
            let confidence = trait_confidence(
                candidate.base_confidence,
                delta.abs(),
                candidate.is_rumor_only,
                &candidate.bias,
                tuning.magnitude_saturation,
            );
            if confidence < tuning.min_confidence_to_apply {
                return None;
            }
            Some(TraitDelta {
                trait_: t,
                delta,
                confidence,
                source: if candidate.is_rumor_only { DeltaSource::Rumor } else { DeltaSource::Witness },
            })
        })
        .collect();

    if traits.is_empty() {
        return None;
    }

    let confidence = clamp01(traits.iter().map(|t| t.confidence).sum::<f64>() / traits.len() as f64);

    Some(WitnessRecord {
        id: uuid_from_seed(&format!("{}:{}", event.id, candidate.witness_id)),
        event_id: event.id.clone(),
        witness_id: candidate.witness_id.clone(),
        witness_name: candidate.name.clone(),
        faction_id: candidate.faction_id.clone(),
        zone_id: candidate.zone_id.clone(),
        cell_id: candidate.cell_id.clone(),
        timestamp: event.timestamp,
        visibility_score: candidate.visibility_score,
        confidence,
        is_rumor_only: candidate.is_rumor_only,
        traits,
    })
}

fn apply_trait_weight(t: ReputationTrait, bias: &WitnessBias, base_delta: f64) -> f64 {
    let weight = bias.trait_weights[t];
    if weight != 0.0 && weight.is_finite() {
        base_delta * weight
    } else {
        base_delta
    }
}

/// `base × clamp(|delta|/saturation, 0.25, 1) × (1 − skepticism) × (1 − rumor_penalty)`
pub fn trait_confidence(
    base_confidence: f64,
    magnitude:       f64,
    is_rumor_only:   bool,
    bias:            &WitnessBias,
    saturation:      f64,
) -> f64 {
    let rumor_penalty = if is_rumor_only {
        0.45 + (1.0 - bias.appetite_for_rumors) * 0.3
    } else {
        0.0
    };
    let weighted = base_confidence
        * clamp(magnitude / saturation, 0.25, 1.0)
        * (1.0 - bias.skepticism);
    clamp01(weighted * (1.0 - rumor_penalty))
}
