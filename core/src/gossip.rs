//! Rumor graph: how witnessed events spread between observers.
//!
//! Observers near each other form a weighted, directed social graph. Every
//! witness seeds one rumor per believed trait; each tick rumors fade,
//! emit a cell mutation, and hop along the strongest affordable edges.
//!
//! RULE: Hops produced during a pass are delivered after the pass. A rumor
//! moves at most one edge per tick, whatever the carrier iteration order.
//!
//! RULE: Edges never spend energy they do not hold, and regenerate a
//! fixed amount per pass up to their cap.

use crate::{
    config::GossipConfig,
    event::{Intensity, ReputationEvent},
    geometry::{clamp, clamp01, distance_between, resolve_cell_id},
    interpretation::WitnessRecord,
    profile::{ProfileMutation, ScopeKey},
    trait_map::ReputationTrait,
    types::{CellId, EntityId, Timestamp, ZoneId},
    world::Observer,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MIN_EDGE_WEIGHT:           f64 = 0.05;
const LATENCY_MIN_SECONDS:       f64 = 20.0;
const LATENCY_MAX_SECONDS:       f64 = 120.0;
const RUMOR_MUTATION_CONFIDENCE: f64 = 0.65;
const HOP_STRENGTH_BASE:         f64 = 0.65;
const HOP_STRENGTH_PER_WEIGHT:   f64 = 0.25;
const HOP_CONFIDENCE_BASE:       f64 = 0.75;
const HOP_CONFIDENCE_PER_WEIGHT: f64 = 0.15;
const HOP_TTL_RETAINED:          f64 = 0.85;
const HOP_TTL_FLOOR_FRACTION:    f64 = 0.25;

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GossipEdgeState {
    /// `"{from_id}::{to_id}"`
    pub id:               String,
    pub from_id:          EntityId,
    pub to_id:            EntityId,
    pub from_cell:        CellId,
    pub to_cell:          CellId,
    pub weight:           f64,
    pub latency_seconds:  f64,
    pub remaining_energy: f64,
    pub max_energy:       f64,
    pub last_shared_at:   Option<Timestamp>,
}

impl GossipEdgeState {
    fn new(from: &Observer, to: &Observer, weight: f64, cell_size: f64, config: &GossipConfig) -> Self {
        Self {
            id:               edge_id(&from.id, &to.id),
            from_id:          from.id.clone(),
            to_id:            to.id.clone(),
            from_cell:        resolve_cell_id(from.position, cell_size),
            to_cell:          resolve_cell_id(to.position, cell_size),
            weight:           clamp(weight, MIN_EDGE_WEIGHT, 1.0),
            latency_seconds:  clamp(60.0 * (1.2 - weight), LATENCY_MIN_SECONDS, LATENCY_MAX_SECONDS),
            remaining_energy: config.max_edge_energy * weight,
            max_energy:       config.max_edge_energy,
            last_shared_at:   None,
        }
    }
}

pub fn edge_id(from_id: &str, to_id: &str) -> String {
    format!("{from_id}::{to_id}")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

impl Polarity {
    /// Zero counts as positive.
    pub fn of(delta: f64) -> Self {
        if delta < 0.0 { Self::Negative } else { Self::Positive }
    }

    pub fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// Rumor identity: one carrier, one trait, one event.
pub fn rumor_id(carrier_id: &str, t: ReputationTrait, event_id: &str) -> String {
    format!("{carrier_id}:{t}:{event_id}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GossipRumor {
    pub id:                String,
    pub event_id:          String,
    pub origin_witness_id: EntityId,
    pub carrier_id:        EntityId,
    #[serde(rename = "trait")]
    pub trait_:            ReputationTrait,
    pub polarity:          Polarity,
    pub strength:          f64,
    pub confidence:        f64,
    pub ttl_seconds:       f64,
    /// Strength lost per elapsed second.
    pub decay_rate:        f64,
    pub last_updated_at:   Timestamp,
    pub origin_cell_id:    CellId,
    pub origin_zone_id:    ZoneId,
    pub intensity:         Intensity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RumorCarrierState {
    pub carrier_id: EntityId,
    pub cell_id:    CellId,
    pub zone_id:    ZoneId,
    pub rumors:     Vec<GossipRumor>,
}

impl RumorCarrierState {
    pub fn new(carrier_id: impl Into<EntityId>, cell_id: impl Into<CellId>, zone_id: impl Into<ZoneId>) -> Self {
        Self {
            carrier_id: carrier_id.into(),
            cell_id:    cell_id.into(),
            zone_id:    zone_id.into(),
            rumors:     Vec::new(),
        }
    }

    pub fn rumor(&self, id: &str) -> Option<&GossipRumor> {
        self.rumors.iter().find(|r| r.id == id)
    }

    /// Merge a rumor under its id: strengths add (capped at 1), the higher
    /// confidence and longer TTL win. A new id over capacity evicts the
    /// weakest rumor, which may be the newcomer. Returns the evicted id.
    pub fn absorb(&mut self, rumor: GossipRumor, capacity: usize) -> Option<String> {
        if let Some(existing) = self.rumors.iter_mut().find(|r| r.id == rumor.id) {
            existing.strength = clamp01(existing.strength + rumor.strength);
            existing.confidence = clamp01(existing.confidence.max(rumor.confidence));
            existing.ttl_seconds = existing.ttl_seconds.max(rumor.ttl_seconds);
            existing.last_updated_at = rumor.last_updated_at;
            return None;
        }

        self.rumors.push(rumor);
        if self.rumors.len() <= capacity {
            return None;
        }
        self.rumors.sort_by(|a, b| b.strength.total_cmp(&a.strength).then_with(|| a.id.cmp(&b.id)));
        self.rumors.pop().map(|r| r.id)
    }
}

/// The result of one `advance_rumors` pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationUpdate {
    pub carriers:        Vec<RumorCarrierState>,
    pub edges:           Vec<GossipEdgeState>,
    pub mutations:       Vec<ProfileMutation>,
    /// Edges that could no longer afford a hop at some point in the pass.
    pub exhausted_edges: Vec<String>,
}

// ── Social graph ─────────────────────────────────────────────────────────────

fn neighbor_weight(source: &Observer, target: &Observer, distance: f64, config: &GossipConfig) -> f64 {
    let mut weight = clamp01(1.0 - distance / (config.neighbor_distance + 1.0));

    let shared = source.social_tags.iter().filter(|tag| target.has_tag(tag)).count();
    weight += shared as f64 * config.shared_tag_bonus;

    if let (Some(a), Some(b)) = (&source.faction_id, &target.faction_id) {
        if a == b {
            weight += config.same_faction_bonus;
        }
    }

    clamp01(weight)
}

/// Directed edges from each observer to its strongest nearby neighbors.
///
/// Idempotent: the same roster always yields the same edges in the same
/// order. Neighbor ties break on id.
pub fn build_social_edges(
    observers: &[Observer],
    cell_size: f64,
    config:    &GossipConfig,
) -> Vec<GossipEdgeState> {
    if observers.len() < 2 {
        return Vec::new();
    }

    let mut edges = Vec::new();
    for source in observers {
        let mut neighbors: Vec<(&Observer, f64)> = observers
            .iter()
            .filter(|other| other.id != source.id)
            .filter_map(|other| {
                let distance = distance_between(source.position, other.position);
                if !distance.is_finite() || distance > config.neighbor_distance {
                    return None;
                }
                let weight = neighbor_weight(source, other, distance, config);
                (weight > 0.0).then_some((other, weight))
            })
            .collect();

        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        neighbors.truncate(config.max_neighbors);

        edges.extend(
            neighbors
                .into_iter()
                .map(|(other, weight)| GossipEdgeState::new(source, other, weight, cell_size, config)),
        );
    }
    edges
}

// ── Seeding ──────────────────────────────────────────────────────────────────

/// One carrier per witness holding one rumor per sufficiently strong trait.
pub fn seed_rumors_from_witness_records(
    event:   &ReputationEvent,
    records: &[WitnessRecord],
    config:  &GossipConfig,
) -> Vec<RumorCarrierState> {
    let mut carriers: BTreeMap<EntityId, RumorCarrierState> = BTreeMap::new();
    let intensity_weight = event.intensity_weight();

    for record in records {
        for td in &record.traits {
            let strength = clamp01(td.delta.abs() / 100.0) * clamp01(td.confidence) * intensity_weight;
            if strength <= config.min_rumor_strength {
                continue;
            }

            let carrier = carriers
                .entry(record.witness_id.clone())
                .or_insert_with(|| RumorCarrierState::new(&record.witness_id, &record.cell_id, &record.zone_id));

            let rumor = GossipRumor {
                id:                rumor_id(&record.witness_id, td.trait_, &event.id),
                event_id:          event.id.clone(),
                origin_witness_id: record.witness_id.clone(),
                carrier_id:        record.witness_id.clone(),
                trait_:            td.trait_,
                polarity:          Polarity::of(td.delta),
                strength:          clamp01(strength),
                confidence:        clamp01(td.confidence),
                ttl_seconds:       config.rumor_ttl_seconds,
                decay_rate:        1.0 / config.rumor_ttl_seconds,
                last_updated_at:   record.timestamp,
                origin_cell_id:    record.cell_id.clone(),
                origin_zone_id:    record.zone_id.clone(),
                intensity:         event.intensity,
            };
            carrier.absorb(rumor, config.max_rumors_per_carrier);
        }
    }

    carriers.into_values().collect()
}

// ── Propagation ──────────────────────────────────────────────────────────────

fn rumor_mutation(carrier: &RumorCarrierState, rumor: &GossipRumor, config: &GossipConfig) -> ProfileMutation {
    let cap = config.max_rumor_trait_delta;
    let magnitude = clamp(rumor.strength * rumor.confidence * cap, 0.0, cap);
    ProfileMutation {
        scope:            ScopeKey::Cell(carrier.cell_id.clone()),
        faction_id:       None,
        cell_id:          Some(carrier.cell_id.clone()),
        trait_:           rumor.trait_,
        delta:            magnitude * rumor.polarity.sign(),
        confidence:       clamp01(rumor.confidence * RUMOR_MUTATION_CONFIDENCE),
        source_record_id: rumor.id.clone(),
        witness_id:       Some(rumor.origin_witness_id.clone()),
    }
}

struct PendingHop {
    target_id:   EntityId,
    target_cell: CellId,
    zone_id:     ZoneId,
    rumor:       GossipRumor,
}

/// Run one propagation pass in place. Returns mutations and exhausted edge ids.
fn propagate(
    carriers:        &mut BTreeMap<EntityId, RumorCarrierState>,
    edges:           &mut [GossipEdgeState],
    timestamp:       Timestamp,
    elapsed_seconds: f64,
    config:          &GossipConfig,
) -> (Vec<ProfileMutation>, Vec<String>) {
    let mut mutations = Vec::new();
    let mut exhausted: Vec<String> = Vec::new();
    let mut pending: Vec<PendingHop> = Vec::new();

    let mut outgoing: BTreeMap<EntityId, Vec<usize>> = BTreeMap::new();
    for (index, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from_id.clone()).or_default().push(index);
    }

    let elapsed = if elapsed_seconds.is_finite() { elapsed_seconds.max(0.0) } else { 0.0 };

    for carrier in carriers.values_mut() {
        carrier.rumors.retain_mut(|rumor| {
            rumor.strength = clamp01(rumor.strength - rumor.decay_rate * elapsed);
            rumor.ttl_seconds -= elapsed;
            rumor.last_updated_at = timestamp;
            rumor.ttl_seconds > 0.0 && rumor.strength >= config.min_rumor_strength
        });

        for rumor in &carrier.rumors {
            mutations.push(rumor_mutation(carrier, rumor, config));

            let Some(candidates) = outgoing.get(&carrier.carrier_id) else {
                continue;
            };

            let mut affordable: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| edges[i].remaining_energy >= config.energy_cost_per_hop)
                .collect();
            affordable.sort_by(|&a, &b| {
                edges[b].weight
                    .total_cmp(&edges[a].weight)
                    .then_with(|| edges[a].to_id.cmp(&edges[b].to_id))
            });
            affordable.truncate(config.max_hops_per_rumor);

            let cross_cell_allowed = rumor.intensity.weight() >= config.cross_cell_intensity_threshold;

            for index in affordable {
                let edge = &mut edges[index];
                let target_cell = edge.to_cell.clone();
                if target_cell != carrier.cell_id && !cross_cell_allowed {
                    continue;
                }

                edge.remaining_energy =
                    clamp(edge.remaining_energy - config.energy_cost_per_hop, 0.0, edge.max_energy);
                edge.last_shared_at = Some(timestamp);
                if edge.remaining_energy < config.energy_cost_per_hop && !exhausted.contains(&edge.id) {
                    exhausted.push(edge.id.clone());
                }

                let weight = edge.weight;
                pending.push(PendingHop {
                    target_id: edge.to_id.clone(),
                    target_cell,
                    zone_id: carrier.zone_id.clone(),
                    rumor: GossipRumor {
                        id:              rumor_id(&edge.to_id, rumor.trait_, &rumor.event_id),
                        carrier_id:      edge.to_id.clone(),
                        strength:        clamp01(rumor.strength * (HOP_STRENGTH_BASE + weight * HOP_STRENGTH_PER_WEIGHT)),
                        confidence:      clamp01(rumor.confidence * (HOP_CONFIDENCE_BASE + weight * HOP_CONFIDENCE_PER_WEIGHT)),
                        ttl_seconds:     (rumor.ttl_seconds * HOP_TTL_RETAINED)
                            .max(config.rumor_ttl_seconds * HOP_TTL_FLOOR_FRACTION),
                        last_updated_at: timestamp,
                        ..rumor.clone()
                    },
                });
            }
        }
    }

    for hop in pending {
        let carrier = carriers
            .entry(hop.target_id.clone())
            .or_insert_with(|| RumorCarrierState::new(&hop.target_id, &hop.target_cell, &hop.zone_id));
        if let Some(evicted) = carrier.absorb(hop.rumor, config.max_rumors_per_carrier) {
            log::debug!("carrier={} evicted rumor={evicted}", carrier.carrier_id);
        }
    }

    carriers.retain(|_, carrier| !carrier.rumors.is_empty());

    for edge in edges.iter_mut() {
        edge.remaining_energy = clamp(edge.remaining_energy + config.energy_per_tick, 0.0, edge.max_energy);
    }

    (mutations, exhausted)
}

/// Advance every rumor by `elapsed_seconds`.
///
/// Inputs are not modified; the updated carriers and edges are returned
/// alongside the cell mutations the surviving rumors emit.
pub fn advance_rumors(
    timestamp:       Timestamp,
    elapsed_seconds: f64,
    carriers:        &[RumorCarrierState],
    edges:           &[GossipEdgeState],
    config:          &GossipConfig,
) -> PropagationUpdate {
    if carriers.is_empty() {
        return PropagationUpdate {
            carriers: Vec::new(),
            edges: edges.to_vec(),
            ..Default::default()
        };
    }

    let mut carrier_map: BTreeMap<EntityId, RumorCarrierState> = BTreeMap::new();
    for carrier in carriers {
        match carrier_map.get_mut(&carrier.carrier_id) {
            Some(existing) => {
                for rumor in &carrier.rumors {
                    existing.absorb(rumor.clone(), config.max_rumors_per_carrier);
                }
            }
            None => {
                carrier_map.insert(carrier.carrier_id.clone(), carrier.clone());
            }
        }
    }
    let mut edges = edges.to_vec();

    let (mutations, exhausted_edges) = propagate(&mut carrier_map, &mut edges, timestamp, elapsed_seconds, config);

    PropagationUpdate {
        carriers: carrier_map.into_values().collect(),
        edges,
        mutations,
        exhausted_edges,
    }
}

// ── Network state ────────────────────────────────────────────────────────────

/// Carriers and edges owned by one session.
#[derive(Debug, Clone)]
pub struct RumorNetwork {
    config:   GossipConfig,
    carriers: BTreeMap<EntityId, RumorCarrierState>,
    edges:    Vec<GossipEdgeState>,
}

impl RumorNetwork {
    pub fn new(config: GossipConfig) -> Self {
        Self { config, carriers: BTreeMap::new(), edges: Vec::new() }
    }

    /// Rebuild the graph from the current roster. Edges whose id survives
    /// keep their spent energy and last-shared time.
    pub fn rebuild_edges(&mut self, observers: &[Observer], cell_size: f64) {
        let previous: BTreeMap<String, (f64, Option<Timestamp>)> = self
            .edges
            .iter()
            .map(|e| (e.id.clone(), (e.remaining_energy, e.last_shared_at)))
            .collect();

        let mut edges = build_social_edges(observers, cell_size, &self.config);
        for edge in &mut edges {
            if let Some((energy, last_shared_at)) = previous.get(&edge.id) {
                edge.remaining_energy = clamp(*energy, 0.0, edge.max_energy);
                edge.last_shared_at = *last_shared_at;
            }
        }
        self.edges = edges;
    }

    /// Merge freshly seeded carriers into the network, rumor by rumor.
    pub fn seed(&mut self, seeded: Vec<RumorCarrierState>) {
        let capacity = self.config.max_rumors_per_carrier;
        for incoming in seeded {
            match self.carriers.get_mut(&incoming.carrier_id) {
                Some(carrier) => {
                    carrier.cell_id = incoming.cell_id;
                    carrier.zone_id = incoming.zone_id;
                    for rumor in incoming.rumors {
                        if let Some(evicted) = carrier.absorb(rumor, capacity) {
                            log::debug!("carrier={} evicted rumor={evicted}", carrier.carrier_id);
                        }
                    }
                }
                None => {
                    self.carriers.insert(incoming.carrier_id.clone(), incoming);
                }
            }
        }
    }

    /// One propagation pass; see `advance_rumors`.
    pub fn advance(&mut self, timestamp: Timestamp, elapsed_seconds: f64) -> (Vec<ProfileMutation>, Vec<String>) {
        if self.carriers.is_empty() {
            return (Vec::new(), Vec::new());
        }
        propagate(&mut self.carriers, &mut self.edges, timestamp, elapsed_seconds, &self.config)
    }

    pub fn carrier(&self, carrier_id: &str) -> Option<&RumorCarrierState> {
        self.carriers.get(carrier_id)
    }

    pub fn carriers(&self) -> impl Iterator<Item = &RumorCarrierState> {
        self.carriers.values()
    }

    pub fn edges(&self) -> &[GossipEdgeState] {
        &self.edges
    }

    pub fn rumor_count(&self) -> usize {
        self.carriers.values().map(|c| c.rumors.len()).sum()
    }
}
