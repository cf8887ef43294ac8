//! Rumor graph tests.
//!
//! Tests cover: edge construction, seeding, zero-elapsed stability,
//! propagation over ticks, energy bounds, TTL expiry, cross-cell gating
//! and one-hop-per-tick delivery.

use hearsay_core::{
    config::{GossipConfig, ReputationConfig},
    event::{create_reputation_event, Intensity, ReputationEvent, ReputationEventInput},
    gossip::{advance_rumors, build_social_edges, rumor_id, seed_rumors_from_witness_records, RumorNetwork},
    interpretation::{DeltaSource, TraitDelta, WitnessRecord},
    rng::SeededRng,
    trait_map::ReputationTrait::*,
    types::Position,
    world::Observer,
};

const T0: f64 = 1000.0;

fn gossip() -> GossipConfig {
    ReputationConfig::default_test().gossip
}

fn event(intensity: Intensity) -> ReputationEvent {
    let input = ReputationEventInput::new("player", "zone::test", Position::new(5.0, 5.0), intensity)
        .with_trait(Heroic, 20.0)
        .at(T0);
    create_reputation_event(&input, 0.0, 12.0, &mut SeededRng::new(77))
}

fn record(event: &ReputationEvent, witness: &str, cell: &str) -> WitnessRecord {
    WitnessRecord {
        id: format!("rec-{witness}"),
        event_id: event.id.clone(),
        witness_id: witness.to_string(),
        witness_name: witness.to_string(),
        faction_id: Some("resistance".into()),
        zone_id: "zone::test".into(),
        cell_id: cell.to_string(),
        timestamp: T0,
        visibility_score: 0.8,
        confidence: 0.75,
        is_rumor_only: false,
        traits: vec![TraitDelta { trait_: Heroic, delta: 26.0, confidence: 0.9, source: DeltaSource::Witness }],
    }
}

fn pair() -> Vec<Observer> {
    vec![
        Observer::new("npc-1", Position::new(5.0, 5.0)).with_tags(&["resistance"]),
        Observer::new("npc-2", Position::new(7.0, 5.0)).with_tags(&["resistance"]),
    ]
}

#[test]
fn edge_building_is_idempotent() {
    let config = gossip();
    let a = build_social_edges(&pair(), 12.0, &config);
    let b = build_social_edges(&pair(), 12.0, &config);

    assert_eq!(a, b);
    let ids: Vec<&str> = a.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["npc-1::npc-2", "npc-2::npc-1"]);

    let edge = &a[0];
    // 1 − 2/23 + 0.08 shared tag
    assert!((edge.weight - (1.0 - 2.0 / 23.0 + 0.08)).abs() < 1e-12);
    assert!((20.0..=120.0).contains(&edge.latency_seconds));
    assert!(edge.remaining_energy <= edge.max_energy);
    assert_eq!(edge.max_energy, 6.0);
}

#[test]
fn neighbor_count_is_capped() {
    let observers: Vec<Observer> = (0..9)
        .map(|i| Observer::new(format!("npc-{i}"), Position::new(i as f64, 0.0)))
        .collect();
    let edges = build_social_edges(&observers, 12.0, &gossip());

    for o in &observers {
        assert!(edges.iter().filter(|e| e.from_id == o.id).count() <= 5);
    }
}

#[test]
fn seeding_creates_one_carrier_per_witness() {
    let event = event(Intensity::Major);
    let carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &gossip());

    assert_eq!(carriers.len(), 1);
    let rumor = &carriers[0].rumors[0];
    assert_eq!(rumor.id, rumor_id("npc-1", Heroic, &event.id));
    assert!((rumor.strength - 0.26 * 0.9 * 0.85).abs() < 1e-12);
    assert_eq!(rumor.ttl_seconds, 5400.0);
    assert_eq!(rumor.decay_rate, 1.0 / 5400.0);
}

#[test]
fn weak_beliefs_do_not_become_rumors() {
    let event = event(Intensity::Minor);
    let mut weak = record(&event, "npc-1", "0:0");
    weak.traits[0].delta = 10.0;
    assert!(seed_rumors_from_witness_records(&event, &[weak], &gossip()).is_empty());
}

#[test]
fn zero_elapsed_leaves_rumors_unchanged() {
    let config = gossip();
    let event = event(Intensity::Major);
    let edges = build_social_edges(&pair(), 12.0, &config);
    let carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);
    let before = carriers[0].rumors[0].clone();

    let update = advance_rumors(T0, 0.0, &carriers, &edges, &config);

    let after = update
        .carriers
        .iter()
        .find(|c| c.carrier_id == "npc-1")
        .and_then(|c| c.rumor(&before.id))
        .unwrap();
    assert_eq!(after.strength, before.strength);
    assert_eq!(after.ttl_seconds, before.ttl_seconds);
}

#[test]
fn rumors_spread_and_emit_mutations_over_two_ticks() {
    let config = gossip();
    let event = event(Intensity::Major);
    let edges = build_social_edges(&pair(), 12.0, &config);
    assert!(!edges.is_empty());
    let carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);

    let first = advance_rumors(T0 + 60.0, 60.0, &carriers, &edges, &config);
    let second = advance_rumors(T0 + 120.0, 60.0, &first.carriers, &first.edges, &config);

    assert!(!second.mutations.is_empty());
    assert!(second.mutations.iter().any(|m| m.delta != 0.0));
    assert!(second.mutations.iter().all(|m| m.delta.abs() <= config.max_rumor_trait_delta));
    assert!(first.carriers.iter().any(|c| c.carrier_id == "npc-2"), "rumor should reach npc-2");
}

#[test]
fn edge_energy_stays_within_bounds() {
    let config = gossip();
    let event = event(Intensity::Legendary);
    let observers = pair();
    let mut edges = build_social_edges(&observers, 12.0, &config);
    let mut carriers = seed_rumors_from_witness_records(
        &event,
        &[record(&event, "npc-1", "0:0"), record(&event, "npc-2", "0:0")],
        &config,
    );

    for step in 1..=40 {
        let update = advance_rumors(T0 + step as f64 * 30.0, 30.0, &carriers, &edges, &config);
        for edge in &update.edges {
            assert!(edge.remaining_energy >= 0.0 && edge.remaining_energy <= edge.max_energy);
        }
        for carrier in &update.carriers {
            assert!(carrier.rumors.len() <= config.max_rumors_per_carrier);
        }
        carriers = update.carriers;
        edges = update.edges;
    }
}

#[test]
fn expired_rumors_are_removed() {
    let config = gossip();
    let event = event(Intensity::Major);
    let edges = build_social_edges(&pair(), 12.0, &config);
    let mut carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);
    carriers[0].rumors[0].ttl_seconds = 30.0;

    let first = advance_rumors(T0 + 60.0, 60.0, &carriers, &edges, &config);
    assert!(first.mutations.is_empty());
    assert!(first.carriers.is_empty());

    let second = advance_rumors(T0 + 120.0, 60.0, &first.carriers, &first.edges, &config);
    assert!(second.mutations.is_empty());
}

#[test]
fn modest_rumors_stay_in_their_cell() {
    let config = gossip();
    let observers = vec![
        Observer::new("npc-1", Position::new(11.0, 5.0)),
        Observer::new("npc-2", Position::new(13.0, 5.0)),
    ];
    let edges = build_social_edges(&observers, 12.0, &config);
    assert_eq!(edges[0].to_cell, "1:0");

    let moderate = event(Intensity::Moderate);
    let carriers = seed_rumors_from_witness_records(&moderate, &[record(&moderate, "npc-1", "0:0")], &config);
    let update = advance_rumors(T0, 0.0, &carriers, &edges, &config);
    assert!(update.carriers.iter().all(|c| c.carrier_id != "npc-2"));

    let major = event(Intensity::Major);
    let carriers = seed_rumors_from_witness_records(&major, &[record(&major, "npc-1", "0:0")], &config);
    let update = advance_rumors(T0, 0.0, &carriers, &edges, &config);
    let reached = update.carriers.iter().find(|c| c.carrier_id == "npc-2").unwrap();
    assert_eq!(reached.cell_id, "1:0");
    assert!(reached.rumor(&rumor_id("npc-2", Heroic, &major.id)).is_some());
}

#[test]
fn rumors_move_one_hop_per_tick() {
    let config = gossip();
    let observers = vec![
        Observer::new("npc-1", Position::new(0.0, 0.0)),
        Observer::new("npc-2", Position::new(15.0, 0.0)),
        Observer::new("npc-3", Position::new(30.0, 0.0)),
    ];
    let edges = build_social_edges(&observers, 100.0, &config);
    assert!(edges.iter().all(|e| e.id != "npc-1::npc-3"));

    let event = event(Intensity::Major);
    let carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);

    let first = advance_rumors(T0, 0.0, &carriers, &edges, &config);
    assert!(first.carriers.iter().any(|c| c.carrier_id == "npc-2"));
    assert!(first.carriers.iter().all(|c| c.carrier_id != "npc-3"));

    let second = advance_rumors(T0, 0.0, &first.carriers, &first.edges, &config);
    assert!(second.carriers.iter().any(|c| c.carrier_id == "npc-3"));
}

#[test]
fn spent_edges_are_reported_and_regenerate() {
    let mut config = gossip();
    config.max_edge_energy = 2.0;
    let event = event(Intensity::Major);
    let edges = build_social_edges(&pair(), 12.0, &config);
    let carriers = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);

    let update = advance_rumors(T0, 0.0, &carriers, &edges, &config);

    assert_eq!(update.exhausted_edges, vec!["npc-1::npc-2".to_string()]);
    let edge = update.edges.iter().find(|e| e.id == "npc-1::npc-2").unwrap();
    assert_eq!(edge.last_shared_at, Some(T0));
    assert!(edge.remaining_energy <= 2.0 && edge.remaining_energy > 1.0);
}

#[test]
fn network_rebuild_keeps_spent_energy() {
    let config = gossip();
    let event = event(Intensity::Major);
    let mut network = RumorNetwork::new(config.clone());
    network.rebuild_edges(&pair(), 12.0);
    network.seed(seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config));
    let fresh = network.edges()[0].remaining_energy;

    network.advance(T0 + 60.0, 60.0);
    let spent = network.edges()[0].remaining_energy;
    network.rebuild_edges(&pair(), 12.0);

    assert_eq!(network.edges()[0].remaining_energy, spent);
    assert_eq!(network.edges()[0].last_shared_at, Some(T0 + 60.0));
    assert!(spent <= fresh);
}

#[test]
fn reseeding_merges_into_existing_carrier() {
    let config = gossip();
    let event = event(Intensity::Major);
    let mut network = RumorNetwork::new(config.clone());
    let seeded = seed_rumors_from_witness_records(&event, &[record(&event, "npc-1", "0:0")], &config);
    let strength = seeded[0].rumors[0].strength;

    network.seed(seeded.clone());
    network.seed(seeded);

    let carrier = network.carrier("npc-1").unwrap();
    assert_eq!(carrier.rumors.len(), 1);
    assert!((carrier.rumors[0].strength - (strength * 2.0).min(1.0)).abs() < 1e-12);
    assert_eq!(network.rumor_count(), 1);
}
