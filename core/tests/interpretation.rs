//! Interpretation tests.
//!
//! Tests cover: bias weighting, direct vs rumor-only confidence, dropping
//! low-confidence traits and empty records, and stable record ids.

use hearsay_core::{
    config::ReputationConfig,
    event::{create_reputation_event, Intensity, ReputationEvent, ReputationEventInput},
    interpretation::{interpret_witness_records, DeltaSource},
    rng::{uuid_from_seed, SeededRng},
    trait_map::{ReputationTrait, ReputationTrait::*, TraitMap},
    types::Position,
    witness::{WitnessBias, WitnessCandidate},
};

fn event(traits: &[(ReputationTrait, f64)]) -> ReputationEvent {
    let mut input = ReputationEventInput::new("player", "zone::test", Position::new(4.0, 4.0), Intensity::Major).at(1000.0);
    for (t, delta) in traits {
        input = input.with_trait(*t, *delta);
    }
    create_reputation_event(&input, 0.0, 12.0, &mut SeededRng::new(9))
}

fn bias(weights: &[(ReputationTrait, f64)], skepticism: f64, appetite: f64) -> WitnessBias {
    let mut trait_weights = TraitMap::splat(0.0);
    for (t, w) in weights {
        trait_weights[*t] = *w;
    }
    WitnessBias { trait_weights, skepticism, appetite_for_rumors: appetite }
}

fn candidate(id: &str, base_confidence: f64, is_rumor_only: bool, bias: WitnessBias) -> WitnessCandidate {
    WitnessCandidate {
        witness_id:       id.to_string(),
        name:             "Witness".into(),
        faction_id:       Some("resistance".into()),
        zone_id:          "zone::test".into(),
        cell_id:          "0:0".into(),
        position:         Position::new(5.0, 4.0),
        distance:         1.0,
        line_of_sight:    0.9,
        distance_factor:  0.8,
        lighting_factor:  0.9,
        noise_factor:     0.7,
        disguise_factor:  0.8,
        visibility_score: if is_rumor_only { 0.4 } else { 0.9 },
        base_confidence,
        is_rumor_only,
        bias,
    }
}

#[test]
fn direct_witness_weights_traits_by_bias() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Heroic, 24.0), (Sneaky, 4.0)]);
    let c = candidate("npc-1", 0.88, false, bias(&[(Heroic, 1.1), (Sneaky, 0.6)], 0.2, 0.5));

    let records = interpret_witness_records(&event, &[c], &config);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    let heroic = record.traits.iter().find(|t| t.trait_ == Heroic).unwrap();
    let sneaky = record.traits.iter().find(|t| t.trait_ == Sneaky).unwrap();
    assert!(heroic.delta > sneaky.delta);
    assert!(heroic.confidence > 0.3, "confidence {}", heroic.confidence);
    assert_eq!(heroic.source, DeltaSource::Witness);
    assert!(!record.is_rumor_only);

    let mean = record.traits.iter().map(|t| t.confidence).sum::<f64>() / record.traits.len() as f64;
    assert!((record.confidence - mean).abs() < 1e-12);
}

#[test]
fn major_heroic_act_seen_directly_is_believed() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Heroic, 22.0)]);
    let direct = candidate("npc-1", 0.85, false, bias(&[(Heroic, 1.1)], 0.2, 0.5));

    let records = interpret_witness_records(&event, &[direct], &config);
    let heroic = &records[0].traits[0];

    assert!(heroic.delta > 0.0);
    assert!(heroic.confidence > 0.3, "confidence {}", heroic.confidence);
}

#[test]
fn rumor_only_observer_is_less_confident() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Heroic, 22.0)]);
    let direct = candidate("npc-direct", 0.85, false, bias(&[(Heroic, 1.1)], 0.2, 1.0));
    let rumor = candidate("npc-rumor", 0.85, true, bias(&[(Heroic, 1.1)], 0.2, 1.0));

    let records = interpret_witness_records(&event, &[direct, rumor], &config);
    assert_eq!(records.len(), 2);
    let (direct, rumor) = (&records[0].traits[0], &records[1].traits[0]);

    assert!(records[1].is_rumor_only);
    assert_eq!(rumor.source, DeltaSource::Rumor);
    assert!(rumor.confidence < direct.confidence);
    assert!(rumor.delta.abs() < direct.delta.abs());
    assert!(rumor.confidence < 0.5);
}

#[test]
fn unset_weight_reads_as_neutral() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Competent, 20.0)]);
    let c = candidate("npc-1", 0.9, false, bias(&[], 0.2, 0.5));

    let records = interpret_witness_records(&event, &[c], &config);
    let competent = &records[0].traits[0];
    // 20 × 0.85 (event) × 1 (weight) × 0.85 (intensity)
    assert!((competent.delta - 20.0 * 0.85 * 0.85).abs() < 1e-9);
}

#[test]
fn unconvinced_witnesses_produce_no_record() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Heroic, 5.0)]);
    let c = candidate("npc-1", 0.3, true, bias(&[(Heroic, 1.0)], 0.8, 0.2));

    assert!(interpret_witness_records(&event, &[c], &config).is_empty());
}

#[test]
fn record_ids_derive_from_event_and_witness() {
    let config = ReputationConfig::default_test();
    let event = event(&[(Heroic, 22.0)]);
    let c = candidate("npc-7", 0.9, false, bias(&[(Heroic, 1.0)], 0.2, 0.5));

    let first = interpret_witness_records(&event, &[c.clone()], &config);
    let second = interpret_witness_records(&event, &[c], &config);

    assert_eq!(first, second);
    assert_eq!(first[0].id, uuid_from_seed(&format!("{}:npc-7", event.id)));
}
