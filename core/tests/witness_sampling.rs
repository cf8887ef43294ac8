//! Witness sampler tests.
//!
//! Tests cover: direct vs rumor-only classification, the rumor floor,
//! line-of-sight obstruction, faction/bias resolution and ordering.

use hearsay_core::{
    config::ReputationConfig,
    event::{create_reputation_event, Intensity, ReputationEvent, ReputationEventInput},
    rng::SeededRng,
    trait_map::ReputationTrait::*,
    types::Position,
    witness::{sample_witnesses, SamplingParams},
    world::{Observer, Tile, ZoneMap},
};

fn event() -> ReputationEvent {
    let mut input = ReputationEventInput::new("player-1", "zone::test", Position::new(5.0, 5.0), Intensity::Moderate)
        .with_trait(Heroic, 18.0)
        .at(1000.0);
    input.visibility.base = Some(0.95);
    input.visibility.noise_level = Some(0.75);
    input.visibility.lighting_factor = Some(1.0);
    input.visibility.disguise_factor = Some(1.0);
    create_reputation_event(&input, 0.0, 12.0, &mut SeededRng::new(3))
}

#[test]
fn close_observer_is_a_direct_witness() {
    let config = ReputationConfig::default_test();
    let map = ZoneMap::open("zone::test", 10, 10);
    let observers = [Observer::new("npc-1", Position::new(6.0, 5.0)).with_tags(&["resistance"])];
    let params = SamplingParams::new(1.0, 0.7, 0.0, &config);

    let candidates = sample_witnesses(&event(), &map, &observers, None, &params, &config);

    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.witness_id, "npc-1");
    assert!(!c.is_rumor_only);
    assert!(c.visibility_score > 0.6, "score {}", c.visibility_score);
    assert_eq!(c.faction_id.as_deref(), Some("resistance"));
    assert_eq!(c.bias.trait_weights[Heroic], 1.0);
}

#[test]
fn faint_observer_hears_only_rumors() {
    let config = ReputationConfig::default_test();
    let map = ZoneMap::open("zone::test", 20, 20);
    let observers = [Observer::new("npc-near", Position::new(8.0, 5.0)).with_tags(&["scavenger"])];
    let params = SamplingParams::new(0.8, 0.35, 0.15, &config).with_visibility_threshold(0.85);

    let candidates = sample_witnesses(&event(), &map, &observers, None, &params, &config);

    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert!(c.is_rumor_only);
    assert!(c.visibility_score > 0.45 && c.visibility_score < 0.85, "score {}", c.visibility_score);
    assert_eq!(c.faction_id.as_deref(), Some("scavengers"));
}

#[test]
fn classification_follows_threshold_and_floor() {
    let config = ReputationConfig::default_test();
    let map = ZoneMap::open("zone::test", 40, 40);
    let observers: Vec<Observer> = (0..20)
        .map(|i| Observer::new(format!("npc-{i:02}"), Position::new(5.0 + i as f64 * 1.3, 5.0 + i as f64 * 0.4)))
        .collect();
    let params = SamplingParams::new(0.75, 0.55, 0.2, &config);

    let candidates = sample_witnesses(&event(), &map, &observers, None, &params, &config);

    for c in &candidates {
        assert!((0.0..=1.0).contains(&c.visibility_score));
        assert!(c.visibility_score >= config.witness.rumor_threshold);
        assert_eq!(c.is_rumor_only, c.visibility_score < params.visibility_threshold);
        assert!((0.0..=1.0).contains(&c.base_confidence));
    }
    // Sorted by descending visibility.
    for pair in candidates.windows(2) {
        assert!(pair[0].visibility_score >= pair[1].visibility_score);
    }
    assert!(candidates.len() < observers.len(), "far observers must be dropped");
}

#[test]
fn walls_reduce_visibility() {
    let config = ReputationConfig::default_test();
    let open = ZoneMap::open("zone::test", 20, 20);
    let mut walled = ZoneMap::open("zone::test", 20, 20);
    for y in 0..20 {
        walled.set_tile(7, y, Tile::WALL);
    }
    let observers = [Observer::new("npc-1", Position::new(9.0, 5.0))];
    let params = SamplingParams::new(1.0, 0.7, 0.0, &config);

    let seen = sample_witnesses(&event(), &open, &observers, None, &params, &config);
    let blocked = sample_witnesses(&event(), &walled, &observers, None, &params, &config);

    assert_eq!(seen.len(), 1);
    let blocked_score = blocked.first().map(|c| c.visibility_score).unwrap_or(0.0);
    assert!(blocked_score < seen[0].visibility_score);
}

#[test]
fn observers_beyond_range_are_ignored() {
    let config = ReputationConfig::default_test();
    let map = ZoneMap::open("zone::test", 60, 60);
    let observers = [Observer::new("far", Position::new(40.0, 5.0))];
    let params = SamplingParams::new(1.0, 1.0, 0.0, &config);

    assert!(sample_witnesses(&event(), &map, &observers, None, &params, &config).is_empty());
}

#[test]
fn bias_comes_from_override_then_faction_then_zone() {
    let config = ReputationConfig::default_test();
    let map = ZoneMap::open("zone::test", 10, 10);
    let mut custom = Observer::new("custom", Position::new(6.0, 5.0)).with_tags(&["gossip_hub"]);
    custom.reputation_bias = Some(hearsay_core::trait_map::TraitMap::splat(0.5));
    let observers = [
        custom,
        Observer::new("guard", Position::new(5.0, 6.0)).with_tags(&["corpsec", "guard"]),
        Observer::new("local", Position::new(4.0, 5.0)),
    ];
    let params = SamplingParams::new(1.0, 0.7, 0.0, &config);

    let candidates = sample_witnesses(&event(), &map, &observers, Some("civilians"), &params, &config);
    let find = |id: &str| candidates.iter().find(|c| c.witness_id == id).unwrap();

    let custom = find("custom");
    assert_eq!(custom.bias.trait_weights[Heroic], 0.5);
    assert_eq!(custom.bias.skepticism, 0.35);
    assert_eq!(custom.bias.appetite_for_rumors, 0.75);

    let guard = find("guard");
    assert_eq!(guard.faction_id.as_deref(), Some("corpsec"));
    assert_eq!(guard.bias.trait_weights[Intimidating], 0.8);
    assert_eq!(guard.bias.appetite_for_rumors, 0.25);

    let local = find("local");
    assert_eq!(local.faction_id.as_deref(), Some("civilians"));
    assert_eq!(local.bias.trait_weights[Cruel], -0.8);
    assert_eq!(local.bias.skepticism, 0.55);
}
