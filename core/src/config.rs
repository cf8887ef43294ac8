//! Tunables for the reputation pipeline.
//!
//! Defaults reproduce the shipped balance. `load()` reads
//! `{data_dir}/reputation/reputation_config.json`; any section or field
//! missing from the file keeps its default.

use crate::trait_map::{ReputationTrait, TraitMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Witness sampling ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WitnessConfig {
    /// Observers further than this never perceive the event.
    pub max_distance: f64,
    /// Visibility at or above which an observer is a direct witness.
    pub visibility_threshold: f64,
    /// Visibility below which an observer is dropped entirely.
    pub rumor_threshold: f64,
    /// Side length of a reputation cell, in tiles.
    pub cell_size: f64,
    pub sentinel_confidence_bonus: f64,
    pub guard_confidence_bonus: f64,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            max_distance:              24.0,
            visibility_threshold:      0.45,
            rumor_threshold:           0.25,
            cell_size:                 12.0,
            sentinel_confidence_bonus: 0.15,
            guard_confidence_bonus:    0.1,
        }
    }
}

// ── Interpretation ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterpretationConfig {
    /// Trait deltas interpreted with less confidence than this are dropped.
    pub min_confidence_to_apply: f64,
    /// Multiplier on deltas perceived by rumor-only observers.
    pub rumor_dampening: f64,
    /// |delta| at which the magnitude term of confidence saturates.
    pub magnitude_saturation: f64,
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            min_confidence_to_apply: 0.1,
            rumor_dampening:         0.6,
            magnitude_saturation:    30.0,
        }
    }
}

// ── Profiles ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    pub max_source_ids: usize,
    pub value_clamp:    f64,
    /// Per-trait seconds for a full decay ratio.
    pub decay_seconds:  TraitMap<f64>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_source_ids: 5,
            value_clamp:    100.0,
            decay_seconds:  TraitMap::from_fn(ReputationTrait::decay_seconds),
        }
    }
}

// ── Gossip ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GossipConfig {
    pub neighbor_distance:              f64,
    pub max_neighbors:                  usize,
    pub shared_tag_bonus:               f64,
    pub same_faction_bonus:             f64,
    pub max_edge_energy:                f64,
    pub energy_per_tick:                f64,
    pub energy_cost_per_hop:            f64,
    pub rumor_ttl_seconds:              f64,
    pub min_rumor_strength:             f64,
    pub max_rumors_per_carrier:         usize,
    pub max_hops_per_rumor:             usize,
    /// Intensity weight a rumor's origin event needs to cross cells.
    pub cross_cell_intensity_threshold: f64,
    /// Cap on the magnitude of the cell mutation a rumor emits per tick.
    pub max_rumor_trait_delta:          f64,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            neighbor_distance:              22.0,
            max_neighbors:                  5,
            shared_tag_bonus:               0.08,
            same_faction_bonus:             0.15,
            max_edge_energy:                6.0,
            energy_per_tick:                1.0,
            energy_cost_per_hop:            1.0,
            rumor_ttl_seconds:              60.0 * 90.0,
            min_rumor_strength:             0.1,
            max_rumors_per_carrier:         5,
            max_hops_per_rumor:             2,
            cross_cell_intensity_threshold: 0.8,
            max_rumor_trait_delta:          18.0,
        }
    }
}

// ── Faction bias table ─────────────────────────────────────────────────────

/// Faction used when an observer has neither an explicit faction nor a
/// recognizable tag.
pub const DEFAULT_BIAS_FACTION: &str = "civilians";

fn default_faction_biases() -> BTreeMap<String, TraitMap<f64>> {
    use ReputationTrait::*;
    let table = |heroic: f64, cruel: f64, sneaky: f64, intimidating: f64, competent: f64| {
        let mut m: TraitMap<f64> = TraitMap::splat(0.0);
        m[Heroic] = heroic;
        m[Cruel] = cruel;
        m[Sneaky] = sneaky;
        m[Intimidating] = intimidating;
        m[Competent] = competent;
        m
    };
    BTreeMap::from([
        ("resistance".to_string(), table(1.0, -0.6, 0.25, -0.1, 0.5)),
        ("corpsec".to_string(),    table(-0.2, 0.4, -0.4, 0.8, 0.6)),
        ("scavengers".to_string(), table(0.2, 0.1, 0.8, 0.3, 0.4)),
        ("civilians".to_string(),  table(0.8, -0.8, -0.1, -0.2, 0.4)),
    ])
}

// ── Root ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReputationConfig {
    #[serde(default)]
    pub witness:        WitnessConfig,
    #[serde(default)]
    pub interpretation: InterpretationConfig,
    #[serde(default)]
    pub profile:        ProfileConfig,
    #[serde(default)]
    pub gossip:         GossipConfig,
    /// Per-faction trait weights. Missing traits read as 0 (neutral).
    #[serde(default = "default_faction_biases")]
    pub faction_biases: BTreeMap<String, TraitMap<f64>>,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            witness:        WitnessConfig::default(),
            interpretation: InterpretationConfig::default(),
            profile:        ProfileConfig::default(),
            gossip:         GossipConfig::default(),
            faction_biases: default_faction_biases(),
        }
    }
}

impl ReputationConfig {
    /// Load from the data/ directory.
    /// In tests, use ReputationConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/reputation/reputation_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ReputationConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        log::info!("Loaded reputation config from {path}");
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    /// Reject tunables that would break pipeline invariants.
    pub fn validate(&self) -> anyhow::Result<()> {
        let w = &self.witness;
        anyhow::ensure!(w.max_distance > 0.0, "witness.max_distance must be > 0");
        anyhow::ensure!(w.cell_size > 0.0, "witness.cell_size must be > 0");
        anyhow::ensure!(
            (0.0..=1.0).contains(&w.rumor_threshold) && (0.0..=1.0).contains(&w.visibility_threshold),
            "witness thresholds must be in [0, 1]"
        );
        anyhow::ensure!(
            w.rumor_threshold <= w.visibility_threshold,
            "witness.rumor_threshold ({}) must not exceed visibility_threshold ({})",
            w.rumor_threshold,
            w.visibility_threshold
        );

        let p = &self.profile;
        anyhow::ensure!(p.max_source_ids > 0, "profile.max_source_ids must be > 0");
        for (t, seconds) in p.decay_seconds.iter() {
            anyhow::ensure!(*seconds > 0.0, "profile.decay_seconds.{t} must be > 0");
        }

        let g = &self.gossip;
        anyhow::ensure!(g.rumor_ttl_seconds > 0.0, "gossip.rumor_ttl_seconds must be > 0");
        anyhow::ensure!(g.max_edge_energy >= 0.0, "gossip.max_edge_energy must be >= 0");
        anyhow::ensure!(g.energy_cost_per_hop > 0.0, "gossip.energy_cost_per_hop must be > 0");
        anyhow::ensure!(g.max_rumors_per_carrier > 0, "gossip.max_rumors_per_carrier must be > 0");
        anyhow::ensure!(
            self.faction_biases.contains_key(DEFAULT_BIAS_FACTION),
            "faction_biases must contain '{DEFAULT_BIAS_FACTION}'"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ReputationConfig::default_test().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ReputationConfig =
            serde_json::from_str(r#"{ "witness": { "max_distance": 30.0 } }"#).unwrap();
        assert_eq!(config.witness.max_distance, 30.0);
        assert_eq!(config.witness.visibility_threshold, 0.45);
        assert_eq!(config.gossip.max_edge_energy, 6.0);
        assert_eq!(config.faction_biases.len(), 4);
        assert_eq!(config.profile.decay_seconds[ReputationTrait::Sneaky], 2100.0);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = ReputationConfig::default_test();
        config.witness.rumor_threshold = 0.6;
        assert!(config.validate().is_err());
    }
}
