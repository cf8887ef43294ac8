//! Contracts with the world collaborators: map tiles, observer roster,
//! environment and player state.
//!
//! The pipeline never fetches anything. Callers hand a `WorldQuery` to
//! `ReputationEngine::ingest_event`, which resolves everything it needs
//! up front so the rest of the pipeline stays pure.

use crate::{
    geometry::{clamp, finite},
    trait_map::TraitMap,
    types::{EntityId, FactionId, Position, ZoneId},
};
use serde::{Deserialize, Serialize};

// ── Map ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Floor,
    Wall,
    Door,
    Cover,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tile {
    pub kind:     TileKind,
    pub walkable: bool,
}

impl Tile {
    pub const FLOOR: Tile = Tile { kind: TileKind::Floor, walkable: true };
    pub const WALL:  Tile = Tile { kind: TileKind::Wall,  walkable: false };
    pub const DOOR:  Tile = Tile { kind: TileKind::Door,  walkable: true };
}

/// Read access to one zone's tiles. `None` means outside the map.
pub trait TileGrid {
    fn tile_at(&self, x: i64, y: i64) -> Option<Tile>;
}

/// A rectangular, row-major tile grid for one zone.
#[derive(Debug, Clone)]
pub struct ZoneMap {
    pub zone_id:         ZoneId,
    pub width:           usize,
    pub height:          usize,
    pub default_faction: Option<FactionId>,
    tiles:               Vec<Tile>,
}

impl ZoneMap {
    /// A map with every tile walkable floor.
    pub fn open(zone_id: impl Into<ZoneId>, width: usize, height: usize) -> Self {
        Self {
            zone_id: zone_id.into(),
            width,
            height,
            default_faction: None,
            tiles: vec![Tile::FLOOR; width * height],
        }
    }

    pub fn with_default_faction(mut self, faction: impl Into<FactionId>) -> Self {
        self.default_faction = Some(faction.into());
        self
    }

    /// # Panics
    /// Panics when (x, y) is outside the grid; map construction bugs are
    /// caller errors, not simulation data.
    pub fn set_tile(&mut self, x: usize, y: usize, tile: Tile) {
        assert!(x < self.width && y < self.height, "set_tile({x}, {y}) outside {}x{}", self.width, self.height);
        self.tiles[y * self.width + x] = tile;
    }
}

impl TileGrid for ZoneMap {
    fn tile_at(&self, x: i64, y: i64) -> Option<Tile> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y * self.width + x).copied()
    }
}

// ── Observers ────────────────────────────────────────────────────────────────

/// One member of the observer roster as supplied by the world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observer {
    pub id:       EntityId,
    pub name:     String,
    pub position: Position,
    #[serde(default)]
    pub social_tags: Vec<String>,
    #[serde(default)]
    pub faction_id: Option<FactionId>,
    /// Explicit per-trait interpretation weights; wins over the faction table.
    #[serde(default)]
    pub reputation_bias: Option<TraitMap<f64>>,
}

impl Observer {
    pub fn new(id: impl Into<EntityId>, position: Position) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            position,
            social_tags: Vec::new(),
            faction_id: None,
            reputation_bias: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.social_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_faction(mut self, faction: impl Into<FactionId>) -> Self {
        self.faction_id = Some(faction.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.social_tags.iter().any(|t| t == tag)
    }
}

// ── Environment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    #[default]
    Day,
    Evening,
    Night,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutTier {
    #[default]
    None,
    Brownout,
    Rolling,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseTier {
    #[default]
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnvironmentState {
    #[serde(default)]
    pub time_of_day: TimeOfDay,
    #[serde(default)]
    pub blackout:    BlackoutTier,
    #[serde(default)]
    pub noise:       NoiseTier,
}

impl EnvironmentState {
    pub fn ambient_lighting(&self) -> f64 {
        let base = match self.time_of_day {
            TimeOfDay::Night                        => 0.55,
            TimeOfDay::Morning | TimeOfDay::Evening => 0.75,
            TimeOfDay::Day                          => 1.0,
        };
        match self.blackout {
            BlackoutTier::Rolling  => base * 0.4,
            BlackoutTier::Brownout => base * 0.65,
            BlackoutTier::None     => base,
        }
    }

    pub fn ambient_noise(&self) -> f64 {
        match self.noise {
            NoiseTier::High   => 0.85,
            NoiseTier::Medium => 0.7,
            NoiseTier::Low    => 0.55,
        }
    }
}

// ── Player ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    #[serde(default)]
    pub stealth: f64,
    #[serde(default = "default_agility")]
    pub agility: f64,
}

fn default_agility() -> f64 {
    5.0
}

impl Default for PlayerState {
    fn default() -> Self {
        Self { stealth: 0.0, agility: default_agility() }
    }
}

impl PlayerState {
    /// How much a known face undermines the actor's disguise, in [0, 0.4].
    pub fn disguise_penalty(&self) -> f64 {
        let stealth_bonus = (self.stealth / 160.0).min(0.25);
        let agility_bonus = ((self.agility - 6.0) * 0.03).max(0.0);
        clamp(0.4 - (stealth_bonus + agility_bonus), 0.0, 0.4)
    }
}

// ── World query ──────────────────────────────────────────────────────────────

/// Everything the pipeline reads from the outside world.
pub trait WorldQuery {
    fn tile_at(&self, zone_id: &str, x: i64, y: i64) -> Option<Tile>;
    fn observers(&self, zone_id: &str) -> Vec<Observer>;
    fn zone_faction(&self, zone_id: &str) -> Option<FactionId>;
    fn environment(&self) -> EnvironmentState;
    fn player(&self) -> PlayerState;
}

/// Everything an ingestion reads from the world except the tile grid,
/// captured once so it can be journaled and replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IngestContext {
    #[serde(default)]
    pub observers:    Vec<Observer>,
    #[serde(default)]
    pub zone_faction: Option<FactionId>,
    #[serde(default)]
    pub environment:  EnvironmentState,
    #[serde(default)]
    pub player:       PlayerState,
}

impl IngestContext {
    pub fn capture(world: &dyn WorldQuery, zone_id: &str) -> Self {
        Self {
            observers:    world.observers(zone_id),
            zone_faction: world.zone_faction(zone_id),
            environment:  world.environment(),
            player:       world.player(),
        }
    }

    /// Replace every non-finite number so the context journals without loss.
    /// A non-finite bias weight becomes 0, which interpretation already
    /// reads as "no opinion".
    pub fn sanitized(mut self) -> Self {
        for observer in &mut self.observers {
            observer.position = Position::new(finite(observer.position.x), finite(observer.position.y));
            if let Some(bias) = &mut observer.reputation_bias {
                for (_, weight) in bias.iter_mut() {
                    if !weight.is_finite() {
                        *weight = 0.0;
                    }
                }
            }
        }
        self.player.stealth = finite(self.player.stealth);
        self.player.agility = finite(self.player.agility);
        self
    }
}

/// Adapts one zone of a `WorldQuery` to the `TileGrid` contract.
pub struct ZoneGrid<'a> {
    pub world:   &'a dyn WorldQuery,
    pub zone_id: &'a str,
}

impl TileGrid for ZoneGrid<'_> {
    fn tile_at(&self, x: i64, y: i64) -> Option<Tile> {
        self.world.tile_at(self.zone_id, x, y)
    }
}

/// A single-zone world with a fixed roster. Used by the runner and tests.
#[derive(Debug, Clone)]
pub struct StaticWorld {
    pub map:         ZoneMap,
    pub observers:   Vec<Observer>,
    pub environment: EnvironmentState,
    pub player:      PlayerState,
}

impl StaticWorld {
    pub fn new(map: ZoneMap, observers: Vec<Observer>) -> Self {
        Self {
            map,
            observers,
            environment: EnvironmentState::default(),
            player: PlayerState::default(),
        }
    }
}

impl WorldQuery for StaticWorld {
    fn tile_at(&self, zone_id: &str, x: i64, y: i64) -> Option<Tile> {
        if zone_id != self.map.zone_id {
            return None;
        }
        self.map.tile_at(x, y)
    }

    fn observers(&self, zone_id: &str) -> Vec<Observer> {
        if zone_id != self.map.zone_id {
            return Vec::new();
        }
        self.observers.clone()
    }

    fn zone_faction(&self, zone_id: &str) -> Option<FactionId> {
        if zone_id != self.map.zone_id {
            return None;
        }
        self.map.default_faction.clone()
    }

    fn environment(&self) -> EnvironmentState {
        self.environment
    }

    fn player(&self) -> PlayerState {
        self.player
    }
}
