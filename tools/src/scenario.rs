//! Scenario files: a zone, its roster, and a script of ingests and ticks.

use anyhow::{anyhow, ensure, Result};
use hearsay_core::{
    event::ReputationEventInput,
    world::{EnvironmentState, Observer, PlayerState, StaticWorld, Tile, ZoneMap},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneSpec {
    pub id:     String,
    pub width:  usize,
    pub height: usize,
    #[serde(default)]
    pub default_faction: Option<String>,
    #[serde(default)]
    pub walls: Vec<[usize; 2]>,
    #[serde(default)]
    pub doors: Vec<[usize; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScenarioStep {
    Ingest {
        event: ReputationEventInput,
    },
    Tick {
        count: u64,
        #[serde(default)]
        seconds: Option<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub zone: ZoneSpec,
    #[serde(default)]
    pub observers: Vec<Observer>,
    #[serde(default)]
    pub environment: EnvironmentState,
    #[serde(default)]
    pub player: PlayerState,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read {path}: {e}"))?;
        let scenario: Scenario = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Cannot parse {path}: {e}"))?;
        log::info!("Loaded scenario '{}' from {path}", scenario.name);
        Ok(scenario)
    }

    /// Build the zone map, rejecting tiles outside the declared bounds.
    pub fn zone_map(&self) -> Result<ZoneMap> {
        let z = &self.zone;
        let mut map = ZoneMap::open(z.id.clone(), z.width, z.height);
        if let Some(faction) = &z.default_faction {
            map = map.with_default_faction(faction.clone());
        }
        for (tiles, tile) in [(&z.walls, Tile::WALL), (&z.doors, Tile::DOOR)] {
            for [x, y] in tiles.iter().copied() {
                ensure!(x < z.width && y < z.height, "tile ({x}, {y}) outside zone {}", z.id);
                map.set_tile(x, y, tile);
            }
        }
        Ok(map)
    }

    pub fn world(&self) -> Result<StaticWorld> {
        let mut world = StaticWorld::new(self.zone_map()?, self.observers.clone());
        world.environment = self.environment;
        world.player = self.player;
        Ok(world)
    }
}
