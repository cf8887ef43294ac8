//! The five fixed reputation traits and a dense map indexed by them.
//!
//! RULE: Traits are a closed set. Nothing in the pipeline keys trait data
//! by string; text only crosses into `ReputationTrait` at the edges
//! (config files, IPC) through `FromStr`.

use crate::error::ReputationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationTrait {
    Heroic,
    Cruel,
    Sneaky,
    Intimidating,
    Competent,
}

impl ReputationTrait {
    /// Stable iteration order. NEVER reorder: `TraitMap` indexes by position.
    pub const ALL: [ReputationTrait; 5] = [
        Self::Heroic,
        Self::Cruel,
        Self::Sneaky,
        Self::Intimidating,
        Self::Competent,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::Heroic       => 0,
            Self::Cruel        => 1,
            Self::Sneaky       => 2,
            Self::Intimidating => 3,
            Self::Competent    => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Heroic       => "heroic",
            Self::Cruel        => "cruel",
            Self::Sneaky       => "sneaky",
            Self::Intimidating => "intimidating",
            Self::Competent    => "competent",
        }
    }

    /// Seconds for a full decay ratio of 1.0 on a profile sample.
    pub const fn decay_seconds(self) -> f64 {
        match self {
            Self::Heroic       => 60.0 * 45.0,
            Self::Cruel        => 60.0 * 50.0,
            Self::Sneaky       => 60.0 * 35.0,
            Self::Intimidating => 60.0 * 40.0,
            Self::Competent    => 60.0 * 55.0,
        }
    }
}

impl fmt::Display for ReputationTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReputationTrait {
    type Err = ReputationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ReputationError::UnknownTrait { name: s.to_string() })
    }
}

/// Dense per-trait storage. Serializes as `{ "heroic": .., "cruel": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TraitMap<T>([T; 5]);

impl<T> TraitMap<T> {
    pub fn from_fn(mut f: impl FnMut(ReputationTrait) -> T) -> Self {
        Self(ReputationTrait::ALL.map(&mut f))
    }

    pub fn get(&self, t: ReputationTrait) -> &T {
        &self.0[t.index()]
    }

    pub fn get_mut(&mut self, t: ReputationTrait) -> &mut T {
        &mut self.0[t.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReputationTrait, &T)> {
        ReputationTrait::ALL.into_iter().zip(self.0.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ReputationTrait, &mut T)> {
        ReputationTrait::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T: Copy> TraitMap<T> {
    pub const fn splat(value: T) -> Self {
        Self([value; 5])
    }
}

impl TraitMap<f64> {
    /// Non-zero entries only, in trait order.
    pub fn nonzero(&self) -> impl Iterator<Item = (ReputationTrait, f64)> + '_ {
        self.iter().filter(|(_, v)| **v != 0.0).map(|(t, v)| (t, *v))
    }
}

impl<T> Index<ReputationTrait> for TraitMap<T> {
    type Output = T;

    fn index(&self, t: ReputationTrait) -> &T {
        self.get(t)
    }
}

impl<T> IndexMut<ReputationTrait> for TraitMap<T> {
    fn index_mut(&mut self, t: ReputationTrait) -> &mut T {
        self.get_mut(t)
    }
}

impl<T: Serialize> Serialize for TraitMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(5))?;
        for (t, v) in self.iter() {
            map.serialize_entry(t.name(), v)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de> + Default> Deserialize<'de> for TraitMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut sparse: BTreeMap<ReputationTrait, T> = BTreeMap::deserialize(deserializer)?;
        Ok(Self::from_fn(|t| sparse.remove(&t).unwrap_or_default()))
    }
}
