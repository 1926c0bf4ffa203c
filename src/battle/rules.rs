//! Modifier tables consumed by pathfinding and combat
//!
//! Tables are configuration data, loadable from TOML. Any entry missing
//! from a table resolves to a documented fallback at lookup time:
//!
//! | table            | fallback                |
//! |------------------|-------------------------|
//! | resistance       | `fallback_resistance` (2) |
//! | matchup          | 1.0                     |
//! | attack/defense modulus | 1.0               |
//! | terrain defense  | 1.0                     |

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::constants::DEFAULT_RESISTANCE;
use crate::battle::terrain::Terrain;
use crate::battle::unit_type::ArmsType;
use crate::core::error::ConfigError;

/// Resistance and combat modifier tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleRules {
    /// Movement points spent entering a terrain, per arms type
    pub resistance: AHashMap<ArmsType, AHashMap<Terrain, u32>>,
    /// Resistance for terrain with no table entry
    pub fallback_resistance: u32,
    pub attack_modulus: AHashMap<ArmsType, f64>,
    pub defense_modulus: AHashMap<ArmsType, f64>,
    /// Defense multiplier for a defender standing on the terrain
    pub terrain_defense: AHashMap<Terrain, f64>,
    /// `matchup[attacker][defender]` damage multiplier
    pub matchup: AHashMap<ArmsType, AHashMap<ArmsType, f64>>,
}

fn resistance_row(entries: &[(Terrain, u32)]) -> AHashMap<Terrain, u32> {
    entries.iter().copied().collect()
}

impl Default for BattleRules {
    fn default() -> Self {
        use Terrain::*;

        // Rows may omit terrain; those cells cost `fallback_resistance`.
        let mut resistance = AHashMap::new();
        resistance.insert(
            ArmsType::Cavalry,
            resistance_row(&[
                (Grass, 2),
                (Plain, 2),
                (Mountain, 6),
                (Forest, 4),
                (Village, 2),
                (City, 2),
                (Camp, 2),
                (River, 8),
            ]),
        );
        resistance.insert(
            ArmsType::Infantry,
            resistance_row(&[
                (Grass, 2),
                (Plain, 2),
                (Mountain, 4),
                (Forest, 3),
                (Village, 2),
                (City, 2),
                (Camp, 2),
                (River, 6),
            ]),
        );
        resistance.insert(
            ArmsType::Archer,
            resistance_row(&[(Grass, 2), (Plain, 2), (Mountain, 4), (Forest, 3), (River, 6)]),
        );
        resistance.insert(
            ArmsType::Navy,
            resistance_row(&[
                (Grass, 3),
                (Plain, 3),
                (Mountain, 8),
                (Forest, 4),
                (Village, 3),
                (City, 3),
                (Camp, 3),
                (River, 1),
            ]),
        );
        resistance.insert(
            ArmsType::Elite,
            resistance_row(&[(Mountain, 4), (Forest, 3), (River, 5)]),
        );
        resistance.insert(
            ArmsType::Mystic,
            resistance_row(&[(Mountain, 3), (Forest, 2), (River, 4)]),
        );

        let attack_modulus = ArmsType::ALL
            .iter()
            .map(|a| (*a, a.default_properties().attack_modulus))
            .collect();
        let defense_modulus = ArmsType::ALL
            .iter()
            .map(|a| (*a, a.default_properties().defense_modulus))
            .collect();
        let terrain_defense = Terrain::ALL
            .iter()
            .map(|t| (*t, t.default_defense_modifier()))
            .collect();

        let mut matchup: AHashMap<ArmsType, AHashMap<ArmsType, f64>> = AHashMap::new();
        for attacker in ArmsType::ALL {
            for defender in ArmsType::ALL {
                if let Some(m) = attacker.default_matchup(defender) {
                    matchup.entry(attacker).or_default().insert(defender, m);
                }
            }
        }

        Self {
            resistance,
            fallback_resistance: DEFAULT_RESISTANCE,
            attack_modulus,
            defense_modulus,
            terrain_defense,
            matchup,
        }
    }
}

impl BattleRules {
    /// Parse rules from TOML; tables named in the file replace the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let rules: BattleRules = toml::from_str(contents)?;
        let missing = rules.missing_entries();
        if missing > 0 {
            tracing::warn!(
                missing,
                fallback_resistance = rules.fallback_resistance,
                "Battle rules are incomplete; missing entries use fallbacks"
            );
        }
        Ok(rules)
    }

    /// Load rules from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Movement cost for `arms` entering `terrain`
    pub fn resistance(&self, arms: ArmsType, terrain: Terrain) -> u32 {
        self.resistance
            .get(&arms)
            .and_then(|row| row.get(&terrain))
            .copied()
            .unwrap_or(self.fallback_resistance)
    }

    pub fn attack_modulus(&self, arms: ArmsType) -> f64 {
        self.attack_modulus.get(&arms).copied().unwrap_or(1.0)
    }

    pub fn defense_modulus(&self, arms: ArmsType) -> f64 {
        self.defense_modulus.get(&arms).copied().unwrap_or(1.0)
    }

    pub fn terrain_defense(&self, terrain: Terrain) -> f64 {
        self.terrain_defense.get(&terrain).copied().unwrap_or(1.0)
    }

    pub fn matchup(&self, attacker: ArmsType, defender: ArmsType) -> f64 {
        self.matchup
            .get(&attacker)
            .and_then(|row| row.get(&defender))
            .copied()
            .unwrap_or(1.0)
    }

    /// Number of resistance, modulus and terrain-defense cells with no entry
    ///
    /// Matchup gaps are not counted; 1.0 is the intended neutral value.
    pub fn missing_entries(&self) -> usize {
        let mut missing = 0;
        for arms in ArmsType::ALL {
            let row = self.resistance.get(&arms);
            missing += Terrain::ALL
                .iter()
                .filter(|t| row.map_or(true, |r| !r.contains_key(t)))
                .count();
            if !self.attack_modulus.contains_key(&arms) {
                missing += 1;
            }
            if !self.defense_modulus.contains_key(&arms) {
                missing += 1;
            }
        }
        missing
            + Terrain::ALL
                .iter()
                .filter(|t| !self.terrain_defense.contains_key(t))
                .count()
    }
}
