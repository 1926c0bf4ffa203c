//! Battle terrain types and their effects
//!
//! Terrain drives movement resistance (per arms type, see
//! [`crate::battle::rules::BattleRules`]) and defensive value.

use serde::{Deserialize, Serialize};

/// Terrain of a single battle map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Grass,
    #[default]
    Plain,
    Mountain,
    Forest,
    Village,
    City,
    Camp,
    River,
}

impl Terrain {
    pub const ALL: [Terrain; 8] = [
        Terrain::Grass,
        Terrain::Plain,
        Terrain::Mountain,
        Terrain::Forest,
        Terrain::Village,
        Terrain::City,
        Terrain::Camp,
        Terrain::River,
    ];

    /// Built-in defense multiplier applied to a defender standing here
    pub fn default_defense_modifier(&self) -> f64 {
        match self {
            Terrain::Grass => 1.0,
            Terrain::Plain => 1.0,
            Terrain::Mountain => 1.3,
            Terrain::Forest => 1.2,
            Terrain::Village => 1.1,
            Terrain::City => 1.4,
            Terrain::Camp => 1.2,
            Terrain::River => 0.8,
        }
    }

    /// Positional value the AI assigns to standing on this terrain
    pub fn defense_bonus(&self) -> i32 {
        match self {
            Terrain::Grass | Terrain::Plain => 0,
            Terrain::Mountain => 15,
            Terrain::Forest => 10,
            Terrain::Village => 5,
            Terrain::City => 20,
            Terrain::Camp => 10,
            Terrain::River => -10,
        }
    }

    /// Relative frequency when generating a map
    pub fn generation_weight(&self) -> u32 {
        match self {
            Terrain::Grass => 30,
            Terrain::Plain => 40,
            Terrain::Mountain => 6,
            Terrain::Forest => 12,
            Terrain::Village => 4,
            Terrain::City => 1,
            Terrain::Camp => 2,
            Terrain::River => 5,
        }
    }
}
