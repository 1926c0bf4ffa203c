//! Arms types and their default properties
//!
//! Six classes with asymmetric attack/defense moduli. The moduli and the
//! pairwise matchup multipliers here are defaults; the live values come
//! from [`crate::battle::rules::BattleRules`].

use serde::{Deserialize, Serialize};

/// Class of troops a unit fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArmsType {
    Cavalry,
    #[default]
    Infantry,
    Archer,
    Navy,
    Elite,
    Mystic,
}

/// Default properties for an arms type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmsProperties {
    pub attack_modulus: f64,
    pub defense_modulus: f64,
    /// Move power before equipment bonuses
    pub base_move: u32,
}

impl ArmsType {
    pub const ALL: [ArmsType; 6] = [
        ArmsType::Cavalry,
        ArmsType::Infantry,
        ArmsType::Archer,
        ArmsType::Navy,
        ArmsType::Elite,
        ArmsType::Mystic,
    ];

    /// Get default properties for this arms type
    pub fn default_properties(&self) -> ArmsProperties {
        match self {
            ArmsType::Cavalry => ArmsProperties {
                attack_modulus: 1.2,
                defense_modulus: 1.0,
                base_move: 10,
            },
            ArmsType::Infantry => ArmsProperties {
                attack_modulus: 1.0,
                defense_modulus: 1.2,
                base_move: 8,
            },
            ArmsType::Archer => ArmsProperties {
                attack_modulus: 1.1,
                defense_modulus: 0.8,
                base_move: 8,
            },
            ArmsType::Navy => ArmsProperties {
                attack_modulus: 0.9,
                defense_modulus: 1.0,
                base_move: 7,
            },
            ArmsType::Elite => ArmsProperties {
                attack_modulus: 1.3,
                defense_modulus: 1.2,
                base_move: 9,
            },
            ArmsType::Mystic => ArmsProperties {
                attack_modulus: 0.8,
                defense_modulus: 1.1,
                base_move: 7,
            },
        }
    }

    /// Default matchup multiplier when this type attacks `defender`
    ///
    /// Cavalry > infantry > archer > cavalry. Unlisted pairs have no entry.
    pub fn default_matchup(&self, defender: ArmsType) -> Option<f64> {
        match (self, defender) {
            (ArmsType::Cavalry, ArmsType::Infantry) => Some(1.2),
            (ArmsType::Infantry, ArmsType::Archer) => Some(1.2),
            (ArmsType::Archer, ArmsType::Cavalry) => Some(1.2),
            (ArmsType::Infantry, ArmsType::Cavalry) => Some(0.8),
            (ArmsType::Archer, ArmsType::Infantry) => Some(0.8),
            (ArmsType::Cavalry, ArmsType::Archer) => Some(0.8),
            (ArmsType::Elite, _) => Some(1.1),
            (ArmsType::Mystic, ArmsType::Elite) => Some(1.2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cavalry_fastest() {
        let cavalry = ArmsType::Cavalry.default_properties().base_move;
        for arms in ArmsType::ALL {
            assert!(cavalry >= arms.default_properties().base_move);
        }
    }

    #[test]
    fn test_infantry_outdefends_archers() {
        assert!(
            ArmsType::Infantry.default_properties().defense_modulus
                > ArmsType::Archer.default_properties().defense_modulus
        );
    }

    #[test]
    fn test_cavalry_beats_infantry() {
        assert_eq!(ArmsType::Cavalry.default_matchup(ArmsType::Infantry), Some(1.2));
        assert_eq!(ArmsType::Infantry.default_matchup(ArmsType::Cavalry), Some(0.8));
    }

    #[test]
    fn test_unlisted_matchup_is_none() {
        assert_eq!(ArmsType::Navy.default_matchup(ArmsType::Mystic), None);
    }
}
