//! Battle result handed back to the overworld
//!
//! The report is the only thing that leaves a battle. The host applies it
//! to its own persistent records; nothing here writes back.

use serde::{Deserialize, Serialize};

use crate::battle::constants::{EXP_DAMAGE_DIVISOR, EXP_PER_KILL, EXP_VICTORY_BONUS};
use crate::battle::execution::Battle;
use crate::battle::units::{BattleUnit, Side, UnitId};
use crate::core::types::{BattleId, CombatantId, Turn};

/// Per-unit result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub unit_id: UnitId,
    pub combatant: CombatantId,
    pub name: String,
    pub side: Side,
    pub alive: bool,
    pub arms_remaining: u32,
    pub damage_dealt: u32,
    pub damage_taken: u32,
    pub kills: u32,
    pub experience: u32,
}

impl UnitOutcome {
    fn from_unit(unit: &BattleUnit, winner: Side) -> Self {
        Self {
            unit_id: unit.id,
            combatant: unit.combatant,
            name: unit.name.clone(),
            side: unit.side,
            alive: unit.active,
            arms_remaining: unit.arms,
            damage_dealt: unit.damage_dealt,
            damage_taken: unit.damage_taken,
            kills: unit.kills,
            experience: experience(unit, winner),
        }
    }
}

/// Complete battle result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub battle_id: BattleId,
    pub winner: Side,
    pub turns: Turn,
    /// Siege battles only: the attacker took the city
    pub city_captured: bool,
    /// Combatants still fielding troops
    pub survivors: Vec<CombatantId>,
    pub units: Vec<UnitOutcome>,
}

impl BattleReport {
    /// Report for a finished battle; `None` while it is still running
    pub fn from_battle(battle: &Battle) -> Option<Self> {
        let winner = battle.winner()?;
        let units: Vec<UnitOutcome> = battle
            .units()
            .map(|u| UnitOutcome::from_unit(u, winner))
            .collect();
        let survivors = units.iter().filter(|u| u.alive).map(|u| u.combatant).collect();

        Some(Self {
            battle_id: battle.id(),
            winner,
            turns: battle.turn(),
            city_captured: battle.is_siege() && winner == Side::Attacker,
            survivors,
            units,
        })
    }

    pub fn total_experience(&self, side: Side) -> u32 {
        self.units
            .iter()
            .filter(|u| u.side == side)
            .map(|u| u.experience)
            .sum()
    }
}

/// `damage_dealt / 10 + 20 per kill + 30 for being on the winning side`
pub fn experience(unit: &BattleUnit, winner: Side) -> u32 {
    let mut exp = unit.damage_dealt / EXP_DAMAGE_DIVISOR + EXP_PER_KILL * unit.kills;
    if unit.side == winner {
        exp += EXP_VICTORY_BONUS;
    }
    exp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit_type::ArmsType;

    #[test]
    fn test_experience_formula() {
        let mut unit = BattleUnit::new(UnitId(1), Side::Attacker, ArmsType::Infantry, 100);
        unit.damage_dealt = 455;
        unit.kills = 2;
        assert_eq!(experience(&unit, Side::Attacker), 45 + 40 + 30);
        assert_eq!(experience(&unit, Side::Defender), 85);
    }

    #[test]
    fn test_dead_losers_still_earn() {
        let mut unit = BattleUnit::new(UnitId(1), Side::Defender, ArmsType::Infantry, 100);
        unit.damage_dealt = 99;
        unit.take_damage(100);
        assert_eq!(experience(&unit, Side::Attacker), 9);
    }
}
