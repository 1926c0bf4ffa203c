//! Enemy AI system for battle decision-making
//!
//! Architecture: trait + prioritized rules
//! - `BattleAi` trait defines interface for swappable implementations
//! - `AiController` walks a fixed rule list and returns the first action
//!   any rule produces (Skill -> Attack -> Move -> Rest)
//! - Scoring helpers rank skills, targets and destination cells
//!
//! Decisions are single-ply and read the battle without mutating it, so
//! the same battle state always yields the same action.

pub mod priority;
pub mod scoring;

pub use priority::AiRule;
pub use scoring::{score_move_cell, MoveScore};

use crate::battle::execution::{Battle, UnitAction};
use crate::battle::units::UnitId;

/// Trait for battle AI implementations
pub trait BattleAi {
    /// Choose one action for `unit`; never fails, resting at worst
    fn decide(&self, battle: &Battle, unit: UnitId) -> UnitAction;
}

/// Greedy rule-based opponent
#[derive(Debug, Clone)]
pub struct AiController {
    rules: Vec<AiRule>,
}

impl Default for AiController {
    fn default() -> Self {
        Self {
            rules: AiRule::PRIORITY.to_vec(),
        }
    }
}

impl AiController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller evaluating only `rules`, in the given order
    ///
    /// Rest is always the implicit last resort.
    pub fn with_rules(rules: Vec<AiRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AiRule] {
        &self.rules
    }
}

impl BattleAi for AiController {
    fn decide(&self, battle: &Battle, unit: UnitId) -> UnitAction {
        let Some(actor) = battle.unit(unit) else {
            return UnitAction::Rest;
        };

        for rule in &self.rules {
            if let Some(action) = rule.evaluate(battle, actor) {
                tracing::debug!(unit = unit.0, ?rule, ?action, "AI decision");
                return action;
            }
        }
        UnitAction::Rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::coord::GridCoord;
    use crate::battle::execution::BattleParams;
    use crate::battle::rules::BattleRules;
    use crate::battle::skills::SkillCatalog;
    use crate::battle::unit_type::ArmsType;
    use crate::battle::units::CombatantSnapshot;
    use crate::core::config::BattleConfig;
    use crate::core::types::BattleId;
    use std::sync::Arc;

    fn battle(attacker_at: GridCoord, defender_at: GridCoord) -> Battle {
        let params = BattleParams {
            attackers: vec![CombatantSnapshot::new(1, "A", 5, 70, 10, ArmsType::Cavalry, 1000).at(attacker_at)],
            defenders: vec![CombatantSnapshot::new(2, "D", 5, 50, 50, ArmsType::Infantry, 400).at(defender_at)],
            map: Some(BattleMap::new(12, 8)),
            seed: Some(42),
            is_siege: false,
        };
        let mut battle = Battle::new(
            BattleId::new(),
            params,
            BattleConfig::default(),
            Arc::new(BattleRules::default()),
            Arc::new(SkillCatalog::empty()),
        )
        .expect("battle builds");
        battle.start_turn().expect("turn");
        battle
    }

    #[test]
    fn test_adjacent_enemy_is_attacked() {
        let battle = battle(GridCoord::new(3, 3), GridCoord::new(4, 3));
        let action = AiController::new().decide(&battle, UnitId(1));
        assert_eq!(action, UnitAction::Attack { target: UnitId(2) });
    }

    #[test]
    fn test_distant_enemy_is_approached() {
        let battle = battle(GridCoord::new(0, 3), GridCoord::new(10, 3));
        let action = AiController::new().decide(&battle, UnitId(1));
        let UnitAction::Move { to } = action else {
            panic!("expected a move, got {:?}", action);
        };
        assert!(to.distance(&GridCoord::new(10, 3)) < 10);
    }

    #[test]
    fn test_no_rules_means_rest() {
        let battle = battle(GridCoord::new(3, 3), GridCoord::new(4, 3));
        let action = AiController::with_rules(Vec::new()).decide(&battle, UnitId(1));
        assert_eq!(action, UnitAction::Rest);
    }

    #[test]
    fn test_unknown_unit_rests() {
        let battle = battle(GridCoord::new(3, 3), GridCoord::new(4, 3));
        assert_eq!(AiController::new().decide(&battle, UnitId(99)), UnitAction::Rest);
    }
}
