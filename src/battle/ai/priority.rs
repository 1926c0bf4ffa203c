//! Prioritized decision rules
//!
//! Each rule either proposes an action or passes. Rules are tried in a
//! fixed order and the first proposal wins; later rules are never weighed
//! against earlier ones.

use serde::{Deserialize, Serialize};

use crate::battle::ai::scoring::{best_move, most_depleted_first, rank_skills, weakest_first, MoveWeights};
use crate::battle::coord::GridCoord;
use crate::battle::execution::{Battle, UnitAction};
use crate::battle::skills::{skill_range, Skill, SkillKind};
use crate::battle::units::{BattleUnit, UnitId, UnitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiRule {
    /// Cast the best-ranked affordable skill that has a target in range
    Skill,
    /// Hit the weakest enemy within melee range
    Attack,
    /// Step to the best-scoring reachable cell
    Move,
    /// Recover HP and MP
    Rest,
}

impl AiRule {
    pub const PRIORITY: [AiRule; 4] = [AiRule::Skill, AiRule::Attack, AiRule::Move, AiRule::Rest];

    pub fn evaluate(&self, battle: &Battle, unit: &BattleUnit) -> Option<UnitAction> {
        match self {
            AiRule::Skill => choose_skill(battle, unit),
            AiRule::Attack => choose_attack(battle, unit),
            AiRule::Move => choose_move(battle, unit),
            AiRule::Rest => Some(UnitAction::Rest),
        }
    }
}

fn choose_skill(battle: &Battle, unit: &BattleUnit) -> Option<UnitAction> {
    if !unit.can_use_skill() {
        return None;
    }

    let config = battle.config();
    let available = battle.skills().available_skills(unit);
    let include_support = unit.arms_ratio() < config.support_arms_ratio;

    for skill in rank_skills(&available, include_support) {
        let targets = skill_targets(battle, unit, skill, config.ai_skill_targets);
        if !targets.is_empty() {
            return Some(UnitAction::Skill {
                skill: skill.id,
                targets,
            });
        }
    }
    None
}

/// Up to `limit` targets for `skill` within its range of `caster`
fn skill_targets(battle: &Battle, caster: &BattleUnit, skill: &Skill, limit: usize) -> Vec<UnitId> {
    let range = skill_range(battle.map(), skill, caster.position);
    let in_range = |u: &&BattleUnit| u.active && range.contains(&u.position);

    let mut candidates: Vec<&BattleUnit> = match skill.kind() {
        SkillKind::Support => {
            let mut allies: Vec<&BattleUnit> = battle
                .active_units(caster.side)
                .filter(in_range)
                .filter(|u| u.arms < u.max_arms)
                .collect();
            most_depleted_first(&mut allies);
            allies
        }
        SkillKind::Control => battle
            .active_units(caster.side.opponent())
            .filter(in_range)
            // Don't overwrite a status that is already doing work
            .filter(|u| u.status == UnitStatus::Normal)
            .collect(),
        SkillKind::Attack => battle
            .active_units(caster.side.opponent())
            .filter(in_range)
            .collect(),
    };
    if skill.kind() != SkillKind::Support {
        weakest_first(&mut candidates);
    }
    candidates.into_iter().take(limit).map(|u| u.id).collect()
}

fn choose_attack(battle: &Battle, unit: &BattleUnit) -> Option<UnitAction> {
    if !unit.can_attack() {
        return None;
    }

    let reach = battle.config().melee_range;
    let mut in_reach: Vec<&BattleUnit> = battle
        .active_units(unit.side.opponent())
        .filter(|e| unit.position.distance(&e.position) <= reach)
        .collect();
    weakest_first(&mut in_reach);

    in_reach.first().map(|target| UnitAction::Attack { target: target.id })
}

fn choose_move(battle: &Battle, unit: &BattleUnit) -> Option<UnitAction> {
    if !unit.can_move() {
        return None;
    }

    let enemies: Vec<GridCoord> = battle
        .active_units(unit.side.opponent())
        .map(|e| e.position)
        .collect();
    if enemies.is_empty() {
        return None;
    }

    let area = battle.move_area(unit.id).ok()?;
    let candidates = area.cells.iter().map(|c| c.pos).filter(|p| *p != unit.position);
    let best = best_move(
        battle.map(),
        candidates,
        &enemies,
        battle.config().melee_range,
        &MoveWeights::default(),
    )?;

    Some(UnitAction::Move { to: best.pos })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::execution::BattleParams;
    use crate::battle::rules::BattleRules;
    use crate::battle::skills::SkillCatalog;
    use crate::battle::unit_type::ArmsType;
    use crate::battle::units::CombatantSnapshot;
    use crate::core::config::BattleConfig;
    use crate::core::types::{BattleId, SkillId};
    use std::sync::Arc;

    fn officer(id: u32, arms: u32, at: GridCoord) -> CombatantSnapshot {
        CombatantSnapshot::new(id, "Officer", 5, 60, 60, ArmsType::Infantry, arms).at(at)
    }

    fn build(attackers: Vec<CombatantSnapshot>, defenders: Vec<CombatantSnapshot>, skills: SkillCatalog) -> Battle {
        let params = BattleParams {
            attackers,
            defenders,
            map: Some(BattleMap::new(12, 8)),
            seed: Some(42),
            is_siege: false,
        };
        let mut battle = Battle::new(
            BattleId::new(),
            params,
            BattleConfig::default(),
            Arc::new(BattleRules::default()),
            Arc::new(skills),
        )
        .expect("battle builds");
        battle.start_turn().expect("turn");
        battle
    }

    #[test]
    fn test_skill_preferred_over_attack() {
        let battle = build(
            vec![officer(1, 1000, GridCoord::new(3, 3))],
            vec![officer(2, 1000, GridCoord::new(4, 3))],
            SkillCatalog::default(),
        );
        let unit = battle.unit(UnitId(1)).expect("unit");
        // Rockfall (mp 14) is the strongest affordable attack skill
        assert_eq!(
            AiRule::Skill.evaluate(&battle, unit),
            Some(UnitAction::Skill {
                skill: SkillId(3),
                targets: vec![UnitId(2)]
            })
        );
    }

    #[test]
    fn test_skill_targets_weakest_three() {
        let battle = build(
            vec![officer(1, 1000, GridCoord::new(5, 3))],
            vec![
                officer(2, 900, GridCoord::new(6, 3)),
                officer(3, 100, GridCoord::new(6, 2)),
                officer(4, 500, GridCoord::new(6, 4)),
                officer(5, 50, GridCoord::new(7, 3)),
            ],
            SkillCatalog::default(),
        );
        let unit = battle.unit(UnitId(1)).expect("unit");
        let Some(UnitAction::Skill { targets, .. }) = AiRule::Skill.evaluate(&battle, unit) else {
            panic!("expected a skill");
        };
        assert_eq!(targets, vec![UnitId(5), UnitId(3), UnitId(4)]);
    }

    #[test]
    fn test_silenced_unit_skips_skills() {
        let mut battle = build(
            vec![officer(1, 1000, GridCoord::new(3, 3))],
            vec![officer(2, 1000, GridCoord::new(4, 3))],
            SkillCatalog::default(),
        );
        if let Some(unit) = battle.unit_mut(UnitId(1)) {
            unit.set_state(UnitStatus::Silenced, 3);
        }
        let unit = battle.unit(UnitId(1)).expect("unit");
        assert_eq!(AiRule::Skill.evaluate(&battle, unit), None);
        assert_eq!(
            AiRule::Attack.evaluate(&battle, unit),
            Some(UnitAction::Attack { target: UnitId(2) })
        );
    }

    #[test]
    fn test_support_only_when_depleted() {
        let support_only = SkillCatalog::new(
            SkillCatalog::default()
                .iter()
                .filter(|s| s.kind() == SkillKind::Support)
                .cloned()
                .collect(),
        );
        let mut battle = build(
            vec![officer(1, 1000, GridCoord::new(3, 3))],
            vec![officer(2, 1000, GridCoord::new(9, 3))],
            support_only,
        );
        let unit = battle.unit(UnitId(1)).cloned().expect("unit");
        assert_eq!(AiRule::Skill.evaluate(&battle, &unit), None);

        if let Some(unit) = battle.unit_mut(UnitId(1)) {
            unit.take_damage(600);
        }
        let unit = battle.unit(UnitId(1)).expect("unit");
        assert_eq!(
            AiRule::Skill.evaluate(&battle, unit),
            Some(UnitAction::Skill {
                skill: SkillId(9),
                targets: vec![UnitId(1)]
            })
        );
    }

    #[test]
    fn test_attack_focuses_weakest() {
        let battle = build(
            vec![officer(1, 1000, GridCoord::new(5, 3))],
            vec![
                officer(2, 800, GridCoord::new(6, 3)),
                officer(3, 300, GridCoord::new(4, 3)),
                officer(4, 10, GridCoord::new(8, 3)),
            ],
            SkillCatalog::empty(),
        );
        let unit = battle.unit(UnitId(1)).expect("unit");
        assert_eq!(
            AiRule::Attack.evaluate(&battle, unit),
            Some(UnitAction::Attack { target: UnitId(3) })
        );
    }

    #[test]
    fn test_move_ends_next_to_enemy_when_possible() {
        let battle = build(
            vec![officer(1, 1000, GridCoord::new(2, 3))],
            vec![officer(2, 1000, GridCoord::new(5, 3))],
            SkillCatalog::empty(),
        );
        let unit = battle.unit(UnitId(1)).expect("unit");
        // Infantry move 8 on plain covers three steps; (4,3) is the only
        // reachable cell next to the enemy
        assert_eq!(
            AiRule::Move.evaluate(&battle, unit),
            Some(UnitAction::Move { to: GridCoord::new(4, 3) })
        );
    }

    #[test]
    fn test_no_enemies_no_move() {
        let mut battle = build(
            vec![officer(1, 1000, GridCoord::new(2, 3))],
            vec![officer(2, 1000, GridCoord::new(5, 3))],
            SkillCatalog::empty(),
        );
        if let Some(enemy) = battle.unit_mut(UnitId(2)) {
            enemy.take_damage(1000);
        }
        let unit = battle.unit(UnitId(1)).expect("unit");
        assert_eq!(AiRule::Move.evaluate(&battle, unit), None);
        assert_eq!(AiRule::Rest.evaluate(&battle, unit), Some(UnitAction::Rest));
    }
}
