//! AI scoring
//!
//! Quantifies candidate destinations and orders skills and targets for
//! the rule evaluator.

use serde::{Deserialize, Serialize};

use crate::battle::battle_map::BattleMap;
use crate::battle::constants::{AI_DISTANCE_WEIGHT, AI_MELEE_BONUS};
use crate::battle::coord::GridCoord;
use crate::battle::skills::{Skill, SkillKind};
use crate::battle::units::BattleUnit;

/// Weights for the destination score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveWeights {
    /// Points per cell of distance to the nearest enemy (negative)
    pub distance_weight: i32,
    /// Points for ending within melee range of an enemy
    pub melee_bonus: i32,
}

impl Default for MoveWeights {
    fn default() -> Self {
        Self {
            distance_weight: AI_DISTANCE_WEIGHT,
            melee_bonus: AI_MELEE_BONUS,
        }
    }
}

/// A scored destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveScore {
    pub pos: GridCoord,
    pub score: i32,
}

/// Score one destination against the enemies' positions
///
/// `weights.distance_weight × distance to nearest enemy + terrain defense
/// bonus + weights.melee_bonus if that enemy is within melee range`.
/// Returns `None` when there are no enemies or the cell is off the map.
pub fn score_move_cell(
    map: &BattleMap,
    pos: GridCoord,
    enemies: &[GridCoord],
    melee_range: u32,
    weights: &MoveWeights,
) -> Option<i32> {
    let terrain = map.get_terrain(pos)?;
    let nearest = enemies.iter().map(|e| pos.distance(e)).min()?;

    let mut score = weights.distance_weight * nearest as i32 + terrain.defense_bonus();
    if nearest <= melee_range {
        score += weights.melee_bonus;
    }
    Some(score)
}

/// Highest-scoring destination, ties going to the first cell in row-major order
pub fn best_move(
    map: &BattleMap,
    candidates: impl IntoIterator<Item = GridCoord>,
    enemies: &[GridCoord],
    melee_range: u32,
    weights: &MoveWeights,
) -> Option<MoveScore> {
    let mut cells: Vec<GridCoord> = candidates.into_iter().collect();
    cells.sort_by_key(|c| c.scan_key());

    let mut best: Option<MoveScore> = None;
    for pos in cells {
        let Some(score) = score_move_cell(map, pos, enemies, melee_range, weights) else {
            continue;
        };
        if best.map_or(true, |b| score > b.score) {
            best = Some(MoveScore { pos, score });
        }
    }
    best
}

/// Order skills for consideration
///
/// Attack skills by descending power, then control skills, then support
/// skills (only when `include_support`). Ties keep id order.
pub fn rank_skills<'a>(skills: &[&'a Skill], include_support: bool) -> Vec<&'a Skill> {
    let mut attack: Vec<&Skill> = skills.iter().copied().filter(|s| s.kind() == SkillKind::Attack).collect();
    attack.sort_by(|a, b| b.effect.power.cmp(&a.effect.power).then(a.id.cmp(&b.id)));

    let control = skills.iter().copied().filter(|s| s.kind() == SkillKind::Control);
    let support = skills
        .iter()
        .copied()
        .filter(|s| include_support && s.kind() == SkillKind::Support);

    attack.into_iter().chain(control).chain(support).collect()
}

/// Sort units weakest first: fewest arms, then lowest id
pub fn weakest_first(units: &mut [&BattleUnit]) {
    units.sort_by(|a, b| a.arms.cmp(&b.arms).then(a.id.cmp(&b.id)));
}

/// Sort units most depleted first: lowest arms ratio, then lowest id
pub fn most_depleted_first(units: &mut [&BattleUnit]) {
    units.sort_by(|a, b| a.arms_ratio().total_cmp(&b.arms_ratio()).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::skills::SkillCatalog;
    use crate::battle::terrain::Terrain;
    use crate::battle::unit_type::ArmsType;
    use crate::battle::units::{Side, UnitId};
    use crate::core::types::SkillId;

    #[test]
    fn test_score_formula() {
        let mut map = BattleMap::new(10, 10);
        map.set_terrain(GridCoord::new(4, 5), Terrain::Forest);
        let weights = MoveWeights::default();
        let enemies = [GridCoord::new(5, 5)];

        // Adjacent forest: -10 + 10 + 50
        assert_eq!(score_move_cell(&map, GridCoord::new(4, 5), &enemies, 1, &weights), Some(50));
        // Plain three cells away: -30
        assert_eq!(score_move_cell(&map, GridCoord::new(2, 5), &enemies, 1, &weights), Some(-30));
        assert_eq!(score_move_cell(&map, GridCoord::new(2, 5), &[], 1, &weights), None);
    }

    #[test]
    fn test_best_move_breaks_ties_in_scan_order() {
        let map = BattleMap::new(10, 10);
        let enemies = [GridCoord::new(5, 5)];
        // All four neighbors score the same; (5,4) comes first in row-major order
        let candidates = [
            GridCoord::new(6, 5),
            GridCoord::new(5, 6),
            GridCoord::new(4, 5),
            GridCoord::new(5, 4),
        ];
        let best = best_move(&map, candidates, &enemies, 1, &MoveWeights::default()).expect("a move");
        assert_eq!(best.pos, GridCoord::new(5, 4));
        assert_eq!(best.score, 40);
    }

    #[test]
    fn test_rank_skills_order() {
        let catalog = SkillCatalog::default();
        let all: Vec<&Skill> = catalog.iter().collect();

        let ranked: Vec<SkillId> = rank_skills(&all, false).iter().map(|s| s.id).collect();
        // Rockfall 350, Fire 300, Flood 250, Sap 50, then controls in id order
        assert_eq!(
            ranked,
            vec![SkillId(3), SkillId(1), SkillId(2), SkillId(8), SkillId(4), SkillId(5), SkillId(6), SkillId(7)]
        );

        let with_support = rank_skills(&all, true);
        assert_eq!(with_support.last().map(|s| s.id), Some(SkillId(9)));
    }

    #[test]
    fn test_weakest_first() {
        let mut a = BattleUnit::new(UnitId(1), Side::Defender, ArmsType::Infantry, 500);
        a.arms = 300;
        let b = BattleUnit::new(UnitId(2), Side::Defender, ArmsType::Infantry, 200);
        let c = BattleUnit::new(UnitId(3), Side::Defender, ArmsType::Infantry, 200);
        let mut units = vec![&a, &c, &b];
        weakest_first(&mut units);
        let ids: Vec<UnitId> = units.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![UnitId(2), UnitId(3), UnitId(1)]);
    }
}
