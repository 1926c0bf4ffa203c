//! Movement range and point-to-point pathfinding
//!
//! Both algorithms run on the 4-directional grid and charge the per-arms
//! resistance of each cell entered.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::battle::battle_map::BattleMap;
use crate::battle::coord::GridCoord;
use crate::battle::rules::BattleRules;
use crate::battle::unit_type::ArmsType;

/// An occupied cell the mover cannot enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub pos: GridCoord,
    /// Enemy-occupied; its neighbors become attackable
    pub hostile: bool,
}

/// A reachable cell and the move power left on arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCell {
    pub pos: GridCoord,
    pub remaining: u32,
}

/// Result of a movement flood fill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveArea {
    /// Reachable cells in discovery order; the origin is always first
    pub cells: Vec<MoveCell>,
    /// Cells orthogonally adjacent to an enemy inside the window, row-major
    pub attackable: Vec<GridCoord>,
}

impl MoveArea {
    pub fn contains(&self, pos: GridCoord) -> bool {
        self.cells.iter().any(|c| c.pos == pos)
    }

    pub fn get(&self, pos: GridCoord) -> Option<&MoveCell> {
        self.cells.iter().find(|c| c.pos == pos)
    }
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    coord: GridCoord,
    f_cost: u64, // g_cost + heuristic
    seq: u64,
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_cost == other.f_cost && self.seq == other.seq
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; earlier insertions win ties
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pathfinding over one map with one rule set
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    map: &'a BattleMap,
    rules: &'a BattleRules,
}

impl<'a> PathFinder<'a> {
    pub fn new(map: &'a BattleMap, rules: &'a BattleRules) -> Self {
        Self { map, rules }
    }

    /// Resistance of a cell for `arms`; `None` off the map
    pub fn cell_cost(&self, pos: GridCoord, arms: ArmsType) -> Option<u32> {
        self.map
            .get_terrain(pos)
            .map(|terrain| self.rules.resistance(arms, terrain))
    }

    /// Cells reachable from `origin` with `move_power`
    ///
    /// Breadth-first flood fill inside a `window`×`window` square centered
    /// on the origin. A neighbor is entered with `remaining - resistance`
    /// if that is still positive. Each cell is claimed by the first
    /// arrival and never revisited, even if a later arrival would have had
    /// more power left.
    pub fn calculate_move_area(
        &self,
        origin: GridCoord,
        move_power: u32,
        arms: ArmsType,
        obstacles: &[Obstacle],
        window: u32,
    ) -> MoveArea {
        let half = (window / 2) as i32;
        let in_window = |pos: GridCoord| {
            (pos.x - origin.x).abs() <= half
                && (pos.y - origin.y).abs() <= half
                && self.map.is_valid_position(pos)
        };

        let blocked: AHashSet<GridCoord> = obstacles
            .iter()
            .filter(|o| o.pos != origin)
            .map(|o| o.pos)
            .collect();

        let mut attackable: Vec<GridCoord> = obstacles
            .iter()
            .filter(|o| o.hostile && in_window(o.pos))
            .flat_map(|o| o.pos.neighbors())
            .filter(|pos| in_window(*pos))
            .collect();
        attackable.sort_by_key(|pos| pos.scan_key());
        attackable.dedup();

        let mut cells = vec![MoveCell {
            pos: origin,
            remaining: move_power,
        }];
        let mut visited = AHashSet::new();
        visited.insert(origin);
        let mut queue = VecDeque::new();
        queue.push_back((origin, move_power));

        while let Some((current, remaining)) = queue.pop_front() {
            for neighbor in current.neighbors() {
                if visited.contains(&neighbor) || !in_window(neighbor) || blocked.contains(&neighbor) {
                    continue;
                }
                let Some(cost) = self.cell_cost(neighbor, arms) else {
                    continue;
                };
                if remaining > cost {
                    let left = remaining - cost;
                    visited.insert(neighbor);
                    cells.push(MoveCell {
                        pos: neighbor,
                        remaining: left,
                    });
                    queue.push_back((neighbor, left));
                }
            }
        }

        MoveArea { cells, attackable }
    }

    /// Find path using A* algorithm
    ///
    /// Returns the cells from `start` to `goal` inclusive, or `None` if
    /// the goal cannot be reached.
    pub fn find_path(
        &self,
        start: GridCoord,
        goal: GridCoord,
        arms: ArmsType,
        obstacles: &[GridCoord],
    ) -> Option<Vec<GridCoord>> {
        if !self.map.is_valid_position(start) || !self.map.is_valid_position(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let blocked: AHashSet<GridCoord> = obstacles.iter().copied().filter(|p| *p != start).collect();
        if blocked.contains(&goal) {
            return None;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<GridCoord, GridCoord> = AHashMap::new();
        let mut g_scores: AHashMap<GridCoord, u64> = AHashMap::new();
        let mut closed: AHashSet<GridCoord> = AHashSet::new();
        let mut seq = 0u64;

        g_scores.insert(start, 0);
        open_set.push(PathNode {
            coord: start,
            f_cost: start.distance(&goal) as u64,
            seq,
        });

        while let Some(current) = open_set.pop() {
            if current.coord == goal {
                return Some(reconstruct_path(&came_from, current.coord));
            }
            if !closed.insert(current.coord) {
                continue;
            }

            let current_g = g_scores.get(&current.coord).copied().unwrap_or(u64::MAX);

            for neighbor in current.coord.neighbors() {
                if blocked.contains(&neighbor) || closed.contains(&neighbor) {
                    continue;
                }
                let Some(cost) = self.cell_cost(neighbor, arms) else {
                    continue;
                };

                let tentative_g = current_g.saturating_add(cost as u64);
                let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u64::MAX);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.coord);
                    g_scores.insert(neighbor, tentative_g);
                    seq += 1;
                    open_set.push(PathNode {
                        coord: neighbor,
                        f_cost: tentative_g.saturating_add(neighbor.distance(&goal) as u64),
                        seq,
                    });
                }
            }
        }

        None // No path found
    }

    /// Bounds-clipped Manhattan disc of `radius` around `center`
    pub fn attack_range(&self, center: GridCoord, radius: u32) -> Vec<GridCoord> {
        center
            .cells_in_range(radius)
            .into_iter()
            .filter(|pos| self.map.is_valid_position(*pos))
            .collect()
    }

    /// Resistance spent walking `path` (the first cell is free)
    pub fn path_cost(&self, path: &[GridCoord], arms: ArmsType) -> u32 {
        path.iter()
            .skip(1)
            .filter_map(|pos| self.cell_cost(*pos, arms))
            .fold(0u32, |total, cost| total.saturating_add(cost))
    }
}

/// Reconstruct path from came_from map
fn reconstruct_path(came_from: &AHashMap<GridCoord, GridCoord>, mut current: GridCoord) -> Vec<GridCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
