//! Square grid coordinates for battle maps
//!
//! Movement and adjacency are 4-directional; distance is Manhattan.

use serde::{Deserialize, Serialize};

/// Cell coordinate on the battle grid
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance
    pub fn distance(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The 4 orthogonal neighbors, in up/right/down/left order
    pub fn neighbors(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x, self.y - 1),
            GridCoord::new(self.x + 1, self.y),
            GridCoord::new(self.x, self.y + 1),
            GridCoord::new(self.x - 1, self.y),
        ]
    }

    /// Are the two cells orthogonally adjacent?
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.distance(other) == 1
    }

    /// All cells within Manhattan `radius` (inclusive, not bounds-clipped),
    /// in row-major order
    pub fn cells_in_range(&self, radius: u32) -> Vec<GridCoord> {
        let r = radius as i32;
        let mut cells = Vec::new();
        for dy in -r..=r {
            let span = r - dy.abs();
            for dx in -span..=span {
                cells.push(GridCoord::new(self.x + dx, self.y + dy));
            }
        }
        cells
    }

    /// Row-major scan key: rows top to bottom, then columns left to right
    pub fn scan_key(&self) -> (i32, i32) {
        (self.y, self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let a = GridCoord::new(1, 2);
        let b = GridCoord::new(4, 0);
        assert_eq!(a.distance(&b), 5);
        assert_eq!(b.distance(&a), 5);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let origin = GridCoord::new(3, 3);
        for n in origin.neighbors() {
            assert!(origin.is_adjacent(&n));
        }
    }

    #[test]
    fn test_cells_in_range_count() {
        // Manhattan disc of radius r has 2r^2 + 2r + 1 cells
        let origin = GridCoord::new(0, 0);
        assert_eq!(origin.cells_in_range(0).len(), 1);
        assert_eq!(origin.cells_in_range(1).len(), 5);
        assert_eq!(origin.cells_in_range(2).len(), 13);
    }

    #[test]
    fn test_cells_in_range_row_major() {
        let cells = GridCoord::new(0, 0).cells_in_range(1);
        assert_eq!(
            cells,
            vec![
                GridCoord::new(0, -1),
                GridCoord::new(-1, 0),
                GridCoord::new(0, 0),
                GridCoord::new(1, 0),
                GridCoord::new(0, 1),
            ]
        );
    }
}
