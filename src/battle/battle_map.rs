//! Battle map: terrain grid and bounds/occupancy queries
//!
//! The map only stores terrain. Units live in the battle; occupancy is
//! answered against whatever unit collection the caller passes in.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::terrain::Terrain;
use crate::battle::units::BattleUnit;
use crate::core::error::BattleError;

/// Rectangular terrain grid, stored row-major
///
/// Deserializing checks that `cells` holds exactly `width × height`
/// entries, so a host-supplied map can never index past its storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMap")]
pub struct BattleMap {
    pub width: u32,
    pub height: u32,
    cells: Vec<Terrain>,
}

/// Map as it arrives over serde, before its shape is checked
#[derive(Deserialize)]
struct RawMap {
    width: u32,
    height: u32,
    cells: Vec<Terrain>,
}

impl TryFrom<RawMap> for BattleMap {
    type Error = BattleError;

    fn try_from(raw: RawMap) -> Result<Self, Self::Error> {
        let map = Self {
            width: raw.width,
            height: raw.height,
            cells: raw.cells,
        };
        map.check_shape()?;
        Ok(map)
    }
}

impl BattleMap {
    /// Create a map of open plain
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Terrain::Plain; cell_count(width, height)],
        }
    }

    /// Reject maps with no cells or a cell count other than `width × height`
    pub fn check_shape(&self) -> Result<(), BattleError> {
        let expected = self.width as u64 * self.height as u64;
        if expected == 0 {
            return Err(BattleError::InvalidMap("map has no cells".into()));
        }
        if self.cells.len() as u64 != expected {
            return Err(BattleError::InvalidMap(format!(
                "{}x{} map holds {} cells, expected {}",
                self.width,
                self.height,
                self.cells.len(),
                expected
            )));
        }
        Ok(())
    }

    /// Build a map from terrain rows (top row first)
    pub fn from_rows(rows: Vec<Vec<Terrain>>) -> Result<Self, BattleError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        if width == 0 {
            return Err(BattleError::InvalidMap("map has no cells".into()));
        }
        if let Some((y, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(BattleError::InvalidMap(format!(
                "row {} has {} cells, expected {}",
                y,
                row.len(),
                width
            )));
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Generate a map with weighted random terrain
    pub fn generate<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let total: u32 = Terrain::ALL.iter().map(|t| t.generation_weight()).sum();
        let cells = (0..cell_count(width, height))
            .map(|_| {
                let mut roll = rng.gen_range(0..total);
                for terrain in Terrain::ALL {
                    let weight = terrain.generation_weight();
                    if roll < weight {
                        return terrain;
                    }
                    roll -= weight;
                }
                Terrain::Plain
            })
            .collect();

        Self {
            width,
            height,
            cells,
        }
    }

    fn index(&self, pos: GridCoord) -> Option<usize> {
        if self.is_valid_position(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Check if coordinate is within map bounds
    pub fn is_valid_position(&self, pos: GridCoord) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Terrain at a coordinate, `None` out of bounds
    pub fn get_terrain(&self, pos: GridCoord) -> Option<Terrain> {
        self.index(pos).and_then(|i| self.cells.get(i)).copied()
    }

    /// Set terrain at a coordinate. Returns false when out of bounds.
    pub fn set_terrain(&mut self, pos: GridCoord, terrain: Terrain) -> bool {
        match self.index(pos).and_then(|i| self.cells.get_mut(i)) {
            Some(cell) => {
                *cell = terrain;
                true
            }
            None => false,
        }
    }

    /// The active unit standing on `pos`, if any
    pub fn unit_at<'a, I>(&self, units: I, pos: GridCoord) -> Option<&'a BattleUnit>
    where
        I: IntoIterator<Item = &'a BattleUnit>,
    {
        if !self.is_valid_position(pos) {
            return None;
        }
        units.into_iter().find(|u| u.active && u.position == pos)
    }

    /// Every cell coordinate in row-major order
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| GridCoord::new(x, y)))
    }
}

fn cell_count(width: u32, height: u32) -> usize {
    (width as usize).saturating_mul(height as usize)
}
