//! Battle units: per-combatant runtime state
//!
//! A `BattleUnit` is built from a read-only `CombatantSnapshot` when a
//! battle starts and belongs to that battle only. Nothing here writes back
//! to the snapshot.

use serde::{Deserialize, Serialize};

use crate::battle::coord::GridCoord;
use crate::battle::unit_type::ArmsType;
use crate::core::types::CombatantId;

/// Battle-scoped unit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Which army a unit fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Transient condition gating a unit's actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Normal,
    /// Cannot attack
    Chaos,
    /// Cannot use skills
    Silenced,
    /// Cannot move
    Bound,
    /// Loses arms at the start of each of its turns
    Poisoned,
}

/// Flat stat bonuses granted by an item the combatant carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Equipment {
    pub force: u32,
    pub iq: u32,
    pub movement: u32,
}

/// Read-only record of a combatant as the overworld knows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub id: CombatantId,
    pub name: String,
    pub level: u32,
    pub force: u32,
    pub iq: u32,
    pub arms_type: ArmsType,
    pub arms: u32,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    /// Requested deployment cell; automatic deployment when absent
    #[serde(default)]
    pub position: Option<GridCoord>,
}

impl CombatantSnapshot {
    pub fn new(id: u32, name: &str, level: u32, force: u32, iq: u32, arms_type: ArmsType, arms: u32) -> Self {
        Self {
            id: CombatantId(id),
            name: name.to_string(),
            level,
            force,
            iq,
            arms_type,
            arms,
            equipment: Vec::new(),
            position: None,
        }
    }

    pub fn at(mut self, position: GridCoord) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_equipment(mut self, item: Equipment) -> Self {
        self.equipment.push(item);
        self
    }
}

/// Runtime state of one combatant in one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleUnit {
    pub id: UnitId,
    pub combatant: CombatantId,
    pub name: String,
    pub side: Side,
    pub position: GridCoord,

    // Base stats
    pub level: u32,
    pub force: u32,
    pub iq: u32,
    pub arms_type: ArmsType,

    // Pools
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub move_power: u32,
    pub arms: u32,
    pub max_arms: u32,

    // State
    pub status: UnitStatus,
    pub status_turns: u32,
    pub active: bool,
    pub has_acted: bool,

    // Stats for the report
    pub damage_dealt: u32,
    pub damage_taken: u32,
    pub kills: u32,
}

impl BattleUnit {
    /// A unit with the given stats and full pools; see
    /// [`crate::battle::combat::CombatCalculator::derive_unit`] for the
    /// snapshot-driven constructor.
    pub fn new(id: UnitId, side: Side, arms_type: ArmsType, arms: u32) -> Self {
        Self {
            id,
            combatant: CombatantId(id.0),
            name: String::new(),
            side,
            position: GridCoord::default(),
            level: 1,
            force: 50,
            iq: 50,
            arms_type,
            hp: 100,
            max_hp: 100,
            mp: 30,
            max_mp: 30,
            move_power: arms_type.default_properties().base_move,
            arms,
            max_arms: arms,
            status: UnitStatus::Normal,
            status_turns: 0,
            active: arms > 0,
            has_acted: false,
            damage_dealt: 0,
            damage_taken: 0,
            kills: 0,
        }
    }

    /// Apply troop losses. Returns true exactly when this call killed the unit.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if !self.active {
            return false;
        }
        let applied = amount.min(self.arms);
        self.arms -= applied;
        self.damage_taken += applied;
        if self.arms == 0 {
            self.active = false;
            return true;
        }
        false
    }

    /// Restore troops up to max arms. Returns the amount restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.active {
            return 0;
        }
        let restored = amount.min(self.max_arms - self.arms);
        self.arms += restored;
        restored
    }

    /// Spend MP all-or-nothing
    pub fn consume_mp(&mut self, amount: u32) -> bool {
        if self.mp < amount {
            return false;
        }
        self.mp -= amount;
        true
    }

    /// Overwrite the current status
    pub fn set_state(&mut self, status: UnitStatus, duration: u32) {
        if status == UnitStatus::Normal || duration == 0 {
            self.status = UnitStatus::Normal;
            self.status_turns = 0;
        } else {
            self.status = status;
            self.status_turns = duration;
        }
    }

    /// Count the status down one turn, clearing it at zero
    pub fn update_state(&mut self) {
        if self.status == UnitStatus::Normal {
            return;
        }
        self.status_turns = self.status_turns.saturating_sub(1);
        if self.status_turns == 0 {
            self.status = UnitStatus::Normal;
        }
    }

    /// Can act at all this turn?
    pub fn is_ready(&self) -> bool {
        self.active && !self.has_acted
    }

    pub fn can_move(&self) -> bool {
        self.is_ready()
            && match self.status {
                UnitStatus::Bound => false,
                UnitStatus::Normal
                | UnitStatus::Chaos
                | UnitStatus::Silenced
                | UnitStatus::Poisoned => true,
            }
    }

    pub fn can_attack(&self) -> bool {
        self.is_ready()
            && match self.status {
                UnitStatus::Chaos => false,
                UnitStatus::Normal
                | UnitStatus::Silenced
                | UnitStatus::Bound
                | UnitStatus::Poisoned => true,
            }
    }

    pub fn can_use_skill(&self) -> bool {
        self.is_ready()
            && match self.status {
                UnitStatus::Silenced => false,
                UnitStatus::Normal
                | UnitStatus::Chaos
                | UnitStatus::Bound
                | UnitStatus::Poisoned => true,
            }
    }

    /// Remaining arms as a fraction of max (0.0 for an empty unit)
    pub fn arms_ratio(&self) -> f64 {
        if self.max_arms == 0 {
            return 0.0;
        }
        self.arms as f64 / self.max_arms as f64
    }

    pub fn is_enemy_of(&self, other: &BattleUnit) -> bool {
        self.side != other.side
    }
}

/// The side whose units act on `turn`: attacker on odd turns, defender on even
pub fn side_for_turn(turn: u32) -> Side {
    if turn % 2 == 1 {
        Side::Attacker
    } else {
        Side::Defender
    }
}
