//! Battle system - grid tactics with one action per unit per turn
//!
//! Two sides alternate whole turns (attacker on odd turns). On its turn
//! each unit may move, attack, cast a skill or rest, once.
//!
//! Leaves first:
//! - `battle_map`, `units`: terrain grid and per-combatant state
//! - `pathfinding`, `combat`, `weather`, `skills`: stateless services
//! - `ai`: rule-based opponent built on those services
//! - `execution`, `system`: lifecycle, turn sequencing and the registry

pub mod ai;
pub mod battle_map;
pub mod combat;
pub mod constants;
pub mod coord;
pub mod execution;
pub mod pathfinding;
pub mod report;
pub mod rules;
pub mod skills;
pub mod system;
pub mod terrain;
pub mod unit_type;
pub mod units;
pub mod weather;

// Re-exports for convenient access
pub use ai::{AiController, AiRule, BattleAi};
pub use battle_map::BattleMap;
pub use combat::{CombatCalculator, SkillDamage};
pub use constants::*;
pub use coord::GridCoord;
pub use execution::{
    ActionOutcome, Battle, BattleEvent, BattleEventType, BattleParams, BattlePhase, UnitAction,
};
pub use pathfinding::{MoveArea, MoveCell, Obstacle, PathFinder};
pub use report::{BattleReport, UnitOutcome};
pub use rules::BattleRules;
pub use skills::{
    skill_range, Skill, SkillCatalog, SkillContext, SkillEffect, SkillHit, SkillKind, SkillOutcome,
    SkillRange,
};
pub use system::BattleSystem;
pub use terrain::Terrain;
pub use unit_type::{ArmsProperties, ArmsType};
pub use units::{
    side_for_turn, BattleUnit, CombatantSnapshot, Equipment, Side, UnitId, UnitStatus,
};
pub use weather::{change_weather, random_weather, Weather};
