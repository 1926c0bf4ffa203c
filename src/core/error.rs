use thiserror::Error;

use crate::battle::units::UnitId;
use crate::core::types::{BattleId, SkillId};

/// Why a battle operation was rejected.
///
/// Every variant is returned before any state is touched, so a rejected
/// action leaves the battle exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BattleError {
    // Invalid references
    #[error("Unknown battle: {0:?}")]
    UnknownBattle(BattleId),

    #[error("Unknown unit: {0:?}")]
    UnknownUnit(UnitId),

    #[error("Unknown skill: {0:?}")]
    UnknownSkill(SkillId),

    // Rule violations
    #[error("Unit {0:?} already acted this turn")]
    AlreadyActed(UnitId),

    #[error("Unit {0:?} does not belong to the side whose turn it is")]
    NotUnitsTurn(UnitId),

    #[error("Unit {0:?} is no longer active")]
    UnitInactive(UnitId),

    #[error("Unit {unit:?} status {status:?} forbids this action")]
    StatusForbids {
        unit: UnitId,
        status: crate::battle::units::UnitStatus,
    },

    #[error("Insufficient MP: need {needed}, have {available}")]
    InsufficientMp { needed: u32, available: u32 },

    #[error("Target {0:?} is an ally")]
    TargetIsAlly(UnitId),

    #[error("Target {0:?} is not an ally")]
    TargetNotAlly(UnitId),

    #[error("Target {0:?} is out of range")]
    OutOfRange(UnitId),

    #[error("Cell ({x}, {y}) is not reachable")]
    Unreachable { x: i32, y: i32 },

    #[error("Skill has no valid targets")]
    NoValidTargets,

    #[error("Battle is already over")]
    BattleOver,

    #[error("Battle has not started; call start_turn first")]
    BattleNotStarted,

    #[error("Battle is still in progress")]
    BattleInProgress,

    // Setup
    #[error("Map too small to deploy {side:?} units")]
    MapTooSmall { side: crate::battle::units::Side },

    #[error("Invalid map: {0}")]
    InvalidMap(String),
}

/// Failures loading configuration files.
///
/// Missing table entries are not errors; they fall back to documented
/// defaults at lookup time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, BattleError>;
