//! Battle system constants - all tunable defaults in one place
//!
//! These feed [`crate::core::config::BattleConfig::default`]; code reads the
//! config, not these constants, so a host can override any of them.

// Lifecycle
pub const MAX_BOUTS: u32 = 30;
pub const MAX_UNITS_PER_SIDE: usize = 10;

// Map
pub const DEFAULT_MAP_WIDTH: u32 = 20;
pub const DEFAULT_MAP_HEIGHT: u32 = 15;

// Movement
pub const MOVE_WINDOW_SIZE: u32 = 15;
pub const DEFAULT_RESISTANCE: u32 = 2;

// Combat
pub const MELEE_RANGE: u32 = 1;
pub const DAMAGE_FLAT_BONUS: i64 = 10;
pub const DAMAGE_VARIANCE_MIN: f64 = 0.9;
pub const DAMAGE_VARIANCE_MAX: f64 = 1.1;
pub const ARMS_DIVISOR: f64 = 8.0;
pub const LEVEL_OFFSET: u32 = 10;

// Status
pub const SKILL_STATUS_DURATION: u32 = 3;
/// Poison bites this fraction of max arms per turn (at least 1)
pub const POISON_ARMS_RATIO: f64 = 0.05;

// Rest
pub const REST_RECOVERY_RATIO: f64 = 0.1;

// Weather
pub const WEATHER_CHANGE_CHANCE: f64 = 0.2;

// AI
pub const AI_SKILL_TARGETS: usize = 3;
pub const SUPPORT_ARMS_RATIO: f64 = 0.5;
pub const AI_DISTANCE_WEIGHT: i32 = -10;
pub const AI_MELEE_BONUS: i32 = 50;

// Report
pub const EXP_DAMAGE_DIVISOR: u32 = 10;
pub const EXP_PER_KILL: u32 = 20;
pub const EXP_VICTORY_BONUS: u32 = 30;
