//! Battle configuration with documented constants
//!
//! All tunable scalars for the battle engine live here. Per-terrain and
//! per-arms-type tables live in [`crate::battle::rules::BattleRules`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::constants::*;
use crate::core::error::ConfigError;

/// Configuration for a battle
///
/// Every field has a default, so a TOML file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    // === LIFECYCLE ===
    /// Turn limit. Once the turn counter exceeds this the defender wins.
    pub max_bouts: u32,

    /// Combatants per side beyond this are dropped at battle start.
    pub max_units_per_side: usize,

    // === MOVEMENT ===
    /// Side length of the square window the movement flood fill explores.
    ///
    /// Odd values keep the origin exactly centered.
    pub move_window: u32,

    // === COMBAT ===
    /// Manhattan radius for a melee attack.
    pub melee_range: u32,

    /// Turns a skill-inflicted status lasts.
    pub status_duration: u32,

    /// Fraction of max HP/MP restored by resting.
    pub rest_recovery_ratio: f64,

    // === WEATHER ===
    /// Chance per turn (after the first) that the weather is redrawn.
    pub weather_change_chance: f64,

    // === AI ===
    /// Most enemies an AI skill will be aimed at.
    pub ai_skill_targets: usize,

    /// Support skills are considered only below this arms ratio.
    pub support_arms_ratio: f64,

    // === MAP GENERATION ===
    /// Width of a generated map when the host supplies none.
    pub map_width: u32,

    /// Height of a generated map when the host supplies none.
    pub map_height: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_bouts: MAX_BOUTS,
            max_units_per_side: MAX_UNITS_PER_SIDE,
            move_window: MOVE_WINDOW_SIZE,
            melee_range: MELEE_RANGE,
            status_duration: SKILL_STATUS_DURATION,
            rest_recovery_ratio: REST_RECOVERY_RATIO,
            weather_change_chance: WEATHER_CHANGE_CHANCE,
            ai_skill_targets: AI_SKILL_TARGETS,
            support_arms_ratio: SUPPORT_ARMS_RATIO,
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, filling unspecified fields with defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = toml::from_str(contents)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.max_bouts == 0 {
            return Err("max_bouts must be at least 1".into());
        }

        if self.max_units_per_side == 0 {
            return Err("max_units_per_side must be at least 1".into());
        }

        if self.move_window % 2 == 0 {
            return Err(format!(
                "move_window ({}) must be odd so the origin sits at its center",
                self.move_window
            ));
        }

        if self.ai_skill_targets == 0 {
            return Err("ai_skill_targets must be at least 1".into());
        }

        if !(0.0..=1.0).contains(&self.support_arms_ratio) {
            return Err(format!(
                "support_arms_ratio ({}) must be within 0.0..=1.0",
                self.support_arms_ratio
            ));
        }

        if !(0.0..=1.0).contains(&self.weather_change_chance) {
            return Err(format!(
                "weather_change_chance ({}) must be within 0.0..=1.0",
                self.weather_change_chance
            ));
        }

        if !(0.0..=1.0).contains(&self.rest_recovery_ratio) {
            return Err(format!(
                "rest_recovery_ratio ({}) must be within 0.0..=1.0",
                self.rest_recovery_ratio
            ));
        }

        if self.map_width < 2 || self.map_height < 1 {
            return Err(format!(
                "generated map {}x{} is too small",
                self.map_width, self.map_height
            ));
        }

        Ok(())
    }
}
