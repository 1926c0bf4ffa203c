pub mod config;
pub mod error;
pub mod types;

pub use config::BattleConfig;
pub use error::{BattleError, ConfigError, Result};
pub use types::{BattleId, CombatantId, SkillId, Turn};
