//! Battle registry
//!
//! Holds the shared configuration, rule tables and skill catalog, and the
//! battles currently in flight. Battles never share units or maps; the
//! shared data is read-only behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;

use crate::battle::ai::{AiController, BattleAi};
use crate::battle::execution::{ActionOutcome, Battle, BattleParams, UnitAction};
use crate::battle::report::BattleReport;
use crate::battle::rules::BattleRules;
use crate::battle::skills::SkillCatalog;
use crate::battle::units::{Side, UnitId};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, ConfigError, Result};
use crate::core::types::BattleId;

pub struct BattleSystem {
    config: BattleConfig,
    rules: Arc<BattleRules>,
    skills: Arc<SkillCatalog>,
    ai: Box<dyn BattleAi>,
    battles: AHashMap<BattleId, Battle>,
}

impl Default for BattleSystem {
    fn default() -> Self {
        Self::new(BattleConfig::default(), BattleRules::default(), SkillCatalog::default())
    }
}

impl BattleSystem {
    pub fn new(config: BattleConfig, rules: BattleRules, skills: SkillCatalog) -> Self {
        Self {
            config,
            rules: Arc::new(rules),
            skills: Arc::new(skills),
            ai: Box::new(AiController::new()),
            battles: AHashMap::new(),
        }
    }

    /// Load config, rules and skills from TOML files
    pub fn load(
        config: impl AsRef<Path>,
        rules: impl AsRef<Path>,
        skills: impl AsRef<Path>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(
            BattleConfig::load(config)?,
            BattleRules::load(rules)?,
            SkillCatalog::load(skills)?,
        ))
    }

    /// Replace the AI used by `run_ai_turn`
    pub fn with_ai(mut self, ai: Box<dyn BattleAi>) -> Self {
        self.ai = ai;
        self
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn rules(&self) -> &BattleRules {
        &self.rules
    }

    pub fn skills(&self) -> &SkillCatalog {
        &self.skills
    }

    /// Number of battles not yet concluded
    pub fn active_battles(&self) -> usize {
        self.battles.len()
    }

    /// Build and register a new battle
    pub fn init_battle(&mut self, params: BattleParams) -> Result<BattleId> {
        let id = BattleId::new();
        let battle = Battle::new(
            id,
            params,
            self.config.clone(),
            Arc::clone(&self.rules),
            Arc::clone(&self.skills),
        )?;
        self.battles.insert(id, battle);
        Ok(id)
    }

    pub fn battle(&self, id: BattleId) -> Result<&Battle> {
        self.battles.get(&id).ok_or(BattleError::UnknownBattle(id))
    }

    pub fn battle_mut(&mut self, id: BattleId) -> Result<&mut Battle> {
        self.battles.get_mut(&id).ok_or(BattleError::UnknownBattle(id))
    }

    pub fn start_turn(&mut self, id: BattleId) -> Result<Side> {
        self.battle_mut(id)?.start_turn()
    }

    pub fn execute_unit_action(&mut self, id: BattleId, unit: UnitId, action: UnitAction) -> Result<ActionOutcome> {
        self.battle_mut(id)?.execute_unit_action(unit, action)
    }

    /// Let the AI act for every ready unit of the current side
    pub fn run_ai_turn(&mut self, id: BattleId) -> Result<Vec<(UnitId, ActionOutcome)>> {
        let battle = self.battles.get_mut(&id).ok_or(BattleError::UnknownBattle(id))?;
        battle.run_ai_turn(self.ai.as_ref())
    }

    /// AI plays both sides until the battle ends, then concludes it
    pub fn auto_resolve(&mut self, id: BattleId) -> Result<BattleReport> {
        loop {
            let battle = self.battles.get_mut(&id).ok_or(BattleError::UnknownBattle(id))?;
            if battle.is_over() {
                break;
            }
            battle.start_turn()?;
            if battle.is_over() {
                break;
            }
            battle.run_ai_turn(self.ai.as_ref())?;
        }
        self.conclude(id)
    }

    /// Take the report of a finished battle and discard the battle
    pub fn conclude(&mut self, id: BattleId) -> Result<BattleReport> {
        let battle = self.battle(id)?;
        let report = BattleReport::from_battle(battle).ok_or(BattleError::BattleInProgress)?;
        self.battles.remove(&id);
        tracing::info!(
            battle = %id.0,
            winner = ?report.winner,
            turns = report.turns,
            survivors = report.survivors.len(),
            "Battle concluded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::battle_map::BattleMap;
    use crate::battle::unit_type::ArmsType;
    use crate::battle::units::CombatantSnapshot;

    fn params() -> BattleParams {
        BattleParams {
            attackers: vec![CombatantSnapshot::new(1, "A", 5, 70, 50, ArmsType::Cavalry, 800)],
            defenders: vec![CombatantSnapshot::new(2, "D", 5, 50, 50, ArmsType::Infantry, 600)],
            map: Some(BattleMap::new(10, 6)),
            seed: Some(42),
            is_siege: true,
        }
    }

    #[test]
    fn test_unknown_battle() {
        let mut system = BattleSystem::default();
        let missing = BattleId::new();
        assert_eq!(system.start_turn(missing).err(), Some(BattleError::UnknownBattle(missing)));
        assert!(system.battle(missing).is_err());
    }

    #[test]
    fn test_conclude_requires_finished_battle() {
        let mut system = BattleSystem::default();
        let id = system.init_battle(params()).expect("init");
        assert_eq!(system.conclude(id).err(), Some(BattleError::BattleInProgress));
        assert_eq!(system.active_battles(), 1);
    }

    #[test]
    fn test_auto_resolve_finishes_and_discards() {
        let mut system = BattleSystem::default();
        let id = system.init_battle(params()).expect("init");
        let report = system.auto_resolve(id).expect("resolves");

        assert!(report.turns <= system.config().max_bouts + 1);
        assert_eq!(report.city_captured, report.winner == Side::Attacker);
        assert_eq!(system.active_battles(), 0);
        assert!(system.battle(id).is_err());
    }
}
