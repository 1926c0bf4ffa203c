//! Battle execution: lifecycle, turn sequencing and action dispatch
//!
//! Initializing -> InProgress -> Over. The active side is derived from the
//! turn counter, never stored. Every action is validated in full before
//! the first mutation, so a rejected action leaves the battle unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ai::BattleAi;
use crate::battle::battle_map::BattleMap;
use crate::battle::combat::CombatCalculator;
use crate::battle::constants::POISON_ARMS_RATIO;
use crate::battle::coord::GridCoord;
use crate::battle::pathfinding::{MoveArea, Obstacle, PathFinder};
use crate::battle::rules::BattleRules;
use crate::battle::skills::{SkillCatalog, SkillContext, SkillOutcome};
use crate::battle::units::{side_for_turn, BattleUnit, CombatantSnapshot, Side, UnitId, UnitStatus};
use crate::battle::weather::{change_weather, random_weather, Weather};
use crate::core::config::BattleConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, SkillId, Turn};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Initializing, // Built, no turn started yet
    InProgress,
    Over, // Terminal
}

/// Everything needed to start a battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleParams {
    pub attackers: Vec<CombatantSnapshot>,
    pub defenders: Vec<CombatantSnapshot>,
    /// Generated from the battle RNG when absent
    pub map: Option<BattleMap>,
    /// Drawn from entropy when absent
    pub seed: Option<u64>,
    /// An attacker victory captures the defended city
    pub is_siege: bool,
}

/// One unit action for a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitAction {
    Move { to: GridCoord },
    Attack { target: UnitId },
    Skill { skill: SkillId, targets: Vec<UnitId> },
    Rest,
}

/// What a successful action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Moved {
        from: GridCoord,
        to: GridCoord,
        path: Vec<GridCoord>,
    },
    Attacked {
        target: UnitId,
        damage: u32,
        killed: bool,
    },
    SkillUsed(SkillOutcome),
    Rested {
        hp: u32,
        mp: u32,
    },
}

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub turn: Turn,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleInitialized { attackers: usize, defenders: usize },
    TurnStarted { side: Side },
    WeatherChanged { from: Weather, to: Weather },
    UnitMoved { unit: UnitId, to: GridCoord },
    UnitAttacked { unit: UnitId, target: UnitId, damage: u32 },
    SkillUsed { unit: UnitId, skill: SkillId },
    StatusInflicted { unit: UnitId, status: UnitStatus },
    StatusExpired { unit: UnitId },
    PoisonDamage { unit: UnitId, damage: u32 },
    UnitRested { unit: UnitId },
    UnitKilled { unit: UnitId },
    BattleEnded { winner: Side },
}

/// One military encounter; owns its units and map for its lifetime
#[derive(Debug, Clone)]
pub struct Battle {
    id: BattleId,
    phase: BattlePhase,
    turn: Turn,
    weather: Weather,
    winner: Option<Side>,
    is_siege: bool,
    map: BattleMap,
    units: BTreeMap<UnitId, BattleUnit>,
    config: BattleConfig,
    rules: Arc<BattleRules>,
    skills: Arc<SkillCatalog>,
    rng: ChaCha8Rng,
    battle_log: Vec<BattleEvent>,
}

impl Battle {
    /// Build a battle from combatant snapshots
    ///
    /// Combatants beyond `max_units_per_side` are dropped. Victory is
    /// checked once before returning, so a side that fields nobody loses
    /// immediately.
    pub fn new(
        id: BattleId,
        params: BattleParams,
        config: BattleConfig,
        rules: Arc<BattleRules>,
        skills: Arc<SkillCatalog>,
    ) -> Result<Self> {
        let mut rng = match params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let map = match params.map {
            Some(map) => map,
            None => BattleMap::generate(config.map_width, config.map_height, &mut rng),
        };
        map.check_shape()?;

        let limit = config.max_units_per_side;
        for (side, count) in [
            (Side::Attacker, params.attackers.len()),
            (Side::Defender, params.defenders.len()),
        ] {
            if count > limit {
                tracing::debug!(?side, count, limit, "Truncating combatants beyond side limit");
            }
        }

        let mut units = BTreeMap::new();
        let roster = params
            .attackers
            .iter()
            .take(limit)
            .map(|s| (s, Side::Attacker))
            .chain(params.defenders.iter().take(limit).map(|s| (s, Side::Defender)));
        for (i, (snapshot, side)) in roster.enumerate() {
            let id = UnitId(i as u32 + 1);
            units.insert(id, CombatCalculator::derive_unit(snapshot, id, side));
        }

        let requested: BTreeMap<UnitId, GridCoord> = params
            .attackers
            .iter()
            .take(limit)
            .chain(params.defenders.iter().take(limit))
            .enumerate()
            .filter_map(|(i, s)| s.position.map(|p| (UnitId(i as u32 + 1), p)))
            .collect();
        deploy(&map, &mut units, &requested)?;

        let weather = random_weather(&mut rng);
        let attackers = units.values().filter(|u| u.side == Side::Attacker).count();
        let defenders = units.len() - attackers;

        let mut battle = Self {
            id,
            phase: BattlePhase::Initializing,
            turn: 0,
            weather,
            winner: None,
            is_siege: params.is_siege,
            map,
            units,
            config,
            rules,
            skills,
            rng,
            battle_log: Vec::new(),
        };

        tracing::info!(
            battle = %battle.id.0,
            attackers,
            defenders,
            ?weather,
            width = battle.map.width,
            height = battle.map.height,
            "Battle initialized"
        );
        battle.log_event(
            BattleEventType::BattleInitialized { attackers, defenders },
            format!("{} attackers face {} defenders under {:?} skies", attackers, defenders, weather),
        );
        battle.check_victory();
        Ok(battle)
    }

    pub fn id(&self) -> BattleId {
        self.id
    }

    pub fn phase(&self) -> BattlePhase {
        self.phase
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Is the battle finished?
    pub fn is_over(&self) -> bool {
        matches!(self.phase, BattlePhase::Over)
    }

    pub fn is_siege(&self) -> bool {
        self.is_siege
    }

    /// Side whose units may act; the attacker before the first turn
    pub fn current_side(&self) -> Side {
        side_for_turn(self.turn.max(1))
    }

    pub fn map(&self) -> &BattleMap {
        &self.map
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

    pub fn unit(&self, id: UnitId) -> Option<&BattleUnit> {
        self.units.get(&id)
    }

    /// Mutable unit access for host-side scripting
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BattleUnit> {
        self.units.get_mut(&id)
    }

    /// All units in id order
    pub fn units(&self) -> impl Iterator<Item = &BattleUnit> {
        self.units.values()
    }

    /// Active units of `side` in id order
    pub fn active_units(&self, side: Side) -> impl Iterator<Item = &BattleUnit> {
        self.units.values().filter(move |u| u.active && u.side == side)
    }

    /// The active unit standing on `pos`
    pub fn unit_at(&self, pos: GridCoord) -> Option<&BattleUnit> {
        self.map.unit_at(self.units.values(), pos)
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.battle_log
    }

    /// Take the event log, leaving it empty
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.battle_log)
    }

    pub fn path_finder(&self) -> PathFinder<'_> {
        PathFinder::new(&self.map, &self.rules)
    }

    pub fn calculator(&self) -> CombatCalculator<'_> {
        CombatCalculator::new(&self.rules)
    }

    /// Cells `unit` can reach this turn, with other units as obstacles
    pub fn move_area(&self, unit: UnitId) -> Result<MoveArea> {
        let mover = self.units.get(&unit).ok_or(BattleError::UnknownUnit(unit))?;
        let obstacles = self.obstacles_for(mover);
        Ok(self.path_finder().calculate_move_area(
            mover.position,
            mover.move_power,
            mover.arms_type,
            &obstacles,
            self.config.move_window,
        ))
    }

    /// Cheapest route for `unit` to `goal` around other units
    pub fn find_path(&self, unit: UnitId, goal: GridCoord) -> Result<Option<Vec<GridCoord>>> {
        let mover = self.units.get(&unit).ok_or(BattleError::UnknownUnit(unit))?;
        let blocked: Vec<GridCoord> = self.obstacles_for(mover).iter().map(|o| o.pos).collect();
        Ok(self
            .path_finder()
            .find_path(mover.position, goal, mover.arms_type, &blocked))
    }

    fn obstacles_for(&self, mover: &BattleUnit) -> Vec<Obstacle> {
        self.units
            .values()
            .filter(|u| u.active && u.id != mover.id)
            .map(|u| Obstacle {
                pos: u.position,
                hostile: u.is_enemy_of(mover),
            })
            .collect()
    }

    /// Log a battle event
    fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.battle_log.push(BattleEvent {
            turn: self.turn,
            event_type,
            description,
        });
    }

    /// Advance to the next turn and activate its side
    ///
    /// Resets `has_acted` for the newly active side, applies poison to it,
    /// counts down the statuses of the side that just finished, and
    /// (after turn 1) may redraw the weather.
    pub fn start_turn(&mut self) -> Result<Side> {
        if self.is_over() {
            return Err(BattleError::BattleOver);
        }

        self.turn += 1;
        self.phase = BattlePhase::InProgress;
        let side = side_for_turn(self.turn);

        if self.turn > 1 {
            let previous = self.weather;
            self.weather = change_weather(previous, self.config.weather_change_chance, &mut self.rng);
            if self.weather != previous {
                tracing::debug!(turn = self.turn, from = ?previous, to = ?self.weather, "Weather changed");
                self.log_event(
                    BattleEventType::WeatherChanged {
                        from: previous,
                        to: self.weather,
                    },
                    format!("Weather turns from {:?} to {:?}", previous, self.weather),
                );
            }
        }

        tracing::debug!(turn = self.turn, ?side, "Turn started");
        self.log_event(
            BattleEventType::TurnStarted { side },
            format!("Turn {}: {:?} to act", self.turn, side),
        );

        let ids: Vec<UnitId> = self.units.keys().copied().collect();
        for id in ids {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };

            if unit.side == side {
                unit.has_acted = false;
                if unit.active && unit.status == UnitStatus::Poisoned {
                    let bite = ((unit.max_arms as f64 * POISON_ARMS_RATIO).floor() as u32).max(1);
                    let before = unit.arms;
                    let killed = unit.take_damage(bite);
                    let lost = before - unit.arms;
                    let name = unit.name.clone();
                    self.log_event(
                        BattleEventType::PoisonDamage { unit: id, damage: lost },
                        format!("{} loses {} troops to poison", name, lost),
                    );
                    if killed {
                        self.log_event(
                            BattleEventType::UnitKilled { unit: id },
                            format!("{} is wiped out", name),
                        );
                    }
                }
            } else if self.turn > 1 && unit.active && unit.status != UnitStatus::Normal {
                unit.update_state();
                if unit.status == UnitStatus::Normal {
                    let name = unit.name.clone();
                    self.log_event(
                        BattleEventType::StatusExpired { unit: id },
                        format!("{} recovers", name),
                    );
                }
            }
        }

        self.check_victory();
        Ok(side)
    }

    /// Perform one action for `unit_id`
    pub fn execute_unit_action(&mut self, unit_id: UnitId, action: UnitAction) -> Result<ActionOutcome> {
        match self.phase {
            BattlePhase::Over => return Err(BattleError::BattleOver),
            BattlePhase::Initializing => return Err(BattleError::BattleNotStarted),
            BattlePhase::InProgress => {}
        }

        let unit = self.units.get(&unit_id).ok_or(BattleError::UnknownUnit(unit_id))?;
        if !unit.active {
            return Err(BattleError::UnitInactive(unit_id));
        }
        if unit.side != self.current_side() {
            return Err(BattleError::NotUnitsTurn(unit_id));
        }
        if unit.has_acted {
            return Err(BattleError::AlreadyActed(unit_id));
        }

        let outcome = match action {
            UnitAction::Move { to } => self.do_move(unit_id, to)?,
            UnitAction::Attack { target } => self.do_attack(unit_id, target)?,
            UnitAction::Skill { skill, targets } => self.do_skill(unit_id, skill, &targets)?,
            UnitAction::Rest => self.do_rest(unit_id),
        };

        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.has_acted = true;
        }
        self.check_victory();
        Ok(outcome)
    }

    fn forbidden(unit: &BattleUnit) -> BattleError {
        BattleError::StatusForbids {
            unit: unit.id,
            status: unit.status,
        }
    }

    fn do_move(&mut self, unit_id: UnitId, to: GridCoord) -> Result<ActionOutcome> {
        let unit = self.units.get(&unit_id).ok_or(BattleError::UnknownUnit(unit_id))?;
        if !unit.can_move() {
            return Err(Self::forbidden(unit));
        }

        let area = self.move_area(unit_id)?;
        if !area.contains(to) {
            return Err(BattleError::Unreachable { x: to.x, y: to.y });
        }

        let from = unit.position;
        let path = self
            .find_path(unit_id, to)?
            .ok_or(BattleError::Unreachable { x: to.x, y: to.y })?;

        let name = unit.name.clone();
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.position = to;
        }
        tracing::debug!(unit = unit_id.0, ?from, ?to, "Unit moved");
        self.log_event(
            BattleEventType::UnitMoved { unit: unit_id, to },
            format!("{} moves to ({}, {})", name, to.x, to.y),
        );
        Ok(ActionOutcome::Moved { from, to, path })
    }

    fn do_attack(&mut self, unit_id: UnitId, target_id: UnitId) -> Result<ActionOutcome> {
        let attacker = self.units.get(&unit_id).ok_or(BattleError::UnknownUnit(unit_id))?;
        if !attacker.can_attack() {
            return Err(Self::forbidden(attacker));
        }
        let defender = self.units.get(&target_id).ok_or(BattleError::UnknownUnit(target_id))?;
        if !defender.is_enemy_of(attacker) {
            return Err(BattleError::TargetIsAlly(target_id));
        }
        if !defender.active {
            return Err(BattleError::UnitInactive(target_id));
        }
        if attacker.position.distance(&defender.position) > self.config.melee_range {
            return Err(BattleError::OutOfRange(target_id));
        }

        let terrain = self.map.get_terrain(defender.position).unwrap_or_default();
        let damage = CombatCalculator::new(&self.rules).calculate_damage(attacker, defender, terrain, &mut self.rng);
        let attacker_name = attacker.name.clone();

        let (applied, killed, defender_name) = match self.units.get_mut(&target_id) {
            Some(defender) => {
                let before = defender.arms;
                let killed = defender.take_damage(damage);
                (before - defender.arms, killed, defender.name.clone())
            }
            None => (0, false, String::new()),
        };
        if let Some(attacker) = self.units.get_mut(&unit_id) {
            attacker.damage_dealt += applied;
            if killed {
                attacker.kills += 1;
            }
        }

        tracing::debug!(unit = unit_id.0, target = target_id.0, damage = applied, killed, "Attack resolved");
        self.log_event(
            BattleEventType::UnitAttacked {
                unit: unit_id,
                target: target_id,
                damage: applied,
            },
            format!("{} strikes {} for {} troops", attacker_name, defender_name, applied),
        );
        if killed {
            self.log_event(
                BattleEventType::UnitKilled { unit: target_id },
                format!("{} is wiped out", defender_name),
            );
        }

        Ok(ActionOutcome::Attacked {
            target: target_id,
            damage: applied,
            killed,
        })
    }

    fn do_skill(&mut self, unit_id: UnitId, skill: SkillId, targets: &[UnitId]) -> Result<ActionOutcome> {
        let caster = self.units.get(&unit_id).ok_or(BattleError::UnknownUnit(unit_id))?;
        if !caster.can_use_skill() {
            return Err(Self::forbidden(caster));
        }

        let ctx = SkillContext {
            map: &self.map,
            calculator: CombatCalculator::new(&self.rules),
            weather: self.weather,
            status_duration: self.config.status_duration,
        };
        let outcome = self
            .skills
            .execute_skill(&ctx, &mut self.units, unit_id, skill, targets)?;

        let skill_name = self
            .skills
            .get(skill)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.log_event(
            BattleEventType::SkillUsed { unit: unit_id, skill },
            format!("Unit {} casts {} on {} targets", unit_id.0, skill_name, outcome.hits.len()),
        );
        for hit in &outcome.hits {
            if let Some(status) = hit.status {
                self.log_event(
                    BattleEventType::StatusInflicted {
                        unit: hit.target,
                        status,
                    },
                    format!("Unit {} is afflicted with {:?}", hit.target.0, status),
                );
            }
            if hit.killed {
                self.log_event(
                    BattleEventType::UnitKilled { unit: hit.target },
                    format!("Unit {} is wiped out", hit.target.0),
                );
            }
        }
        Ok(ActionOutcome::SkillUsed(outcome))
    }

    fn do_rest(&mut self, unit_id: UnitId) -> ActionOutcome {
        let ratio = self.config.rest_recovery_ratio;
        let Some(unit) = self.units.get_mut(&unit_id) else {
            return ActionOutcome::Rested { hp: 0, mp: 0 };
        };

        let recover = |max: u32| ((max as f64 * ratio).floor() as u32).max(1);
        let hp = recover(unit.max_hp).min(unit.max_hp - unit.hp.min(unit.max_hp));
        let mp = recover(unit.max_mp).min(unit.max_mp - unit.mp.min(unit.max_mp));
        unit.hp += hp;
        unit.mp += mp;

        let name = unit.name.clone();
        self.log_event(
            BattleEventType::UnitRested { unit: unit_id },
            format!("{} rests (+{} HP, +{} MP)", name, hp, mp),
        );
        ActionOutcome::Rested { hp, mp }
    }

    /// Act for every ready unit of the current side, in id order
    ///
    /// Actions the AI proposes that turn out to be invalid fall back to
    /// resting so the turn always completes.
    pub fn run_ai_turn(&mut self, ai: &dyn BattleAi) -> Result<Vec<(UnitId, ActionOutcome)>> {
        match self.phase {
            BattlePhase::Over => return Err(BattleError::BattleOver),
            BattlePhase::Initializing => return Err(BattleError::BattleNotStarted),
            BattlePhase::InProgress => {}
        }

        let side = self.current_side();
        let ids: Vec<UnitId> = self.active_units(side).map(|u| u.id).collect();
        let mut results = Vec::new();

        for id in ids {
            if self.is_over() {
                break;
            }
            if !self.units.get(&id).is_some_and(|u| u.is_ready()) {
                continue;
            }

            let action = ai.decide(self, id);
            let outcome = match self.execute_unit_action(id, action.clone()) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(unit = id.0, ?action, %err, "AI action rejected; resting instead");
                    self.execute_unit_action(id, UnitAction::Rest)?
                }
            };
            results.push((id, outcome));
        }

        Ok(results)
    }

    /// Evaluate victory, ending the battle if decided
    ///
    /// Attacker wins when no defender is active (checked first, so a
    /// mutual wipe-out goes to the attacker); defender wins when no
    /// attacker is active or the turn counter passes `max_bouts`.
    pub fn check_victory(&mut self) -> Option<Side> {
        if self.winner.is_some() {
            return self.winner;
        }

        let attackers_alive = self.active_units(Side::Attacker).next().is_some();
        let defenders_alive = self.active_units(Side::Defender).next().is_some();

        let winner = if !defenders_alive {
            Some(Side::Attacker)
        } else if !attackers_alive || self.turn > self.config.max_bouts {
            Some(Side::Defender)
        } else {
            None
        };

        if let Some(winner) = winner {
            self.end_battle(winner);
        }
        winner
    }

    /// End the battle with a winner
    fn end_battle(&mut self, winner: Side) {
        self.phase = BattlePhase::Over;
        self.winner = Some(winner);
        tracing::info!(battle = %self.id.0, turn = self.turn, ?winner, "Battle ended");
        self.log_event(
            BattleEventType::BattleEnded { winner },
            format!("Battle ended: {:?} victory", winner),
        );
    }
}

/// Place units on the map
///
/// Requested positions are honored when on the map and free. Everyone
/// else fills their side's half column by column: attackers from the west
/// edge inward, defenders from the east edge inward.
fn deploy(
    map: &BattleMap,
    units: &mut BTreeMap<UnitId, BattleUnit>,
    requested: &BTreeMap<UnitId, GridCoord>,
) -> Result<()> {
    let mut occupied = AHashSet::new();
    let mut pending = Vec::new();

    for unit in units.values_mut() {
        match requested.get(&unit.id) {
            Some(&pos) if map.is_valid_position(pos) && !occupied.contains(&pos) => {
                unit.position = pos;
                occupied.insert(pos);
            }
            Some(&pos) => {
                tracing::warn!(unit = unit.id.0, ?pos, "Requested deployment cell unusable; auto-deploying");
                pending.push(unit.id);
            }
            None => pending.push(unit.id),
        }
    }

    let width = map.width as i32;
    let half = width / 2;
    for id in pending {
        let Some(unit) = units.get_mut(&id) else {
            continue;
        };
        let columns: Vec<i32> = match unit.side {
            Side::Attacker => (0..half).collect(),
            Side::Defender => (half..width).rev().collect(),
        };
        let slot = columns
            .iter()
            .flat_map(|&x| (0..map.height as i32).map(move |y| GridCoord::new(x, y)))
            .find(|pos| !occupied.contains(pos))
            .ok_or(BattleError::MapTooSmall { side: unit.side })?;
        unit.position = slot;
        occupied.insert(slot);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::unit_type::ArmsType;

    fn snap(id: u32, arms_type: ArmsType) -> CombatantSnapshot {
        CombatantSnapshot::new(id, "Officer", 5, 60, 60, arms_type, 1000)
    }

    fn battle_with(attackers: Vec<CombatantSnapshot>, defenders: Vec<CombatantSnapshot>) -> Battle {
        let params = BattleParams {
            attackers,
            defenders,
            map: Some(BattleMap::new(12, 8)),
            seed: Some(42),
            is_siege: false,
        };
        Battle::new(
            BattleId::new(),
            params,
            BattleConfig::default(),
            Arc::new(BattleRules::default()),
            Arc::new(SkillCatalog::default()),
        )
        .expect("battle builds")
    }

    #[test]
    fn test_battle_creation() {
        let battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        assert_eq!(battle.turn(), 0);
        assert_eq!(battle.phase(), BattlePhase::Initializing);
        assert!(!battle.is_over());
        assert_eq!(battle.units().count(), 2);
    }

    #[test]
    fn test_units_deploy_on_their_edges() {
        let battle = battle_with(
            vec![snap(1, ArmsType::Cavalry), snap(2, ArmsType::Infantry)],
            vec![snap(3, ArmsType::Infantry)],
        );
        let a1 = battle.unit(UnitId(1)).expect("unit");
        let a2 = battle.unit(UnitId(2)).expect("unit");
        let d1 = battle.unit(UnitId(3)).expect("unit");
        assert_eq!(a1.position, GridCoord::new(0, 0));
        assert_eq!(a2.position, GridCoord::new(0, 1));
        assert_eq!(d1.position, GridCoord::new(11, 0));
    }

    #[test]
    fn test_requested_position_honored() {
        let battle = battle_with(
            vec![snap(1, ArmsType::Cavalry).at(GridCoord::new(5, 5))],
            vec![snap(2, ArmsType::Infantry)],
        );
        assert_eq!(battle.unit(UnitId(1)).map(|u| u.position), Some(GridCoord::new(5, 5)));
        assert_eq!(battle.unit_at(GridCoord::new(5, 5)).map(|u| u.id), Some(UnitId(1)));
    }

    #[test]
    fn test_map_too_small() {
        let params = BattleParams {
            attackers: vec![snap(1, ArmsType::Cavalry), snap(2, ArmsType::Cavalry)],
            defenders: vec![snap(3, ArmsType::Infantry)],
            map: Some(BattleMap::new(2, 1)),
            seed: Some(1),
            is_siege: false,
        };
        let result = Battle::new(
            BattleId::new(),
            params,
            BattleConfig::default(),
            Arc::new(BattleRules::default()),
            Arc::new(SkillCatalog::default()),
        );
        assert!(matches!(
            result,
            Err(BattleError::MapTooSmall { side: Side::Attacker })
        ));
    }

    #[test]
    fn test_actions_rejected_before_first_turn() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        assert_eq!(
            battle.execute_unit_action(UnitId(1), UnitAction::Rest),
            Err(BattleError::BattleNotStarted)
        );
    }

    #[test]
    fn test_start_turn_alternates_sides() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        assert_eq!(battle.start_turn(), Ok(Side::Attacker));
        assert_eq!(battle.start_turn(), Ok(Side::Defender));
        assert_eq!(battle.start_turn(), Ok(Side::Attacker));
        assert_eq!(battle.current_side(), Side::Attacker);
    }

    #[test]
    fn test_wrong_side_cannot_act() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn");
        assert_eq!(
            battle.execute_unit_action(UnitId(2), UnitAction::Rest),
            Err(BattleError::NotUnitsTurn(UnitId(2)))
        );
    }

    #[test]
    fn test_move_and_unreachable() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn");

        // Cavalry has 10 move, plain costs 2: four steps leave 2
        let outcome = battle
            .execute_unit_action(UnitId(1), UnitAction::Move { to: GridCoord::new(4, 0) })
            .expect("move");
        match outcome {
            ActionOutcome::Moved { from, to, path } => {
                assert_eq!(from, GridCoord::new(0, 0));
                assert_eq!(to, GridCoord::new(4, 0));
                assert_eq!(path.len(), 5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        battle.start_turn().expect("turn");
        battle.start_turn().expect("turn");
        let before = battle.unit(UnitId(1)).cloned();
        let result = battle.execute_unit_action(UnitId(1), UnitAction::Move { to: GridCoord::new(9, 0) });
        assert_eq!(result, Err(BattleError::Unreachable { x: 9, y: 0 }));
        assert_eq!(battle.unit(UnitId(1)).cloned(), before);
    }

    #[test]
    fn test_bound_unit_cannot_move() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn");
        if let Some(unit) = battle.unit_mut(UnitId(1)) {
            unit.set_state(UnitStatus::Bound, 3);
        }
        let result = battle.execute_unit_action(UnitId(1), UnitAction::Move { to: GridCoord::new(1, 0) });
        assert_eq!(
            result,
            Err(BattleError::StatusForbids {
                unit: UnitId(1),
                status: UnitStatus::Bound
            })
        );
    }

    #[test]
    fn test_attack_requires_adjacency() {
        let mut battle = battle_with(
            vec![snap(1, ArmsType::Cavalry).at(GridCoord::new(4, 4))],
            vec![snap(2, ArmsType::Infantry).at(GridCoord::new(6, 4))],
        );
        battle.start_turn().expect("turn");
        assert_eq!(
            battle.execute_unit_action(UnitId(1), UnitAction::Attack { target: UnitId(2) }),
            Err(BattleError::OutOfRange(UnitId(2)))
        );
    }

    #[test]
    fn test_attack_deals_damage_and_records_stats() {
        let mut battle = battle_with(
            vec![snap(1, ArmsType::Cavalry).at(GridCoord::new(4, 4))],
            vec![snap(2, ArmsType::Infantry).at(GridCoord::new(5, 4))],
        );
        battle.start_turn().expect("turn");
        let outcome = battle
            .execute_unit_action(UnitId(1), UnitAction::Attack { target: UnitId(2) })
            .expect("attack");
        let ActionOutcome::Attacked { damage, .. } = outcome else {
            panic!("expected an attack outcome");
        };

        assert!(damage >= 1);
        assert_eq!(battle.unit(UnitId(2)).map(|u| u.arms), Some(1000 - damage));
        assert_eq!(battle.unit(UnitId(2)).map(|u| u.damage_taken), Some(damage));
        assert_eq!(battle.unit(UnitId(1)).map(|u| u.damage_dealt), Some(damage));
        assert!(battle.unit(UnitId(1)).is_some_and(|u| u.has_acted));
    }

    #[test]
    fn test_rest_recovers_hp_and_mp() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn");
        if let Some(unit) = battle.unit_mut(UnitId(1)) {
            unit.hp = 10;
            unit.mp = 0;
        }
        let max_hp = battle.unit(UnitId(1)).map_or(0, |u| u.max_hp);
        let max_mp = battle.unit(UnitId(1)).map_or(0, |u| u.max_mp);

        let outcome = battle.execute_unit_action(UnitId(1), UnitAction::Rest).expect("rest");
        assert_eq!(
            outcome,
            ActionOutcome::Rested {
                hp: (max_hp / 10).max(1),
                mp: (max_mp / 10).max(1)
            }
        );
    }

    #[test]
    fn test_poison_bites_at_own_turn_start() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        if let Some(unit) = battle.unit_mut(UnitId(2)) {
            unit.set_state(UnitStatus::Poisoned, 3);
        }
        battle.start_turn().expect("turn 1");
        assert_eq!(battle.unit(UnitId(2)).map(|u| u.arms), Some(1000));
        battle.start_turn().expect("turn 2");
        assert_eq!(battle.unit(UnitId(2)).map(|u| u.arms), Some(950));
        assert!(battle
            .events()
            .iter()
            .any(|e| e.event_type == BattleEventType::PoisonDamage { unit: UnitId(2), damage: 50 }));
    }

    #[test]
    fn test_status_lasts_three_victim_turns() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn 1");
        if let Some(unit) = battle.unit_mut(UnitId(2)) {
            unit.set_state(UnitStatus::Chaos, 3);
        }
        let mut chaotic_turns = 0;
        for _ in 0..4 {
            battle.start_turn().expect("defender turn");
            if battle.unit(UnitId(2)).is_some_and(|u| u.status == UnitStatus::Chaos) {
                chaotic_turns += 1;
            }
            battle.start_turn().expect("attacker turn");
        }
        assert_eq!(chaotic_turns, 3);
    }

    #[test]
    fn test_turn_limit_goes_to_defender() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        let max = battle.config().max_bouts;
        for _ in 0..max {
            battle.start_turn().expect("turn");
        }
        assert!(!battle.is_over());
        battle.start_turn().expect("final turn");
        assert!(battle.is_over());
        assert_eq!(battle.winner(), Some(Side::Defender));
        assert_eq!(battle.start_turn(), Err(BattleError::BattleOver));
    }

    #[test]
    fn test_side_limit_truncates() {
        let attackers = (1..=12).map(|i| snap(i, ArmsType::Infantry)).collect();
        let battle = battle_with(attackers, vec![snap(99, ArmsType::Infantry)]);
        assert_eq!(battle.active_units(Side::Attacker).count(), 10);
        assert_eq!(battle.active_units(Side::Defender).count(), 1);
    }

    #[test]
    fn test_move_path_detours_around_ally() {
        let mut battle = battle_with(
            vec![
                snap(1, ArmsType::Cavalry).at(GridCoord::new(0, 0)),
                snap(2, ArmsType::Infantry).at(GridCoord::new(1, 0)),
            ],
            vec![snap(3, ArmsType::Infantry)],
        );
        battle.start_turn().expect("turn");

        let outcome = battle
            .execute_unit_action(UnitId(1), UnitAction::Move { to: GridCoord::new(2, 0) })
            .expect("move");
        let ActionOutcome::Moved { path, .. } = outcome else {
            panic!("expected a move outcome");
        };
        assert_eq!(path.first().copied(), Some(GridCoord::new(0, 0)));
        assert_eq!(path.last().copied(), Some(GridCoord::new(2, 0)));
        assert!(!path.contains(&GridCoord::new(1, 0)));
        assert!(path.windows(2).all(|w| w[0].is_adjacent(&w[1])));
    }

    #[test]
    fn test_last_attacker_killed_goes_to_defender() {
        let mut battle = battle_with(
            vec![CombatantSnapshot::new(1, "Scout", 5, 60, 60, ArmsType::Cavalry, 5).at(GridCoord::new(4, 4))],
            vec![snap(2, ArmsType::Infantry).at(GridCoord::new(5, 4))],
        );
        battle.start_turn().expect("turn 1");
        battle.execute_unit_action(UnitId(1), UnitAction::Rest).expect("rest");
        battle.start_turn().expect("turn 2");

        let outcome = battle
            .execute_unit_action(UnitId(2), UnitAction::Attack { target: UnitId(1) })
            .expect("attack");
        assert!(matches!(outcome, ActionOutcome::Attacked { killed: true, .. }));
        assert!(battle.is_over());
        assert_eq!(battle.winner(), Some(Side::Defender));
        assert_eq!(
            battle.execute_unit_action(UnitId(2), UnitAction::Rest),
            Err(BattleError::BattleOver)
        );
        assert_eq!(battle.check_victory(), Some(Side::Defender));
    }

    #[test]
    fn test_mutual_wipe_out_goes_to_attacker() {
        let mut battle = battle_with(vec![snap(1, ArmsType::Cavalry)], vec![snap(2, ArmsType::Infantry)]);
        battle.start_turn().expect("turn");
        for id in [UnitId(1), UnitId(2)] {
            if let Some(unit) = battle.unit_mut(id) {
                unit.take_damage(1000);
            }
        }
        assert_eq!(battle.check_victory(), Some(Side::Attacker));
        assert!(battle.is_over());

        // Reviving a unit afterwards does not reopen the result
        if let Some(unit) = battle.unit_mut(UnitId(2)) {
            unit.arms = 10;
            unit.active = true;
        }
        assert_eq!(battle.check_victory(), Some(Side::Attacker));
        assert_eq!(battle.winner(), Some(Side::Attacker));
        let endings = battle
            .events()
            .iter()
            .filter(|e| matches!(e.event_type, BattleEventType::BattleEnded { .. }))
            .count();
        assert_eq!(endings, 1);
    }

    #[test]
    fn test_poison_kill_ends_battle() {
        let mut battle = battle_with(
            vec![snap(1, ArmsType::Cavalry)],
            vec![CombatantSnapshot::new(2, "Frail", 5, 60, 60, ArmsType::Infantry, 1)],
        );
        if let Some(unit) = battle.unit_mut(UnitId(2)) {
            unit.set_state(UnitStatus::Poisoned, 3);
        }
        battle.start_turn().expect("turn 1");
        assert!(!battle.is_over());

        assert_eq!(battle.start_turn(), Ok(Side::Defender));
        assert!(battle.is_over());
        assert_eq!(battle.winner(), Some(Side::Attacker));
        assert!(battle
            .events()
            .iter()
            .any(|e| e.event_type == BattleEventType::UnitKilled { unit: UnitId(2) }));
        assert_eq!(battle.start_turn(), Err(BattleError::BattleOver));
    }
}
