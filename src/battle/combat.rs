//! Attack, defense and damage formulas
//!
//! Melee damage:
//!
//! ```text
//! attack  = floor(force × (level + 10) × attack_modulus[arms])
//! defense = floor(iq × (level + 10) × defense_modulus[arms] × terrain_defense[terrain])
//! base    = floor(attack / defense × arms / 8 × matchup[attacker][defender]) + 10
//! damage  = max(1, floor(base × U[0.9, 1.1]))
//! ```
//!
//! The flat +10 keeps weak attackers from stalling; the random factor
//! is the only source of variance.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    ARMS_DIVISOR, DAMAGE_FLAT_BONUS, DAMAGE_VARIANCE_MAX, DAMAGE_VARIANCE_MIN, LEVEL_OFFSET,
};
use crate::battle::rules::BattleRules;
use crate::battle::skills::Skill;
use crate::battle::terrain::Terrain;
use crate::battle::units::{BattleUnit, CombatantSnapshot, Equipment, Side, UnitId, UnitStatus};
use crate::battle::weather::Weather;

/// Base HP before level scaling
const BASE_HP: u32 = 50;
const HP_PER_LEVEL: u32 = 5;

/// Result of a skill against one target, before it is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDamage {
    pub arms: u32,
    pub destroy: u32,
    pub status: Option<UnitStatus>,
}

/// Stateless combat formulas over a rule set
#[derive(Debug, Clone, Copy)]
pub struct CombatCalculator<'a> {
    rules: &'a BattleRules,
}

impl<'a> CombatCalculator<'a> {
    pub fn new(rules: &'a BattleRules) -> Self {
        Self { rules }
    }

    pub fn attack(&self, unit: &BattleUnit) -> u64 {
        let raw = (unit.force as u64).saturating_mul(unit.level as u64 + LEVEL_OFFSET as u64) as f64
            * self.rules.attack_modulus(unit.arms_type);
        raw.floor().max(0.0) as u64
    }

    /// Defense on `terrain`, clamped to at least 1
    pub fn defense(&self, unit: &BattleUnit, terrain: Terrain) -> u64 {
        let raw = (unit.iq as u64).saturating_mul(unit.level as u64 + LEVEL_OFFSET as u64) as f64
            * self.rules.defense_modulus(unit.arms_type)
            * self.rules.terrain_defense(terrain);
        let defense = raw.floor().max(0.0) as u64;
        if defense == 0 {
            tracing::warn!(unit = unit.id.0, "Defense computed as zero; clamping to 1");
            return 1;
        }
        defense
    }

    /// Damage before the random factor
    pub fn base_damage(&self, attacker: &BattleUnit, defender: &BattleUnit, terrain: Terrain) -> u32 {
        let ratio = self.attack(attacker) as f64 / self.defense(defender, terrain) as f64;
        let scaled = ratio
            * (attacker.arms as f64 / ARMS_DIVISOR)
            * self.rules.matchup(attacker.arms_type, defender.arms_type);
        let base = scaled.floor() as i64 + DAMAGE_FLAT_BONUS;
        base.clamp(1, u32::MAX as i64) as u32
    }

    /// Melee damage of `attacker` against `defender` standing on `terrain`; always at least 1
    pub fn calculate_damage<R: Rng + ?Sized>(
        &self,
        attacker: &BattleUnit,
        defender: &BattleUnit,
        terrain: Terrain,
        rng: &mut R,
    ) -> u32 {
        let base = self.base_damage(attacker, defender, terrain);
        let factor = rng.gen_range(DAMAGE_VARIANCE_MIN..=DAMAGE_VARIANCE_MAX);
        ((base as f64 * factor).floor() as u32).max(1)
    }

    /// Skill effect on one target
    ///
    /// `power` and `destroy` are each scaled by the weather, target arms
    /// type and target terrain percentages, then floored.
    pub fn skill_damage(
        &self,
        skill: &Skill,
        caster: &BattleUnit,
        target: &BattleUnit,
        weather: Weather,
        terrain: Terrain,
    ) -> SkillDamage {
        let effect = &skill.effect;
        let percent = effect.weather_percent(weather) as u64
            * effect.unit_percent(target.arms_type) as u64
            * effect.terrain_percent(terrain) as u64;
        let scale = |base: u32| (base as u64 * percent / 1_000_000).min(u32::MAX as u64) as u32;

        let damage = SkillDamage {
            arms: scale(effect.power),
            destroy: scale(effect.destroy),
            status: effect.inflicts,
        };
        tracing::trace!(
            caster = caster.id.0,
            target = target.id.0,
            skill = skill.id.0,
            arms = damage.arms,
            destroy = damage.destroy,
            "Skill damage"
        );
        damage
    }

    /// Build a battle unit from a combatant snapshot
    ///
    /// Equipment adds flat force, iq and movement. HP and MP start full:
    /// `max_hp = 50 + 5·level`, `max_mp = (iq + 2·level) / 2`.
    pub fn derive_unit(snapshot: &CombatantSnapshot, id: UnitId, side: Side) -> BattleUnit {
        // Snapshot stats come from the host; saturate rather than wrap
        let bonus = |stat: fn(&Equipment) -> u32| {
            snapshot
                .equipment
                .iter()
                .map(stat)
                .fold(0u32, |total, b| total.saturating_add(b))
        };
        let force = snapshot.force.saturating_add(bonus(|e: &Equipment| e.force));
        let iq = snapshot.iq.saturating_add(bonus(|e: &Equipment| e.iq));
        let movement = bonus(|e: &Equipment| e.movement);

        let max_hp = BASE_HP.saturating_add(HP_PER_LEVEL.saturating_mul(snapshot.level));
        let max_mp = ((iq as u64 + 2 * snapshot.level as u64) / 2).min(u32::MAX as u64) as u32;

        let mut unit = BattleUnit::new(id, side, snapshot.arms_type, snapshot.arms);
        unit.combatant = snapshot.id;
        unit.name = snapshot.name.clone();
        unit.level = snapshot.level;
        unit.force = force;
        unit.iq = iq;
        unit.hp = max_hp;
        unit.max_hp = max_hp;
        unit.mp = max_mp;
        unit.max_mp = max_mp;
        unit.move_power = snapshot.arms_type.default_properties().base_move.saturating_add(movement);
        unit
    }
}
