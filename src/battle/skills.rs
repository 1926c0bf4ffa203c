//! Skill catalog, affordability checks and effect application
//!
//! Every unit may use every catalog skill it can pay for. Skills are plain
//! data loaded from TOML; the three kinds differ only in which fields of
//! the effect are set:
//!
//! - **Attack**: `power` and/or `destroy`, no status
//! - **Control**: inflicts a status (may also deal damage)
//! - **Support**: `heal`, targets allies

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::battle_map::BattleMap;
use crate::battle::combat::CombatCalculator;
use crate::battle::coord::GridCoord;
use crate::battle::terrain::Terrain;
use crate::battle::unit_type::ArmsType;
use crate::battle::units::{BattleUnit, UnitId, UnitStatus};
use crate::battle::weather::Weather;
use crate::core::error::{BattleError, ConfigError, Result};
use crate::core::types::SkillId;

/// Half-width of the default square skill range
const WINDOW_HALF: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Attack,
    Control,
    Support,
}

/// Cells a skill can reach around its caster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillRange {
    /// Fixed 5×5 square centered on the caster
    #[default]
    Window5x5,
    /// Manhattan disc
    Disc(u32),
}

/// What a skill does to each target
///
/// The percent tables scale `power` and `destroy`; a missing entry is 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEffect {
    /// Arms damage before modifiers
    pub power: u32,
    /// MP drained before modifiers
    pub destroy: u32,
    /// Arms restored to each ally target
    pub heal: u32,
    pub inflicts: Option<UnitStatus>,
    pub weather_percent: AHashMap<Weather, u32>,
    pub unit_percent: AHashMap<ArmsType, u32>,
    pub terrain_percent: AHashMap<Terrain, u32>,
}

impl SkillEffect {
    pub fn weather_percent(&self, weather: Weather) -> u32 {
        self.weather_percent.get(&weather).copied().unwrap_or(100)
    }

    pub fn unit_percent(&self, arms: ArmsType) -> u32 {
        self.unit_percent.get(&arms).copied().unwrap_or(100)
    }

    pub fn terrain_percent(&self, terrain: Terrain) -> u32 {
        self.terrain_percent.get(&terrain).copied().unwrap_or(100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub mp_cost: u32,
    #[serde(default)]
    pub range: SkillRange,
    #[serde(default)]
    pub effect: SkillEffect,
}

impl Skill {
    pub fn kind(&self) -> SkillKind {
        if self.effect.heal > 0 {
            SkillKind::Support
        } else if self.effect.inflicts.is_some() {
            SkillKind::Control
        } else {
            SkillKind::Attack
        }
    }

    pub fn targets_allies(&self) -> bool {
        self.kind() == SkillKind::Support
    }
}

/// Per-target result of a skill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillHit {
    pub target: UnitId,
    pub arms_lost: u32,
    pub mp_lost: u32,
    pub healed: u32,
    pub status: Option<UnitStatus>,
    pub killed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillOutcome {
    pub skill: SkillId,
    pub caster: UnitId,
    pub mp_spent: u32,
    pub hits: Vec<SkillHit>,
}

/// Battle state a skill reads while resolving
#[derive(Debug, Clone, Copy)]
pub struct SkillContext<'a> {
    pub map: &'a BattleMap,
    pub calculator: CombatCalculator<'a>,
    pub weather: Weather,
    pub status_duration: u32,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    skills: Vec<Skill>,
}

/// All skills known to a battle, keyed by id
#[derive(Debug, Clone, PartialEq)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, Skill>,
}

impl SkillCatalog {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self {
            skills: skills.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parse a catalog from a TOML `[[skills]]` array
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(contents)?;
        let count = file.skills.len();
        let catalog = Self::new(file.skills);
        if catalog.len() != count {
            return Err(ConfigError::Invalid(format!(
                "{} skills share an id with another skill",
                count - catalog.len()
            )));
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, id: SkillId) -> Option<&Skill> {
        self.skills.get(&id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// Skills the unit could cast right now, in id order
    ///
    /// Filters on MP and silence only; whether the unit has already acted
    /// is the battle's concern.
    pub fn available_skills(&self, unit: &BattleUnit) -> Vec<&Skill> {
        if !unit.active || unit.status == UnitStatus::Silenced {
            return Vec::new();
        }
        self.skills.values().filter(|s| s.mp_cost <= unit.mp).collect()
    }

    /// Resolve `skill` cast by `caster` on `targets`
    ///
    /// Either the whole skill resolves (MP spent, every valid target hit)
    /// or an error is returned and `units` is untouched. Targets that are
    /// inactive or out of range are skipped; an ally given to an offensive
    /// skill (or an enemy given to a support skill) is an error.
    pub fn execute_skill(
        &self,
        ctx: &SkillContext<'_>,
        units: &mut BTreeMap<UnitId, BattleUnit>,
        caster_id: UnitId,
        skill_id: SkillId,
        targets: &[UnitId],
    ) -> Result<SkillOutcome> {
        let skill = self.get(skill_id).ok_or(BattleError::UnknownSkill(skill_id))?;
        let caster = units
            .get(&caster_id)
            .cloned()
            .ok_or(BattleError::UnknownUnit(caster_id))?;

        if !caster.active {
            return Err(BattleError::UnitInactive(caster_id));
        }
        if caster.status == UnitStatus::Silenced {
            return Err(BattleError::StatusForbids {
                unit: caster_id,
                status: caster.status,
            });
        }
        if caster.mp < skill.mp_cost {
            return Err(BattleError::InsufficientMp {
                needed: skill.mp_cost,
                available: caster.mp,
            });
        }

        let in_range = skill_range(ctx.map, skill, caster.position);
        let mut valid = Vec::new();
        for id in targets {
            let target = units.get(id).ok_or(BattleError::UnknownUnit(*id))?;
            let ally = target.side == caster.side;
            if skill.targets_allies() && !ally {
                return Err(BattleError::TargetNotAlly(*id));
            }
            if !skill.targets_allies() && ally {
                return Err(BattleError::TargetIsAlly(*id));
            }
            if !target.active || !in_range.contains(&target.position) || valid.contains(id) {
                continue;
            }
            valid.push(*id);
        }
        if valid.is_empty() {
            return Err(BattleError::NoValidTargets);
        }

        // Validation done; mutate from here on
        let mut hits = Vec::with_capacity(valid.len());
        let mut dealt = 0;
        let mut kills = 0;

        for id in valid {
            let Some(target) = units.get_mut(&id) else {
                continue;
            };

            if skill.targets_allies() {
                let healed = target.heal(skill.effect.heal);
                hits.push(SkillHit {
                    target: id,
                    arms_lost: 0,
                    mp_lost: 0,
                    healed,
                    status: None,
                    killed: false,
                });
                continue;
            }

            let terrain = ctx.map.get_terrain(target.position).unwrap_or_default();
            let damage = ctx
                .calculator
                .skill_damage(skill, &caster, target, ctx.weather, terrain);

            let before = target.arms;
            let killed = target.take_damage(damage.arms);
            let arms_lost = before - target.arms;

            let mp_lost = damage.destroy.min(target.mp);
            target.mp -= mp_lost;

            let status = match damage.status {
                Some(status) if target.active => {
                    target.set_state(status, ctx.status_duration);
                    Some(status)
                }
                _ => None,
            };

            dealt += arms_lost;
            if killed {
                kills += 1;
            }
            hits.push(SkillHit {
                target: id,
                arms_lost,
                mp_lost,
                healed: 0,
                status,
                killed,
            });
        }

        if let Some(caster) = units.get_mut(&caster_id) {
            caster.mp -= skill.mp_cost;
            caster.damage_dealt += dealt;
            caster.kills += kills;
        }

        tracing::debug!(
            caster = caster_id.0,
            skill = %skill.name,
            targets = hits.len(),
            dealt,
            "Skill resolved"
        );

        Ok(SkillOutcome {
            skill: skill_id,
            caster: caster_id,
            mp_spent: skill.mp_cost,
            hits,
        })
    }
}

impl Default for SkillCatalog {
    fn default() -> Self {
        let pct = |entries: &[(Weather, u32)]| entries.iter().copied().collect::<AHashMap<_, _>>();

        let fire = Skill {
            id: SkillId(1),
            name: "Fire".into(),
            mp_cost: 8,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                power: 300,
                weather_percent: pct(&[(Weather::Sunny, 120), (Weather::Rainy, 50), (Weather::Hail, 70)]),
                unit_percent: [(ArmsType::Navy, 80)].into_iter().collect(),
                terrain_percent: [(Terrain::Forest, 150), (Terrain::Grass, 120), (Terrain::River, 50)]
                    .into_iter()
                    .collect(),
                ..Default::default()
            },
        };
        let flood = Skill {
            id: SkillId(2),
            name: "Flood".into(),
            mp_cost: 10,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                power: 250,
                weather_percent: pct(&[(Weather::Rainy, 150), (Weather::Sunny, 80)]),
                unit_percent: [(ArmsType::Navy, 50)].into_iter().collect(),
                terrain_percent: [(Terrain::River, 150), (Terrain::Mountain, 50)].into_iter().collect(),
                ..Default::default()
            },
        };
        let rockfall = Skill {
            id: SkillId(3),
            name: "Rockfall".into(),
            mp_cost: 14,
            range: SkillRange::Disc(3),
            effect: SkillEffect {
                power: 350,
                unit_percent: [(ArmsType::Cavalry, 120)].into_iter().collect(),
                terrain_percent: [(Terrain::Mountain, 150)].into_iter().collect(),
                ..Default::default()
            },
        };
        let confuse = Skill {
            id: SkillId(4),
            name: "Confuse".into(),
            mp_cost: 6,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                inflicts: Some(UnitStatus::Chaos),
                ..Default::default()
            },
        };
        let snare = Skill {
            id: SkillId(5),
            name: "Snare".into(),
            mp_cost: 6,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                inflicts: Some(UnitStatus::Bound),
                ..Default::default()
            },
        };
        let seal = Skill {
            id: SkillId(6),
            name: "Seal".into(),
            mp_cost: 7,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                inflicts: Some(UnitStatus::Silenced),
                ..Default::default()
            },
        };
        let miasma = Skill {
            id: SkillId(7),
            name: "Miasma".into(),
            mp_cost: 9,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                power: 100,
                inflicts: Some(UnitStatus::Poisoned),
                ..Default::default()
            },
        };
        let sap = Skill {
            id: SkillId(8),
            name: "Sap".into(),
            mp_cost: 5,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                power: 50,
                destroy: 10,
                ..Default::default()
            },
        };
        let rally = Skill {
            id: SkillId(9),
            name: "Rally".into(),
            mp_cost: 10,
            range: SkillRange::Window5x5,
            effect: SkillEffect {
                heal: 300,
                ..Default::default()
            },
        };

        Self::new(vec![fire, flood, rockfall, confuse, snare, seal, miasma, sap, rally])
    }
}

/// Cells a skill reaches from `center`, clipped to the map, row-major
pub fn skill_range(map: &BattleMap, skill: &Skill, center: GridCoord) -> Vec<GridCoord> {
    let cells = match skill.range {
        SkillRange::Window5x5 => (-WINDOW_HALF..=WINDOW_HALF)
            .flat_map(|dy| (-WINDOW_HALF..=WINDOW_HALF).map(move |dx| (dx, dy)))
            .map(|(dx, dy)| GridCoord::new(center.x + dx, center.y + dy))
            .collect(),
        SkillRange::Disc(radius) => center.cells_in_range(radius),
    };
    cells.into_iter().filter(|pos| map.is_valid_position(*pos)).collect()
}
