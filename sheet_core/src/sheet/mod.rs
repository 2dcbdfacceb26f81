//! CharacterSheet - the calculation output

mod warning;

pub use warning::{record, Warning};

use crate::cge::CalculatedCge;
use crate::changes::SourceValueSum;
use crate::entity::ComputedEntity;
use crate::types::{Ability, OriginType, SaveKind, SizeCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeSheet {
    pub base: SizeCategory,
    pub category: SizeCategory,
    /// Numeric category, -4 (fine) to 4 (colossal)
    pub numeric: i32,
    pub modifier: i32,
    pub special_modifier: i32,
    pub breakdown: SourceValueSum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilitySheet {
    pub base_score: f64,
    pub score: SourceValueSum,
    pub modifier: f64,
    /// Ability check bonus on top of the modifier
    pub check: SourceValueSum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPointsSheet {
    pub max: SourceValueSum,
    pub current: f64,
    pub temporary: SourceValueSum,
    pub damage: f64,
    /// Hit points regained by a full rest
    pub rest_healing: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseAttackSheet {
    pub total: SourceValueSum,
    /// Attack bonus of each attack in a full attack
    pub iterative_attacks: Vec<i32>,
    pub melee: SourceValueSum,
    pub ranged: SourceValueSum,
    pub cmb: SourceValueSum,
    pub cmd: SourceValueSum,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmorClassSheet {
    pub total: SourceValueSum,
    pub touch: SourceValueSum,
    pub flat_footed: SourceValueSum,
    pub natural: SourceValueSum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSheet {
    pub name: String,
    pub ability: Ability,
    pub ranks: u32,
    pub class_skill: bool,
    /// False for trained-only skills without ranks
    pub usable: bool,
    pub total: SourceValueSum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVariableSheet {
    pub name: String,
    pub description: String,
    pub total: SourceValueSum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSheet {
    pub name: String,
    pub description: String,
    pub max: f64,
    pub min: f64,
    pub current: f64,
    pub default_charges_per_use: f64,
    pub recharge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialFeature {
    pub id: String,
    pub name: String,
    pub description: String,
    pub origin_type: OriginType,
}

/// Sheet fields produced by one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum SheetPatch {
    Size(SizeSheet),
    Abilities(BTreeMap<Ability, AbilitySheet>),
    Initiative(SourceValueSum),
    HitPoints(HitPointsSheet),
    BaseAttack(BaseAttackSheet),
    SavingThrows(BTreeMap<SaveKind, SourceValueSum>),
    ArmorClass(ArmorClassSheet),
    Skills(BTreeMap<String, SkillSheet>),
    CustomVariables(BTreeMap<String, CustomVariableSheet>),
    Cge(BTreeMap<String, CalculatedCge>),
    Resources(BTreeMap<String, ResourceSheet>),
}

/// Every derived statistic of one character, with its breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub level: u32,
    pub class_levels: BTreeMap<String, u32>,
    pub size: SizeSheet,
    pub abilities: BTreeMap<Ability, AbilitySheet>,
    pub initiative: SourceValueSum,
    pub hit_points: HitPointsSheet,
    pub base_attack: BaseAttackSheet,
    pub saving_throws: BTreeMap<SaveKind, SourceValueSum>,
    pub armor_class: ArmorClassSheet,
    pub skills: BTreeMap<String, SkillSheet>,
    pub custom_variables: BTreeMap<String, CustomVariableSheet>,
    pub cge: BTreeMap<String, CalculatedCge>,
    pub resources: BTreeMap<String, ResourceSheet>,
    pub computed_entities: Vec<ComputedEntity>,
    pub special_features: Vec<SpecialFeature>,
    /// Final variable store, for formula tooltips
    pub substitution_values: BTreeMap<String, f64>,
    pub warnings: Vec<Warning>,
}

impl CharacterSheet {
    pub fn new(name: impl Into<String>) -> Self {
        CharacterSheet {
            name: name.into(),
            ..CharacterSheet::default()
        }
    }

    /// Merge the fields one stage produced
    pub fn apply(&mut self, patch: SheetPatch) {
        match patch {
            SheetPatch::Size(size) => self.size = size,
            SheetPatch::Abilities(abilities) => self.abilities = abilities,
            SheetPatch::Initiative(initiative) => self.initiative = initiative,
            SheetPatch::HitPoints(hit_points) => self.hit_points = hit_points,
            SheetPatch::BaseAttack(base_attack) => self.base_attack = base_attack,
            SheetPatch::SavingThrows(saves) => self.saving_throws = saves,
            SheetPatch::ArmorClass(armor_class) => self.armor_class = armor_class,
            SheetPatch::Skills(skills) => self.skills = skills,
            SheetPatch::CustomVariables(variables) => self.custom_variables = variables,
            SheetPatch::Cge(cge) => self.cge = cge,
            SheetPatch::Resources(resources) => self.resources = resources,
        }
    }

    pub fn ability_score(&self, ability: Ability) -> f64 {
        self.abilities.get(&ability).map(|a| a.score.total).unwrap_or(0.0)
    }

    pub fn ability_modifier(&self, ability: Ability) -> f64 {
        self.abilities.get(&ability).map(|a| a.modifier).unwrap_or(0.0)
    }

    pub fn save_total(&self, save: SaveKind) -> f64 {
        self.saving_throws.get(&save).map(|s| s.total).unwrap_or(0.0)
    }

    pub fn custom_variable(&self, id: &str) -> Option<f64> {
        self.custom_variables.get(id).map(|v| v.total.total)
    }
}
