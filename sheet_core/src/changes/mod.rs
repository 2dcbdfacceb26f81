//! Modifications - typed bonuses and structural declarations contributed by entities

mod aggregator;
mod character_changes;

pub use aggregator::{aggregate_sources, Source, SourceValue, SourceValueSum};
pub use character_changes::CharacterChanges;

use crate::cge::CgeConfig;
use crate::formula::{Comparison, DiceRoller, Formula, FormulaError, VariableLookup};
use crate::types::{Ability, BonusType, OriginType, SaveTarget};
use serde::{Deserialize, Serialize};

/// What statistic a modification targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeKind {
    AbilityScore { ability: Ability },
    AbilityCheck { ability: Ability },
    ArmorClass,
    NaturalArmor,
    SavingThrow { save: SaveTarget },
    /// A single skill
    Skill { skill: String },
    /// Every skill keyed to an ability
    AbilitySkills { ability: Ability },
    Bab,
    Initiative,
    AttackRolls,
    HitPoints,
    TemporaryHp,
    Size,
    CustomVariable { variable: String },
}

impl ChangeKind {
    /// Grouping key: every modification with the same key feeds one statistic
    pub fn target_path(&self) -> String {
        match self {
            ChangeKind::AbilityScore { ability } => format!("ability.{}.score", ability.key()),
            ChangeKind::AbilityCheck { ability } => format!("ability.{}.check", ability.key()),
            ChangeKind::ArmorClass => "ac.total".to_string(),
            ChangeKind::NaturalArmor => "ac.natural".to_string(),
            ChangeKind::SavingThrow { save } => match save {
                SaveTarget::All => "savingThrows.all".to_string(),
                SaveTarget::Fortitude => "savingThrows.fortitude".to_string(),
                SaveTarget::Reflex => "savingThrows.reflex".to_string(),
                SaveTarget::Will => "savingThrows.will".to_string(),
            },
            ChangeKind::Skill { skill } => format!("skills.{}", skill),
            ChangeKind::AbilitySkills { ability } => format!("abilitySkills.{}", ability.key()),
            ChangeKind::Bab => "bab.total".to_string(),
            ChangeKind::Initiative => "initiative.total".to_string(),
            ChangeKind::AttackRolls => "attack.total".to_string(),
            ChangeKind::HitPoints => "hp.max".to_string(),
            ChangeKind::TemporaryHp => "hp.temporary".to_string(),
            ChangeKind::Size => "size.total".to_string(),
            ChangeKind::CustomVariable { variable } => format!("customVariable.{}", variable),
        }
    }
}

/// Applicability test: `first_formula <operator> second_formula`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub first_formula: String,
    #[serde(default)]
    pub operator: Comparison,
    pub second_formula: String,
}

impl Condition {
    pub fn is_met(
        &self,
        variables: &dyn VariableLookup,
        roller: &dyn DiceRoller,
    ) -> Result<bool, FormulaError> {
        let left = crate::formula::evaluate(&self.first_formula, variables, roller)?;
        let right = crate::formula::evaluate(&self.second_formula, variables, roller)?;
        Ok(self.operator.compare(left.value, right.value))
    }
}

/// A single bonus or penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub formula: Formula,
    #[serde(default)]
    pub bonus_type: BonusType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Change {
    pub fn new(kind: ChangeKind, formula: impl Into<Formula>, bonus_type: BonusType) -> Self {
        Change {
            kind,
            formula: formula.into(),
            bonus_type,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// A situational group of modifications with its own display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualChange {
    pub id: String,
    pub name: String,
    /// Toggled by the player; only enabled groups are evaluated
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub changes: Vec<Change>,
}

/// Base contribution to an explicitly declared custom variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBaseSource {
    pub name: String,
    pub formula: Formula,
    #[serde(default = "default_base_bonus")]
    pub bonus_type: BonusType,
}

fn default_base_bonus() -> BonusType {
    BonusType::Base
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVariableDefinition {
    pub variable_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub base_sources: Vec<VariableBaseSource>,
}

/// A consumable pool (rage rounds, ki points, charges)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    pub resource_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub max_value_formula: Formula,
    /// Defaults to 0
    #[serde(default)]
    pub min_value_formula: Option<Formula>,
    /// Defaults to 1
    #[serde(default)]
    pub default_charges_per_use_formula: Option<Formula>,
    /// Defaults to the max value
    #[serde(default)]
    pub recharge_formula: Option<Formula>,
    #[serde(default)]
    pub initial_value_formula: Option<Formula>,
}

/// Structural contribution that configures later pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecialChange {
    CustomVariableDefinition(CustomVariableDefinition),
    ResourceDefinition(ResourceDefinition),
    CgeDefinition(CgeConfig),
}

/// A modification tagged with the entity that declared it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedChange {
    pub change: Change,
    pub name: String,
    pub origin_id: String,
    pub origin_type: OriginType,
}

impl SourcedChange {
    pub fn target_path(&self) -> String {
        self.change.kind.target_path()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedContextualChange {
    pub contextual: ContextualChange,
    pub origin_id: String,
    pub origin_type: OriginType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedSpecialChange {
    pub special: SpecialChange,
    pub name: String,
    pub origin_id: String,
}
