//! Core types shared across the calculation engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    /// Get all abilities in sheet order
    pub fn all() -> &'static [Ability] {
        &[
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Key used in substitution index paths (`ability.<key>.modifier`)
    pub fn key(&self) -> &'static str {
        match self {
            Ability::Strength => "strength",
            Ability::Dexterity => "dexterity",
            Ability::Constitution => "constitution",
            Ability::Intelligence => "intelligence",
            Ability::Wisdom => "wisdom",
            Ability::Charisma => "charisma",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn score_path(&self) -> String {
        format!("ability.{}.score", self.key())
    }

    pub fn modifier_path(&self) -> String {
        format!("ability.{}.modifier", self.key())
    }
}

/// The three saving throw categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveKind {
    Fortitude,
    Reflex,
    Will,
}

impl SaveKind {
    pub fn all() -> &'static [SaveKind] {
        &[SaveKind::Fortitude, SaveKind::Reflex, SaveKind::Will]
    }

    pub fn key(&self) -> &'static str {
        match self {
            SaveKind::Fortitude => "fortitude",
            SaveKind::Reflex => "reflex",
            SaveKind::Will => "will",
        }
    }

    /// Ability whose modifier is added to this save
    pub fn ability(&self) -> Ability {
        match self {
            SaveKind::Fortitude => Ability::Constitution,
            SaveKind::Reflex => Ability::Dexterity,
            SaveKind::Will => Ability::Wisdom,
        }
    }
}

/// Target of a saving throw modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveTarget {
    Fortitude,
    Reflex,
    Will,
    /// Applies to all three saves
    All,
}

impl SaveTarget {
    pub fn applies_to(&self, save: SaveKind) -> bool {
        match self {
            SaveTarget::All => true,
            SaveTarget::Fortitude => save == SaveKind::Fortitude,
            SaveTarget::Reflex => save == SaveKind::Reflex,
            SaveTarget::Will => save == SaveKind::Will,
        }
    }
}

/// Creature size category, ordered from smallest to largest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Fine,
    Diminutive,
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
    Gargantuan,
    Colossal,
}

impl Default for SizeCategory {
    fn default() -> Self {
        SizeCategory::Medium
    }
}

impl SizeCategory {
    pub const MIN_NUMERIC: i32 = -4;
    pub const MAX_NUMERIC: i32 = 4;

    pub fn all() -> &'static [SizeCategory] {
        &[
            SizeCategory::Fine,
            SizeCategory::Diminutive,
            SizeCategory::Tiny,
            SizeCategory::Small,
            SizeCategory::Medium,
            SizeCategory::Large,
            SizeCategory::Huge,
            SizeCategory::Gargantuan,
            SizeCategory::Colossal,
        ]
    }

    /// Numeric step relative to Medium (Fine = -4, Colossal = +4)
    pub fn numeric(&self) -> i32 {
        match self {
            SizeCategory::Fine => -4,
            SizeCategory::Diminutive => -3,
            SizeCategory::Tiny => -2,
            SizeCategory::Small => -1,
            SizeCategory::Medium => 0,
            SizeCategory::Large => 1,
            SizeCategory::Huge => 2,
            SizeCategory::Gargantuan => 3,
            SizeCategory::Colossal => 4,
        }
    }

    /// Category for a numeric step, clamped to Fine..Colossal
    pub fn from_numeric(value: i32) -> Self {
        let clamped = value.clamp(Self::MIN_NUMERIC, Self::MAX_NUMERIC);
        let index = (clamped - Self::MIN_NUMERIC) as usize;
        Self::all()[index]
    }

    /// Size modifier applied to attack rolls and AC
    pub fn modifier(&self) -> i32 {
        match self {
            SizeCategory::Fine => 8,
            SizeCategory::Diminutive => 4,
            SizeCategory::Tiny => 2,
            SizeCategory::Small => 1,
            SizeCategory::Medium => 0,
            SizeCategory::Large => -1,
            SizeCategory::Huge => -2,
            SizeCategory::Gargantuan => -4,
            SizeCategory::Colossal => -8,
        }
    }

    /// Special size modifier used by combat maneuvers
    pub fn special_modifier(&self) -> i32 {
        self.numeric() * 4
    }
}

/// Class progression rate for base attack bonus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BabProgression {
    Good,
    Average,
    Poor,
}

/// Class progression rate for a saving throw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveProgression {
    Good,
    Poor,
}

/// Category label that decides how same-typed bonuses combine
///
/// Serialized as a plain string id; unknown ids become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BonusType {
    Base,
    Replacement,
    Untyped,
    Enhancement,
    Morale,
    Luck,
    Insight,
    Competence,
    Profane,
    Divine,
    Sacred,
    Resistance,
    Circumstance,
    Status,
    Dodge,
    Deflection,
    Misc,
    Size,
    Racial,
    // === Armor class specific ===
    Armor,
    Shield,
    NaturalArmor,
    Dexterity,
    Custom(String),
}

impl Default for BonusType {
    fn default() -> Self {
        BonusType::Untyped
    }
}

impl BonusType {
    /// Stable id used for grouping and serialization
    pub fn id(&self) -> &str {
        match self {
            BonusType::Base => "base",
            BonusType::Replacement => "replacement",
            BonusType::Untyped => "untyped",
            BonusType::Enhancement => "enhancement",
            BonusType::Morale => "morale",
            BonusType::Luck => "luck",
            BonusType::Insight => "insight",
            BonusType::Competence => "competence",
            BonusType::Profane => "profane",
            BonusType::Divine => "divine",
            BonusType::Sacred => "sacred",
            BonusType::Resistance => "resistance",
            BonusType::Circumstance => "circumstance",
            BonusType::Status => "status",
            BonusType::Dodge => "dodge",
            BonusType::Deflection => "deflection",
            BonusType::Misc => "misc",
            BonusType::Size => "size",
            BonusType::Racial => "racial",
            BonusType::Armor => "armor",
            BonusType::Shield => "shield",
            BonusType::NaturalArmor => "natural_armor",
            BonusType::Dexterity => "dexterity",
            BonusType::Custom(id) => id,
        }
    }

    /// Whether multiple bonuses of this type add together by default
    pub fn stacks_with_self(&self) -> bool {
        matches!(
            self,
            BonusType::Base
                | BonusType::Replacement
                | BonusType::Untyped
                | BonusType::Circumstance
                | BonusType::Dodge
                | BonusType::Dexterity
        )
    }
}

impl From<String> for BonusType {
    fn from(raw: String) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "base" => BonusType::Base,
            "replacement" => BonusType::Replacement,
            "untyped" | "" => BonusType::Untyped,
            "enhancement" => BonusType::Enhancement,
            "morale" => BonusType::Morale,
            "luck" => BonusType::Luck,
            "insight" => BonusType::Insight,
            "competence" => BonusType::Competence,
            "profane" => BonusType::Profane,
            "divine" => BonusType::Divine,
            "sacred" => BonusType::Sacred,
            "resistance" => BonusType::Resistance,
            // older content packs carry the misspelled id
            "circumstance" | "circumnstance" => BonusType::Circumstance,
            "status" => BonusType::Status,
            "dodge" => BonusType::Dodge,
            "deflection" => BonusType::Deflection,
            "misc" => BonusType::Misc,
            "size" => BonusType::Size,
            "racial" => BonusType::Racial,
            "armor" => BonusType::Armor,
            "shield" => BonusType::Shield,
            "natural_armor" => BonusType::NaturalArmor,
            "dexterity" => BonusType::Dexterity,
            _ => BonusType::Custom(normalized),
        }
    }
}

impl From<&str> for BonusType {
    fn from(raw: &str) -> Self {
        BonusType::from(raw.to_string())
    }
}

impl From<BonusType> for String {
    fn from(bonus_type: BonusType) -> Self {
        bonus_type.id().to_string()
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Origin of a compiled entity, derived from its entity-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    Feat,
    Item,
    Buff,
    ClassFeature,
    Race,
    Spell,
    /// Fallback for any other entity type
    Entity,
    /// Values the engine itself contributes (base scores, tables)
    Base,
}

impl OriginType {
    /// Map an entity-type tag to its origin; unknown tags fall back to `Entity`
    pub fn from_entity_type(entity_type: &str) -> Self {
        match entity_type {
            "feat" => OriginType::Feat,
            "item" => OriginType::Item,
            "buff" => OriginType::Buff,
            "classFeature" | "class_feature" => OriginType::ClassFeature,
            "race" => OriginType::Race,
            "spell" => OriginType::Spell,
            _ => OriginType::Entity,
        }
    }

    /// Entity-type tag for entities synthesized from this origin
    pub fn entity_type(&self) -> &'static str {
        match self {
            OriginType::Feat => "feat",
            OriginType::Item => "item",
            OriginType::Buff => "buff",
            OriginType::ClassFeature => "class_feature",
            OriginType::Race => "race",
            OriginType::Spell => "spell",
            OriginType::Entity => "entity",
            OriginType::Base => "base",
        }
    }
}
