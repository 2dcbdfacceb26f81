//! Engine constants configuration

use super::ConfigError;
use crate::types::{BabProgression, BonusType, SaveProgression};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable rule constants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConstants {
    #[serde(default)]
    pub stacking: StackingConstants,
    #[serde(default)]
    pub progression: ProgressionConstants,
    #[serde(default)]
    pub abilities: AbilityConstants,
    #[serde(default)]
    pub armor_class: ArmorClassConstants,
    #[serde(default)]
    pub skills: SkillConstants,
}

impl EngineConstants {
    /// Load constants from a TOML file and validate them
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let constants: EngineConstants = super::load_toml(path)?;
        constants.validate()?;
        Ok(constants)
    }

    /// Parse constants from a TOML string and validate them
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let constants: EngineConstants = super::parse_toml(content)?;
        constants.validate()?;
        Ok(constants)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progression.good_saves.is_empty() || self.progression.poor_saves.is_empty() {
            return Err(ConfigError::ValidationError(
                "save progression tables must not be empty".to_string(),
            ));
        }
        if self.progression.iterative_attack_step <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "iterative_attack_step must be positive, got {}",
                self.progression.iterative_attack_step
            )));
        }
        if self.progression.max_iterative_attacks == 0 {
            return Err(ConfigError::ValidationError(
                "max_iterative_attacks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which source stays relevant when two non-stacking bonuses tie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    #[default]
    FirstEncountered,
    LastEncountered,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackingConstants {
    #[serde(default)]
    pub tie_policy: TiePolicy,
    /// Bonus types that stack with themselves in addition to the built-in ones
    #[serde(default)]
    pub extra_stacking_types: Vec<BonusType>,
}

impl StackingConstants {
    pub fn stacks(&self, bonus_type: &BonusType) -> bool {
        bonus_type.stacks_with_self() || self.extra_stacking_types.contains(bonus_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConstants {
    /// Good save bonus by class level (index 0 = level 1)
    #[serde(default = "default_good_saves")]
    pub good_saves: Vec<i32>,
    /// Poor save bonus by class level (index 0 = level 1)
    #[serde(default = "default_poor_saves")]
    pub poor_saves: Vec<i32>,
    /// Penalty step between iterative attacks
    #[serde(default = "default_iterative_attack_step")]
    pub iterative_attack_step: i32,
    #[serde(default = "default_max_iterative_attacks")]
    pub max_iterative_attacks: usize,
}

impl Default for ProgressionConstants {
    fn default() -> Self {
        ProgressionConstants {
            good_saves: default_good_saves(),
            poor_saves: default_poor_saves(),
            iterative_attack_step: default_iterative_attack_step(),
            max_iterative_attacks: default_max_iterative_attacks(),
        }
    }
}

impl ProgressionConstants {
    /// Base attack bonus granted by `level` levels of a class
    pub fn bab(&self, progression: BabProgression, level: u32) -> i32 {
        let level = signed_level(level);
        match progression {
            BabProgression::Good => level,
            BabProgression::Average => level / 4 * 3 + (level % 4) * 3 / 4,
            BabProgression::Poor => level / 2,
        }
    }

    /// Save bonus granted by `level` levels of a class
    ///
    /// Levels past the end of a table continue the standard progression.
    pub fn save(&self, progression: SaveProgression, level: u32) -> i32 {
        if level == 0 {
            return 0;
        }
        let (table, fallback) = match progression {
            SaveProgression::Good => (&self.good_saves, 2 + signed_level(level) / 2),
            SaveProgression::Poor => (&self.poor_saves, signed_level(level) / 3),
        };
        table.get(level as usize - 1).copied().unwrap_or(fallback)
    }
}

fn signed_level(level: u32) -> i32 {
    i32::try_from(level).unwrap_or(i32::MAX)
}

fn default_good_saves() -> Vec<i32> {
    vec![2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12]
}
fn default_poor_saves() -> Vec<i32> {
    vec![0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 5, 6, 6, 6]
}
fn default_iterative_attack_step() -> i32 {
    5
}
fn default_max_iterative_attacks() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityConstants {
    /// Score at which the modifier is zero
    #[serde(default = "default_ability_base")]
    pub base: i32,
}

impl Default for AbilityConstants {
    fn default() -> Self {
        AbilityConstants {
            base: default_ability_base(),
        }
    }
}

impl AbilityConstants {
    /// floor((score - base) / 2)
    pub fn modifier(&self, score: f64) -> f64 {
        ((score - self.base as f64) / 2.0).floor()
    }
}

fn default_ability_base() -> i32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmorClassConstants {
    #[serde(default = "default_ac_base")]
    pub base: i32,
}

impl Default for ArmorClassConstants {
    fn default() -> Self {
        ArmorClassConstants {
            base: default_ac_base(),
        }
    }
}

fn default_ac_base() -> i32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConstants {
    /// Bonus for a class skill with at least one rank
    #[serde(default = "default_class_skill_bonus")]
    pub class_skill_bonus: i32,
}

impl Default for SkillConstants {
    fn default() -> Self {
        SkillConstants {
            class_skill_bonus: default_class_skill_bonus(),
        }
    }
}

fn default_class_skill_bonus() -> i32 {
    3
}
