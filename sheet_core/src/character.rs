//! CharacterBaseData - the raw build a sheet is calculated from

use crate::calculate::CalculationError;
use crate::cge::CgeState;
use crate::entity::{Entity, EntityInstance};
use crate::source::{Buff, ClassFeature, Feat, Item, Race};
use crate::types::{Ability, BabProgression, SaveKind, SaveProgression, SizeCategory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Base ability score with its temporary reductions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityScore {
    pub score: f64,
    #[serde(default)]
    pub drain: f64,
    #[serde(default)]
    pub damage: f64,
    #[serde(default)]
    pub penalty: f64,
}

impl AbilityScore {
    pub fn new(score: f64) -> Self {
        AbilityScore {
            score,
            drain: 0.0,
            damage: 0.0,
            penalty: 0.0,
        }
    }
}

impl Default for AbilityScore {
    fn default() -> Self {
        AbilityScore::new(10.0)
    }
}

/// A class the character has taken levels in, with its progressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterClass {
    pub id: String,
    pub name: String,
    /// Levels taken; ignored when a level history is present
    #[serde(default)]
    pub level: u32,
    pub hit_die: u32,
    pub bab: BabProgression,
    pub fortitude: SaveProgression,
    pub reflex: SaveProgression,
    pub will: SaveProgression,
    #[serde(default)]
    pub class_skills: Vec<String>,
}

impl CharacterClass {
    pub fn save_progression(&self, save: SaveKind) -> SaveProgression {
        match save {
            SaveKind::Fortitude => self.fortitude,
            SaveKind::Reflex => self.reflex,
            SaveKind::Will => self.will,
        }
    }
}

/// One character level, in the order it was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEntry {
    pub class_id: String,
    /// Rolled hit points; unrolled levels take the average
    #[serde(default)]
    pub hit_die_roll: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillRanks {
    #[serde(default)]
    pub ranks: u32,
    /// Cross-class half ranks; two count as one rank
    #[serde(default)]
    pub half_ranks: u32,
}

impl SkillRanks {
    pub fn effective(&self) -> u32 {
        self.ranks + self.half_ranks / 2
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterBaseData {
    pub name: String,
    #[serde(default)]
    pub abilities: BTreeMap<Ability, AbilityScore>,
    #[serde(default)]
    pub classes: Vec<CharacterClass>,
    #[serde(default)]
    pub level_history: Vec<LevelEntry>,
    #[serde(default)]
    pub race: Option<Race>,
    /// Overrides the racial size
    #[serde(default)]
    pub size: Option<SizeCategory>,
    #[serde(default)]
    pub feats: Vec<Feat>,
    #[serde(default)]
    pub buffs: Vec<Buff>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub class_features: Vec<ClassFeature>,
    #[serde(default)]
    pub skill_ranks: BTreeMap<String, SkillRanks>,
    #[serde(default)]
    pub current_damage: f64,
    /// Explicit current hit points, taking precedence over `current_damage`
    #[serde(default)]
    pub custom_current_hp: Option<f64>,
    #[serde(default)]
    pub temporary_hp: f64,
    /// Persisted current values of simple resources
    #[serde(default)]
    pub resource_current_values: BTreeMap<String, f64>,
    #[serde(default)]
    pub cge_state: BTreeMap<String, CgeState>,
    #[serde(default)]
    pub active_compendiums: Vec<String>,
    /// Ad-hoc entities keyed by entity type
    #[serde(default)]
    pub custom_entities: BTreeMap<String, Vec<Entity>>,
    /// Per-level entity instances keyed by entity type
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<EntityInstance>>,
}

/// Largest hit die a class may declare
pub const MAX_HIT_DIE: u32 = 1000;
/// Largest total character level accepted by [`CharacterBaseData::validate`]
pub const MAX_CHARACTER_LEVEL: u32 = 1000;

impl CharacterBaseData {
    pub fn new(name: impl Into<String>) -> Self {
        CharacterBaseData {
            name: name.into(),
            ..CharacterBaseData::default()
        }
    }

    pub fn ability(&self, ability: Ability) -> AbilityScore {
        self.abilities.get(&ability).copied().unwrap_or_default()
    }

    pub fn class(&self, class_id: &str) -> Option<&CharacterClass> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    /// Levels in order taken; without a history, classes are expanded in declaration order
    pub fn level_entries(&self) -> Vec<LevelEntry> {
        if !self.level_history.is_empty() {
            return self.level_history.clone();
        }
        self.classes
            .iter()
            .flat_map(|class| {
                (0..class.level).map(move |_| LevelEntry {
                    class_id: class.id.clone(),
                    hit_die_roll: None,
                })
            })
            .collect()
    }

    /// Levels per known class; levels in unknown classes are not counted
    pub fn class_levels(&self) -> BTreeMap<String, u32> {
        let mut levels = BTreeMap::new();
        for entry in self.level_entries() {
            if self.class(&entry.class_id).is_some() {
                *levels.entry(entry.class_id).or_insert(0) += 1;
            }
        }
        levels
    }

    pub fn character_level(&self) -> u32 {
        self.class_levels().values().sum()
    }

    /// Class ids referenced by levels but with no class definition
    pub fn unknown_level_classes(&self) -> Vec<String> {
        let unknown: BTreeSet<String> = self
            .level_entries()
            .into_iter()
            .filter(|entry| self.class(&entry.class_id).is_none())
            .map(|entry| entry.class_id)
            .collect();
        unknown.into_iter().collect()
    }

    /// Size before size modifications: explicit, then racial, then medium
    pub fn base_size(&self) -> SizeCategory {
        self.size
            .or_else(|| self.race.as_ref().map(|r| r.size))
            .unwrap_or_default()
    }

    pub fn is_class_skill(&self, skill_id: &str) -> bool {
        let levels = self.class_levels();
        self.classes
            .iter()
            .filter(|c| levels.contains_key(&c.id))
            .any(|c| c.class_skills.iter().any(|s| s == skill_id))
    }

    /// Reject data no sheet can be built from
    pub fn validate(&self) -> Result<(), CalculationError> {
        for (ability, value) in &self.abilities {
            let parts = [value.score, value.drain, value.damage, value.penalty];
            if parts.iter().any(|v| !v.is_finite()) {
                return Err(CalculationError::InvalidBaseData(format!(
                    "{} has a non-finite value",
                    ability.display_name()
                )));
            }
            if value.score < 0.0 {
                return Err(CalculationError::InvalidBaseData(format!(
                    "{} score is negative ({})",
                    ability.display_name(),
                    value.score
                )));
            }
        }

        let mut seen = BTreeSet::new();
        for class in &self.classes {
            if !seen.insert(class.id.as_str()) {
                return Err(CalculationError::InvalidBaseData(format!(
                    "class '{}' is declared twice",
                    class.id
                )));
            }
            if class.hit_die == 0 || class.hit_die > MAX_HIT_DIE {
                return Err(CalculationError::InvalidBaseData(format!(
                    "class '{}' has hit die d{}, expected d1 to d{}",
                    class.id, class.hit_die, MAX_HIT_DIE
                )));
            }
            if class.level > MAX_CHARACTER_LEVEL {
                return Err(CalculationError::InvalidBaseData(format!(
                    "class '{}' has {} levels, at most {} are supported",
                    class.id, class.level, MAX_CHARACTER_LEVEL
                )));
            }
        }

        let total_levels = if self.level_history.is_empty() {
            self.classes.iter().map(|c| u64::from(c.level)).sum()
        } else {
            self.level_history.len() as u64
        };
        if total_levels > u64::from(MAX_CHARACTER_LEVEL) {
            return Err(CalculationError::InvalidBaseData(format!(
                "character has {} levels, at most {} are supported",
                total_levels, MAX_CHARACTER_LEVEL
            )));
        }

        if let Some(entry) = self.level_history.iter().find(|e| e.class_id.is_empty()) {
            return Err(CalculationError::InvalidBaseData(format!(
                "level entry without class (roll {:?})",
                entry.hit_die_roll
            )));
        }

        let numbers = [self.current_damage, self.temporary_hp];
        if numbers.iter().any(|v| !v.is_finite()) {
            return Err(CalculationError::InvalidBaseData(
                "hit point values must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn fighter() -> CharacterClass {
        CharacterClass {
            id: "fighter".into(),
            name: "Fighter".into(),
            level: 0,
            hit_die: 10,
            bab: BabProgression::Good,
            fortitude: SaveProgression::Good,
            reflex: SaveProgression::Poor,
            will: SaveProgression::Poor,
            class_skills: vec!["climb".into(), "intimidate".into(), "swim".into()],
        }
    }

    pub fn wizard() -> CharacterClass {
        CharacterClass {
            id: "wizard".into(),
            name: "Wizard".into(),
            level: 0,
            hit_die: 6,
            bab: BabProgression::Poor,
            fortitude: SaveProgression::Poor,
            reflex: SaveProgression::Poor,
            will: SaveProgression::Good,
            class_skills: vec!["spellcraft".into(), "knowledge_arcana".into()],
        }
    }

    pub fn with_levels(mut class: CharacterClass, level: u32) -> CharacterClass {
        class.level = level;
        class
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_class_levels_from_classes() {
        let mut base = CharacterBaseData::new("Valeros");
        base.classes = vec![with_levels(fighter(), 3), with_levels(wizard(), 2)];
        assert_eq!(base.character_level(), 5);
        assert_eq!(base.class_levels().get("wizard"), Some(&2));
        assert_eq!(base.level_entries()[0].class_id, "fighter");
    }

    #[test]
    fn test_level_history_takes_precedence() {
        let mut base = CharacterBaseData::new("Ezren");
        base.classes = vec![with_levels(wizard(), 9)];
        base.level_history = vec![
            LevelEntry { class_id: "wizard".into(), hit_die_roll: Some(6) },
            LevelEntry { class_id: "wizard".into(), hit_die_roll: Some(3) },
            LevelEntry { class_id: "alchemist".into(), hit_die_roll: None },
        ];
        assert_eq!(base.character_level(), 2);
        assert_eq!(base.unknown_level_classes(), vec!["alchemist".to_string()]);
    }

    #[test]
    fn test_missing_ability_defaults_to_ten() {
        let base = CharacterBaseData::new("Blank");
        assert!((base.ability(Ability::Wisdom).score - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_malformed_data() {
        let mut base = CharacterBaseData::new("Broken");
        base.abilities.insert(Ability::Strength, AbilityScore::new(f64::NAN));
        assert!(matches!(base.validate(), Err(CalculationError::InvalidBaseData(_))));

        let mut base = CharacterBaseData::new("Twice");
        base.classes = vec![fighter(), fighter()];
        assert!(base.validate().is_err());

        let mut base = CharacterBaseData::new("Negative");
        base.abilities.insert(Ability::Strength, AbilityScore::new(-2.0));
        assert!(base.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_hit_die_and_levels() {
        let mut base = CharacterBaseData::new("Giant");
        base.classes = vec![with_levels(
            CharacterClass { hit_die: u32::MAX, ..fighter() },
            2,
        )];
        assert!(matches!(base.validate(), Err(CalculationError::InvalidBaseData(_))));

        let mut base = CharacterBaseData::new("Ancient");
        base.classes = vec![with_levels(fighter(), MAX_CHARACTER_LEVEL + 1)];
        assert!(matches!(base.validate(), Err(CalculationError::InvalidBaseData(_))));

        let mut base = CharacterBaseData::new("Split");
        base.classes = vec![
            with_levels(fighter(), MAX_CHARACTER_LEVEL),
            with_levels(CharacterClass { id: "rogue".into(), ..fighter() }, 1),
        ];
        assert!(base.validate().is_err());

        let mut base = CharacterBaseData::new("Capped");
        base.classes = vec![with_levels(CharacterClass { hit_die: MAX_HIT_DIE, ..fighter() }, 20)];
        assert!(base.validate().is_ok());
    }

    #[test]
    fn test_half_ranks() {
        let ranks = SkillRanks { ranks: 2, half_ranks: 3 };
        assert_eq!(ranks.effective(), 3);
    }

    #[test]
    fn test_deserialize_abilities_map() {
        let json = r#"{
            "name": "Seoni",
            "abilities": {"charisma": {"score": 18}, "dexterity": {"score": 14, "damage": 2}}
        }"#;
        let base: CharacterBaseData = serde_json::from_str(json).unwrap();
        assert!((base.ability(Ability::Dexterity).damage - 2.0).abs() < f64::EPSILON);
        assert_eq!(base.base_size(), SizeCategory::Medium);
    }
}
