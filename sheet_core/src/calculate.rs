//! Sheet calculation - the single entry point tying compilation and the pipeline together

use crate::cge::compile_cge_variables;
use crate::changes::CharacterChanges;
use crate::character::CharacterBaseData;
use crate::compendium::{validate_custom_entities, CompendiumContext};
use crate::config::{default_skills, ConfigError, EngineConstants, SkillCatalogue};
use crate::entity::compile_entities;
use crate::formula::{thread_roller, DiceRoller};
use crate::pipeline::{initial_entries, run_pipeline, StageContext, SubstitutionIndex};
use crate::sheet::{record, CharacterSheet, SpecialFeature, Warning};
use crate::source::character_sources;
use std::time::Instant;
use thiserror::Error;

/// Raised only when no meaningful sheet can be built
#[derive(Error, Debug)]
pub enum CalculationError {
    #[error("Invalid base data: {0}")]
    InvalidBaseData(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Optional inputs resolved by the caller before calculation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationContext {
    pub compendium: CompendiumContext,
}

impl CalculationContext {
    pub fn new(compendium: CompendiumContext) -> Self {
        CalculationContext { compendium }
    }
}

/// Rule tables and the dice roller used by one calculation
pub struct CalculationOptions {
    pub constants: EngineConstants,
    pub skills: SkillCatalogue,
    pub roller: Box<dyn DiceRoller>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        CalculationOptions {
            constants: EngineConstants::default(),
            skills: default_skills(),
            roller: Box::new(thread_roller()),
        }
    }
}

impl CalculationOptions {
    pub fn with_constants(mut self, constants: EngineConstants) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_skills(mut self, skills: SkillCatalogue) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_roller(mut self, roller: impl DiceRoller + 'static) -> Self {
        self.roller = Box::new(roller);
        self
    }
}

fn special_features(base: &CharacterBaseData) -> Vec<SpecialFeature> {
    character_sources(base)
        .into_iter()
        .filter(|source| source.is_special_feature())
        .map(|source| SpecialFeature {
            id: source.id().to_string(),
            name: source.name().to_string(),
            description: source.description().to_string(),
            origin_type: source.origin_type(),
        })
        .collect()
}

/// Compute the full character sheet for `base`
///
/// Only malformed base data is an error. Everything else that goes wrong
/// (missing packs, invalid entities, bad formulas, invalid capability
/// configurations) ends up in [`CharacterSheet::warnings`].
pub fn calculate_character_sheet(
    base: &CharacterBaseData,
    context: Option<&CalculationContext>,
    options: &CalculationOptions,
) -> Result<CharacterSheet, CalculationError> {
    let started = Instant::now();
    base.validate()?;
    options.constants.validate()?;

    let compendium = context.map(|c| &c.compendium);
    let validation = validate_custom_entities(&base.custom_entities, compendium);
    let compiled = compile_entities(base, &validation.valid_entities);

    let changes = CharacterChanges::from_sources(compiled.changes, &compiled.contextual_changes);
    let mut special_changes = compiled.special_changes;
    let generated = compile_cge_variables(base, &special_changes);
    special_changes.extend(generated);

    let mut warnings: Vec<Warning> = compendium.map(|c| c.warnings.clone()).unwrap_or_default();
    warnings.extend(validation.warnings);
    for class_id in base.unknown_level_classes() {
        record(&mut warnings, Warning::MissingProgression { class_id });
    }

    let ctx = StageContext {
        base,
        changes: &changes,
        special_changes: &special_changes,
        constants: &options.constants,
        skills: &options.skills,
        roller: options.roller.as_ref(),
    };
    let index = SubstitutionIndex::new().merged(initial_entries(base, &options.constants));
    let (mut sheet, index) = run_pipeline(&ctx, index, CharacterSheet::new(base.name.clone()));

    sheet.level = base.character_level();
    sheet.class_levels = base.class_levels();
    sheet.computed_entities = compiled.computed_entities;
    sheet.special_features = special_features(base);
    sheet.substitution_values = index.into_values();
    warnings.append(&mut sheet.warnings);
    sheet.warnings = warnings;

    tracing::info!(
        character = %sheet.name,
        level = sheet.level,
        warnings = sheet.warnings.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "calculated character sheet"
    );
    Ok(sheet)
}

/// [`calculate_character_sheet`] with default rules, the default skill list and real dice
pub fn calculate_with_defaults(
    base: &CharacterBaseData,
    context: Option<&CalculationContext>,
) -> Result<CharacterSheet, CalculationError> {
    calculate_character_sheet(base, context, &CalculationOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::fixtures::{fighter, with_levels};
    use crate::character::{AbilityScore, LevelEntry};
    use crate::source::{Feat, Race};
    use crate::types::{Ability, SizeCategory};

    fn options() -> CalculationOptions {
        CalculationOptions::default().with_roller(|_min: i64, max: i64| max)
    }

    #[test]
    fn test_invalid_base_data_is_an_error() {
        let mut base = CharacterBaseData::new("Broken");
        base.abilities.insert(Ability::Strength, AbilityScore::new(f64::NAN));
        let result = calculate_character_sheet(&base, None, &options());
        assert!(matches!(result, Err(CalculationError::InvalidBaseData(_))));
    }

    #[test]
    fn test_invalid_constants_are_an_error() {
        let mut constants = EngineConstants::default();
        constants.progression.iterative_attack_step = 0;
        let options = options().with_constants(constants);
        let result = calculate_character_sheet(&CharacterBaseData::new("Nobody"), None, &options);
        assert!(matches!(result, Err(CalculationError::Config(ConfigError::ValidationError(_)))));
    }

    #[test]
    fn test_oversized_hit_die_is_an_error() {
        let mut base = CharacterBaseData::new("Colossus");
        base.classes = vec![with_levels(
            crate::character::CharacterClass { hit_die: u32::MAX, ..fighter() },
            2,
        )];
        let result = calculate_with_defaults(&base, None);
        assert!(matches!(result, Err(CalculationError::InvalidBaseData(_))));
    }

    #[test]
    fn test_unknown_level_class_warns() {
        let mut base = CharacterBaseData::new("Lost");
        base.classes = vec![fighter()];
        base.level_history = vec![
            LevelEntry { class_id: "fighter".into(), hit_die_roll: None },
            LevelEntry { class_id: "mystic".into(), hit_die_roll: Some(4) },
        ];
        let sheet = calculate_character_sheet(&base, None, &options()).unwrap();

        assert_eq!(sheet.level, 1);
        assert!(sheet.warnings.iter().any(|w| matches!(
            w,
            Warning::MissingProgression { class_id } if class_id == "mystic"
        )));
    }

    #[test]
    fn test_sheet_metadata() {
        let mut base = CharacterBaseData::new("Harsk");
        base.classes = vec![with_levels(fighter(), 2)];
        base.race = Some(Race::new("dwarf", "Dwarf", SizeCategory::Medium));
        base.feats.push(Feat::new("toughness", "Toughness"));
        let sheet = calculate_character_sheet(&base, None, &options()).unwrap();

        assert_eq!(sheet.name, "Harsk");
        assert_eq!(sheet.class_levels.get("fighter"), Some(&2));
        let feature_ids: Vec<&str> = sheet.special_features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(feature_ids, vec!["dwarf", "toughness"]);
        assert_eq!(sheet.computed_entities.len(), 2);
        assert_eq!(sheet.substitution_values.get("level"), Some(&2.0));
        assert!(sheet.warnings.is_empty());
    }
}
