//! Calculation pipeline - ordered stages sharing one substitution index
//!
//! Stages run strictly in [`Stage::ORDER`]. Each stage reads the index built
//! by the stages before it and returns a [`StageOutput`]; the fold in
//! [`run_pipeline`] merges the output's entries into a new index before the
//! next stage runs.

mod abilities;
mod armor_class;
mod bab;
mod custom_variables;
mod hit_points;
mod index;
mod initiative;
pub(crate) mod resources;
mod saves;
mod size;
mod skills;

pub use index::{IndexEntries, Layered, SubstitutionIndex};

use crate::changes::{aggregate_sources, CharacterChanges, Source, SourceValueSum, SourcedSpecialChange};
use crate::character::CharacterBaseData;
use crate::config::{EngineConstants, SkillCatalogue};
use crate::formula::{DiceRoller, Formula, VariableLookup};
use crate::sheet::{record, CharacterSheet, SheetPatch, Warning};
use crate::types::{Ability, SaveKind};

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Size,
    Abilities,
    Initiative,
    HitPoints,
    BaseAttack,
    SavingThrows,
    ArmorClass,
    Skills,
    CustomVariables,
    Cge,
    Resources,
}

impl Stage {
    pub const ORDER: [Stage; 11] = [
        Stage::Size,
        Stage::Abilities,
        Stage::Initiative,
        Stage::HitPoints,
        Stage::BaseAttack,
        Stage::SavingThrows,
        Stage::ArmorClass,
        Stage::Skills,
        Stage::CustomVariables,
        Stage::Cge,
        Stage::Resources,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Size => "size",
            Stage::Abilities => "abilities",
            Stage::Initiative => "initiative",
            Stage::HitPoints => "hit_points",
            Stage::BaseAttack => "base_attack",
            Stage::SavingThrows => "saving_throws",
            Stage::ArmorClass => "armor_class",
            Stage::Skills => "skills",
            Stage::CustomVariables => "custom_variables",
            Stage::Cge => "cge",
            Stage::Resources => "resources",
        }
    }

    pub fn run(&self, ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
        match self {
            Stage::Size => size::calculate(ctx, index),
            Stage::Abilities => abilities::calculate(ctx, index),
            Stage::Initiative => initiative::calculate(ctx, index),
            Stage::HitPoints => hit_points::calculate(ctx, index),
            Stage::BaseAttack => bab::calculate(ctx, index),
            Stage::SavingThrows => saves::calculate(ctx, index),
            Stage::ArmorClass => armor_class::calculate(ctx, index),
            Stage::Skills => skills::calculate(ctx, index),
            Stage::CustomVariables => custom_variables::calculate(ctx, index),
            Stage::Cge => crate::cge::calculate_cge(ctx, index),
            Stage::Resources => resources::calculate(ctx, index),
        }
    }
}

/// What a stage hands back to the fold
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub patch: SheetPatch,
    pub entries: IndexEntries,
    pub warnings: Vec<Warning>,
}

/// Read-only inputs every stage sees
pub struct StageContext<'a> {
    pub base: &'a CharacterBaseData,
    pub changes: &'a CharacterChanges,
    pub special_changes: &'a [SourcedSpecialChange],
    pub constants: &'a EngineConstants,
    pub skills: &'a SkillCatalogue,
    pub roller: &'a dyn DiceRoller,
}

impl StageContext<'_> {
    /// Evaluate a formula, falling back to 0 with a warning on failure
    pub fn evaluate(
        &self,
        formula: &Formula,
        variables: &dyn VariableLookup,
        target: &str,
        source_name: &str,
        warnings: &mut Vec<Warning>,
    ) -> f64 {
        match formula.evaluate(variables, self.roller) {
            Ok(result) => result.value,
            Err(error) => {
                record(
                    warnings,
                    Warning::FormulaFallback {
                        target: target.to_string(),
                        source_name: source_name.to_string(),
                        formula: formula.source_text().to_string(),
                        error: error.to_string(),
                    },
                );
                0.0
            }
        }
    }

    /// Evaluated sources of every modification targeting `target` whose conditions hold
    pub fn sources_for(
        &self,
        target: &str,
        variables: &dyn VariableLookup,
        warnings: &mut Vec<Warning>,
    ) -> Vec<Source> {
        let mut sources = Vec::new();
        for sourced in self.changes.for_target(target) {
            let mut applies = true;
            for condition in &sourced.change.conditions {
                match condition.is_met(variables, self.roller) {
                    Ok(true) => {}
                    Ok(false) => applies = false,
                    Err(error) => {
                        record(
                            warnings,
                            Warning::FormulaFallback {
                                target: target.to_string(),
                                source_name: sourced.name.clone(),
                                formula: condition.first_formula.clone(),
                                error: error.to_string(),
                            },
                        );
                        applies = false;
                    }
                }
            }
            if !applies {
                continue;
            }

            let value = self.evaluate(&sourced.change.formula, variables, target, &sourced.name, warnings);
            sources.push(Source::new(
                value,
                sourced.name.clone(),
                sourced.change.bonus_type.clone(),
                sourced.origin_id.clone(),
            ));
        }
        sources
    }

    pub fn aggregate(&self, sources: Vec<Source>) -> SourceValueSum {
        aggregate_sources(sources, &self.constants.stacking)
    }

    pub fn ability_modifier(&self, index: &SubstitutionIndex, ability: Ability) -> f64 {
        index.get_or_zero(&ability.modifier_path())
    }
}

/// Values known before the first stage: levels, base tables and ability estimates
pub fn initial_entries(base: &CharacterBaseData, constants: &EngineConstants) -> IndexEntries {
    let mut entries = IndexEntries::new();
    let class_levels = base.class_levels();
    let level: u32 = class_levels.values().sum();

    entries.set("level", level as f64);
    entries.set("casterLevel", 0.0);
    entries.set("hd.base", level as f64);
    entries.set("size.base", base.base_size().numeric() as f64);

    let mut bab = 0;
    for (class_id, class_level) in &class_levels {
        entries.set(format!("class.{}.level", class_id), *class_level as f64);
        if let Some(class) = base.class(class_id) {
            bab += constants.progression.bab(class.bab, *class_level);
        }
    }
    entries.set("bab.base", bab as f64);

    for ability in Ability::all() {
        let score = base.ability(*ability);
        let estimate = (score.score - score.drain - score.damage - score.penalty).max(0.0);
        entries.set(format!("ability.{}.base", ability.key()), score.score);
        entries.set(ability.score_path(), estimate);
        entries.set(ability.modifier_path(), constants.abilities.modifier(estimate));
    }
    entries
}

/// Fold every stage over `index`, applying each stage's fields to `sheet`
pub fn run_pipeline(
    ctx: &StageContext<'_>,
    index: SubstitutionIndex,
    sheet: CharacterSheet,
) -> (CharacterSheet, SubstitutionIndex) {
    Stage::ORDER
        .iter()
        .fold((sheet, index), |(mut sheet, index), stage| {
            let output = stage.run(ctx, &index);
            tracing::debug!(
                stage = stage.name(),
                entries = output.entries.len(),
                warnings = output.warnings.len(),
                "stage complete"
            );
            sheet.apply(output.patch);
            sheet.warnings.extend(output.warnings);
            (sheet, index.merged(output.entries))
        })
}

/// Index path of a save total
pub(crate) fn save_path(save: SaveKind) -> String {
    format!("savingThrows.{}.total", save.key())
}
