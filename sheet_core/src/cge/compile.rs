//! Expansion of capability configurations into custom variable definitions

use super::{table_row, validate_cge_config, CgeConfig, KnownConfig, ResourceConfig};
use crate::changes::{
    CustomVariableDefinition, SourcedSpecialChange, SpecialChange, VariableBaseSource,
};
use crate::character::CharacterBaseData;
use crate::formula::Formula;
use crate::types::BonusType;

/// Level driving `config`; 0 means the configuration is inactive
///
/// Racial configurations (keyed to the character's race id) use the
/// character level, never less than 1.
pub fn config_class_level(config: &CgeConfig, base: &CharacterBaseData) -> u32 {
    let level = base.class_levels().get(&config.class_id).copied().unwrap_or(0);
    if level > 0 {
        return level;
    }
    match &base.race {
        Some(race) if race.id == config.class_id => base.character_level().max(1),
        _ => 0,
    }
}

fn definition(variable_id: String, name: String, formula: Formula) -> CustomVariableDefinition {
    CustomVariableDefinition {
        variable_id,
        name,
        description: String::new(),
        base_sources: vec![VariableBaseSource {
            name: "Class table".into(),
            formula,
            bonus_type: BonusType::Base,
        }],
    }
}

/// Variable definitions for every slot cell, known-limit cell and the caster level of one configuration
fn config_variables(config: &CgeConfig, level: u32) -> Vec<CustomVariableDefinition> {
    let mut definitions = Vec::new();

    let slot_table = config.tracks.iter().find_map(|track| match &track.resource {
        ResourceConfig::Slots { table, .. } => Some(table),
        _ => None,
    });
    if let Some(row) = slot_table.and_then(|table| table_row(table, level)) {
        for (entity_level, slots) in row.iter().enumerate() {
            definitions.push(definition(
                config.slot_max_var(entity_level),
                format!("{} level {} slots", config.entity_type, entity_level),
                Formula::constant(f64::from(*slots)),
            ));
        }
    }

    match &config.known {
        Some(KnownConfig::LimitedPerEntityLevel { table }) => {
            if let Some(row) = table_row(table, level) {
                for (entity_level, known) in row.iter().enumerate() {
                    definitions.push(definition(
                        config.known_max_var(entity_level),
                        format!("{} level {} known", config.entity_type, entity_level),
                        Formula::constant(f64::from(*known)),
                    ));
                }
            }
        }
        Some(KnownConfig::LimitedTotal { table, formula }) => {
            let from_table = table
                .as_ref()
                .and_then(|table| table_row(table, level))
                .and_then(|row| row.first())
                .map(|known| Formula::constant(f64::from(*known)));
            if let Some(formula) = from_table.or_else(|| formula.clone()) {
                definitions.push(definition(
                    config.known_total_var(),
                    format!("{} known", config.entity_type),
                    formula,
                ));
            }
        }
        Some(KnownConfig::Unlimited) | None => {}
    }

    definitions.push(definition(
        config.variables.caster_level_var.clone(),
        format!("{} level", config.class_id),
        Formula::constant(f64::from(level)),
    ));
    definitions
}

/// Custom variable definitions generated by every active, valid configuration in `special`
///
/// Invalid configurations are skipped here; the CGE stage reports them.
pub fn compile_cge_variables(
    base: &CharacterBaseData,
    special: &[SourcedSpecialChange],
) -> Vec<SourcedSpecialChange> {
    let mut generated = Vec::new();
    for sourced in special {
        let SpecialChange::CgeDefinition(config) = &sourced.special else {
            continue;
        };
        if validate_cge_config(config).is_err() {
            continue;
        }
        let level = config_class_level(config, base);
        if level == 0 {
            continue;
        }

        generated.extend(config_variables(config, level).into_iter().map(|definition| {
            SourcedSpecialChange {
                special: SpecialChange::CustomVariableDefinition(definition),
                name: sourced.name.clone(),
                origin_id: sourced.origin_id.clone(),
            }
        }));
    }
    tracing::debug!(count = generated.len(), "generated capability variables");
    generated
}
