//! Simple resources stage - consumable pools republished as variables

use super::{IndexEntries, Layered, StageContext, StageOutput, SubstitutionIndex};
use crate::cge::{config_class_level, validate_cge_config};
use crate::changes::{ResourceDefinition, Source, SpecialChange};
use crate::formula::Formula;
use crate::sheet::{ResourceSheet, SheetPatch, Warning};
use std::collections::BTreeMap;

/// Property names as they appear in `resources.<id>.<property>`
const PROPERTIES: [&str; 5] = ["max", "min", "current", "defaultChargesPerUse", "recharge"];

fn property_path(resource_id: &str, property: &str) -> String {
    format!("resources.{}.{}", resource_id, property)
}

/// Base value from `formula` (or `default`) plus modifications to the property
fn property_total(
    ctx: &StageContext<'_>,
    lookup: &Layered<'_>,
    definition: &ResourceDefinition,
    property: &str,
    formula: Option<&Formula>,
    default: f64,
    warnings: &mut Vec<Warning>,
) -> f64 {
    let target = format!("customVariable.{}", property_path(&definition.resource_id, property));
    let base = match formula {
        Some(formula) => ctx.evaluate(formula, lookup, &target, &definition.name, warnings),
        None => default,
    };
    let mut sources = vec![Source::base(base, definition.name.clone())];
    sources.extend(ctx.sources_for(&target, lookup, warnings));
    ctx.aggregate(sources).total
}

/// Evaluate one resource; `persisted` is the player's stored current value
pub(crate) fn evaluate_resource(
    ctx: &StageContext<'_>,
    index: &SubstitutionIndex,
    definition: &ResourceDefinition,
    persisted: Option<f64>,
    warnings: &mut Vec<Warning>,
) -> ResourceSheet {
    let id = &definition.resource_id;
    let mut local = IndexEntries::new();

    let max = {
        let lookup = Layered { index, entries: &local };
        property_total(ctx, &lookup, definition, "max", Some(&definition.max_value_formula), 0.0, warnings)
    };
    local.set(property_path(id, "max"), max);

    let lookup = Layered { index, entries: &local };
    let min = property_total(
        ctx,
        &lookup,
        definition,
        "min",
        definition.min_value_formula.as_ref(),
        0.0,
        warnings,
    );
    let default_charges_per_use = property_total(
        ctx,
        &lookup,
        definition,
        "defaultChargesPerUse",
        definition.default_charges_per_use_formula.as_ref(),
        1.0,
        warnings,
    );
    let recharge = property_total(
        ctx,
        &lookup,
        definition,
        "recharge",
        definition.recharge_formula.as_ref(),
        max,
        warnings,
    );

    let current = match persisted {
        Some(value) => value.max(min).min(max),
        None => match &definition.initial_value_formula {
            Some(formula) => ctx.evaluate(formula, &lookup, &property_path(id, "current"), &definition.name, warnings),
            None => max,
        },
    };

    ResourceSheet {
        name: definition.name.clone(),
        description: definition.description.clone(),
        max,
        min,
        current,
        default_charges_per_use,
        recharge,
    }
}

/// Declared resources plus those of every active capability configuration, last declaration wins
fn collect_definitions<'a>(ctx: &StageContext<'a>) -> BTreeMap<String, &'a ResourceDefinition> {
    let mut definitions = BTreeMap::new();
    for sourced in ctx.special_changes {
        match &sourced.special {
            SpecialChange::ResourceDefinition(definition) => {
                definitions.insert(definition.resource_id.clone(), definition);
            }
            SpecialChange::CgeDefinition(config) => {
                if validate_cge_config(config).is_err() || config_class_level(config, ctx.base) == 0 {
                    continue;
                }
                for definition in &config.resources {
                    definitions.insert(definition.resource_id.clone(), definition);
                }
            }
            SpecialChange::CustomVariableDefinition(_) => {}
        }
    }
    definitions
}

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let mut entries = IndexEntries::new();
    let mut resources = BTreeMap::new();

    for (id, definition) in collect_definitions(ctx) {
        let persisted = ctx.base.resource_current_values.get(&id).copied();
        let sheet = evaluate_resource(ctx, index, definition, persisted, &mut warnings);

        let values = [
            sheet.max,
            sheet.min,
            sheet.current,
            sheet.default_charges_per_use,
            sheet.recharge,
        ];
        for (property, value) in PROPERTIES.iter().zip(values) {
            let path = property_path(&id, property);
            entries.set(format!("customVariable.{}", path), value);
            entries.set(path, value);
        }
        resources.insert(id, sheet);
    }

    StageOutput {
        patch: SheetPatch::Resources(resources),
        entries,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Stage;
    use crate::changes::{Change, ChangeKind, ResourceDefinition, SourcedSpecialChange, SpecialChange};
    use crate::character::fixtures::{fighter, with_levels};
    use crate::character::{AbilityScore, CharacterBaseData};
    use crate::types::{Ability, BonusType};

    fn rage(max: &str) -> ResourceDefinition {
        ResourceDefinition {
            resource_id: "rage".into(),
            name: "Rage Rounds".into(),
            description: String::new(),
            max_value_formula: max.into(),
            min_value_formula: None,
            default_charges_per_use_formula: None,
            recharge_formula: None,
            initial_value_formula: None,
        }
    }

    fn declared(definition: ResourceDefinition) -> SourcedSpecialChange {
        SourcedSpecialChange {
            special: SpecialChange::ResourceDefinition(definition),
            name: "Rage".into(),
            origin_id: "rage".into(),
        }
    }

    fn barbarian() -> CharacterBaseData {
        let mut base = CharacterBaseData::new("Amiri");
        base.classes = vec![with_levels(fighter(), 4)];
        base.abilities.insert(Ability::Constitution, AbilityScore::new(16.0));
        base
    }

    #[test]
    fn test_defaults_and_modifications() {
        let mut fixture = Fixture::new(
            barbarian(),
            vec![sourced(
                Change::new(
                    ChangeKind::CustomVariable { variable: "resources.rage.max".into() },
                    "2",
                    BonusType::Untyped,
                ),
                "Extra Rage",
            )],
        );
        fixture.special_changes = vec![declared(rage("4 + @ability.constitution.modifier + (@level - 1) * 2"))];
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::Resources);

        // 4 + 3 + 6 + 2 extra
        let rage = &sheet.resources["rage"];
        assert!((rage.max - 15.0).abs() < f64::EPSILON);
        assert!(rage.min.abs() < f64::EPSILON);
        assert!((rage.default_charges_per_use - 1.0).abs() < f64::EPSILON);
        assert!((rage.recharge - 15.0).abs() < f64::EPSILON);
        assert!((rage.current - 15.0).abs() < f64::EPSILON);
        assert_eq!(index.get("resources.rage.current"), Some(15.0));
        assert_eq!(index.get("customVariable.resources.rage.recharge"), Some(15.0));
    }

    #[test]
    fn test_persisted_current_is_clamped() {
        let mut base = barbarian();
        base.resource_current_values.insert("rage".into(), 40.0);
        let mut fixture = Fixture::new(base, Vec::new());
        fixture.special_changes = vec![declared(rage("6"))];
        let roller = fixed_roller();
        let (sheet, _) = run_until(&fixture.context(&roller), Stage::Resources);

        assert!((sheet.resources["rage"].current - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_initial_value_and_last_declaration_wins() {
        let mut first = rage("6");
        first.initial_value_formula = Some("1".into());
        let mut second = rage("8");
        second.initial_value_formula = Some("@resources.rage.max / 2".into());
        let mut fixture = Fixture::new(barbarian(), Vec::new());
        fixture.special_changes = vec![declared(first), declared(second)];
        let roller = fixed_roller();
        let (sheet, _) = run_until(&fixture.context(&roller), Stage::Resources);

        assert_eq!(sheet.resources.len(), 1);
        assert!((sheet.resources["rage"].max - 8.0).abs() < f64::EPSILON);
        assert!((sheet.resources["rage"].current - 4.0).abs() < f64::EPSILON);
    }
}
