//! Custom variables stage
//!
//! Variables come from explicit declarations (with base sources) and from
//! any modification that targets `customVariable.<id>`. They are evaluated
//! in dependency order so one variable can reference another.

use super::{IndexEntries, Layered, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::{CustomVariableDefinition, Source, SpecialChange, VariableBaseSource};
use crate::sheet::{record, CustomVariableSheet, SheetPatch, Warning};
use std::collections::{BTreeMap, BTreeSet};

/// Resource properties are published by the resources stage
const RESOURCE_PREFIX: &str = "resources.";

/// One variable to evaluate, in declaration order
struct VariableDecl {
    id: String,
    name: String,
    description: String,
    base_sources: Vec<VariableBaseSource>,
}

fn path(id: &str) -> String {
    format!("customVariable.{}", id)
}

fn collect_variables(ctx: &StageContext<'_>) -> Vec<VariableDecl> {
    let mut decls: Vec<VariableDecl> = Vec::new();

    for sourced in ctx.special_changes {
        let SpecialChange::CustomVariableDefinition(CustomVariableDefinition {
            variable_id,
            name,
            description,
            base_sources,
        }) = &sourced.special
        else {
            continue;
        };
        match decls.iter_mut().find(|s| &s.id == variable_id) {
            Some(existing) => existing.base_sources.extend(base_sources.iter().cloned()),
            None => decls.push(VariableDecl {
                id: variable_id.clone(),
                name: name.clone(),
                description: description.clone(),
                base_sources: base_sources.clone(),
            }),
        }
    }

    for id in ctx.changes.custom_variable_ids() {
        if id.starts_with(RESOURCE_PREFIX) || decls.iter().any(|s| s.id == id) {
            continue;
        }
        decls.push(VariableDecl {
            name: id.clone(),
            id,
            description: String::new(),
            base_sources: Vec::new(),
        });
    }
    decls
}

/// Ids of the other variables `decl` reads
fn dependencies(ctx: &StageContext<'_>, decl: &VariableDecl, known: &BTreeSet<&str>) -> Vec<String> {
    let mut deps: Vec<String> = decl
        .base_sources
        .iter()
        .flat_map(|s| s.formula.custom_variable_dependencies())
        .collect();
    deps.extend(
        ctx.changes
            .for_target(&path(&decl.id))
            .iter()
            .flat_map(|c| c.change.formula.custom_variable_dependencies()),
    );
    deps.retain(|d| known.contains(d.as_str()));
    deps.sort();
    deps.dedup();
    deps
}

/// Kahn's algorithm, picking ready variables in declaration order
///
/// Returns the unsorted remainder on a cycle.
fn topological_order(ctx: &StageContext<'_>, decls: &[VariableDecl]) -> Result<Vec<usize>, Vec<String>> {
    let known: BTreeSet<&str> = decls.iter().map(|s| s.id.as_str()).collect();
    let deps: Vec<Vec<String>> = decls.iter().map(|s| dependencies(ctx, s, &known)).collect();

    let mut done: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(decls.len());
    while order.len() < decls.len() {
        let ready = decls.iter().enumerate().find(|(i, decl)| {
            !done.contains(decl.id.as_str()) && deps[*i].iter().all(|d| done.contains(d.as_str()))
        });
        match ready {
            Some((i, decl)) => {
                done.insert(decl.id.as_str());
                order.push(i);
            }
            None => {
                return Err(decls
                    .iter()
                    .filter(|s| !done.contains(s.id.as_str()))
                    .map(|s| s.id.clone())
                    .collect())
            }
        }
    }
    Ok(order)
}

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let decls = collect_variables(ctx);

    let order = match topological_order(ctx, &decls) {
        Ok(order) => order,
        Err(variables) => {
            record(&mut warnings, Warning::CustomVariableCycle { variables });
            (0..decls.len()).collect()
        }
    };

    let mut entries = IndexEntries::new();
    let mut variables = BTreeMap::new();
    for i in order {
        let decl = &decls[i];
        let target = path(&decl.id);
        let total = {
            let lookup = Layered { index, entries: &entries };
            let mut sources: Vec<Source> = decl
                .base_sources
                .iter()
                .map(|base| {
                    let value = ctx.evaluate(&base.formula, &lookup, &target, &base.name, &mut warnings);
                    Source::new(value, base.name.clone(), base.bonus_type.clone(), decl.id.clone())
                })
                .collect();
            sources.extend(ctx.sources_for(&target, &lookup, &mut warnings));
            ctx.aggregate(sources)
        };

        entries.set(target, total.total);
        variables.insert(
            decl.id.clone(),
            CustomVariableSheet {
                name: decl.name.clone(),
                description: decl.description.clone(),
                total,
            },
        );
    }

    tracing::debug!(count = variables.len(), "custom variables evaluated");
    StageOutput {
        patch: SheetPatch::CustomVariables(variables),
        entries,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Stage;
    use crate::changes::{
        Change, ChangeKind, CustomVariableDefinition, SourcedSpecialChange, SpecialChange,
        VariableBaseSource,
    };
    use crate::character::fixtures::{fighter, with_levels};
    use crate::character::CharacterBaseData;
    use crate::sheet::Warning;
    use crate::types::BonusType;

    fn declare(id: &str, formula: &str) -> SourcedSpecialChange {
        SourcedSpecialChange {
            special: SpecialChange::CustomVariableDefinition(CustomVariableDefinition {
                variable_id: id.to_string(),
                name: id.to_uppercase(),
                description: String::new(),
                base_sources: vec![VariableBaseSource {
                    name: "Base".into(),
                    formula: formula.into(),
                    bonus_type: BonusType::Base,
                }],
            }),
            name: "Test Feature".into(),
            origin_id: "test_feature".into(),
        }
    }

    fn bonus(variable: &str, formula: &str) -> Change {
        Change::new(
            ChangeKind::CustomVariable { variable: variable.into() },
            formula,
            BonusType::Untyped,
        )
    }

    #[test]
    fn test_dependency_order_and_implicit_variables() {
        let mut base = CharacterBaseData::new("Amiri");
        base.classes = vec![with_levels(fighter(), 3)];
        let mut fixture = Fixture::new(
            base,
            vec![
                sourced(bonus("a", "2"), "Boost"),
                sourced(bonus("sneak", "3"), "Trick"),
                sourced(bonus("resources.rage.max", "2"), "Extra Rage"),
            ],
        );
        fixture.special_changes = vec![declare("b", "@customVariable.a + 1"), declare("a", "@level * 2")];
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::CustomVariables);

        assert_eq!(index.get("customVariable.a"), Some(8.0));
        assert_eq!(index.get("customVariable.b"), Some(9.0));
        assert_eq!(sheet.custom_variable("sneak"), Some(3.0));
        assert_eq!(sheet.custom_variables["b"].name, "B");
        assert!(!sheet.custom_variables.contains_key("resources.rage.max"));
        assert!(sheet.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_declarations_merge_base_sources() {
        let mut fixture = Fixture::new(CharacterBaseData::new("Merged"), Vec::new());
        fixture.special_changes = vec![declare("ki", "2"), declare("ki", "3")];
        let roller = fixed_roller();
        let (sheet, _) = run_until(&fixture.context(&roller), Stage::CustomVariables);

        assert_eq!(sheet.custom_variable("ki"), Some(5.0));
        assert_eq!(sheet.custom_variables["ki"].total.source_values.len(), 2);
    }

    #[test]
    fn test_cycle_falls_back_to_declaration_order() {
        let mut fixture = Fixture::new(CharacterBaseData::new("Loop"), Vec::new());
        fixture.special_changes = vec![
            declare("a", "@customVariable.b"),
            declare("b", "@customVariable.a + 1"),
        ];
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::CustomVariables);

        assert!(sheet.warnings.iter().any(|w| matches!(
            w,
            Warning::CustomVariableCycle { variables } if variables == &vec!["a".to_string(), "b".to_string()]
        )));
        // a could not resolve b and fell back to 0
        assert_eq!(index.get("customVariable.a"), Some(0.0));
        assert_eq!(index.get("customVariable.b"), Some(1.0));
    }
}
