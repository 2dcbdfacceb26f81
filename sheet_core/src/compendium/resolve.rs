//! Compendium resolution - merge active packs into one registry

use super::{Compendium, CompendiumContext, CompendiumRegistry};
use crate::sheet::{record, Warning};
use std::collections::{BTreeMap, BTreeSet};

/// Resolve `active_ids`, in order, through `loader`
///
/// Missing dependencies and schema conflicts are warnings; the first pack to
/// claim a type name owns it. Packs the loader cannot supply are skipped.
pub fn resolve_compendiums<F>(active_ids: &[String], loader: F) -> CompendiumContext
where
    F: Fn(&str) -> Option<Compendium>,
{
    let mut registry = CompendiumRegistry::new();
    let mut available_type_names = Vec::new();
    let mut entity_ids: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut warnings = Vec::new();

    for compendium_id in active_ids {
        let Some(compendium) = loader(compendium_id) else {
            record(
                &mut warnings,
                Warning::CompendiumLoadFailed {
                    compendium_id: compendium_id.clone(),
                },
            );
            continue;
        };

        for dependency in &compendium.dependencies {
            if !active_ids.contains(dependency) {
                record(
                    &mut warnings,
                    Warning::MissingDependency {
                        compendium_id: compendium.id.clone(),
                        dependency_id: dependency.clone(),
                    },
                );
            }
        }

        for (entity_type, group) in &compendium.entities {
            entity_ids
                .entry(entity_type.clone())
                .or_default()
                .extend(group.iter().map(|entity| entity.id.clone()));
        }

        for schema in compendium.schemas {
            let type_name = schema.type_name.clone();
            match registry.register(schema, &compendium.id) {
                Ok(()) => available_type_names.push(type_name),
                Err(existing_compendium_id) => record(
                    &mut warnings,
                    Warning::SchemaConflict {
                        type_name,
                        compendium_id: compendium.id.clone(),
                        existing_compendium_id,
                    },
                ),
            }
        }
    }

    tracing::debug!(
        packs = active_ids.len(),
        types = available_type_names.len(),
        entities = entity_ids.values().map(BTreeSet::len).sum::<usize>(),
        warnings = warnings.len(),
        "resolved compendiums"
    );

    CompendiumContext {
        registry,
        available_type_names,
        entity_ids,
        warnings,
    }
}
