//! Non-fatal warnings accumulated during a calculation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A problem that reduced the sheet without aborting the calculation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    // === Configuration ===
    MissingDependency {
        compendium_id: String,
        dependency_id: String,
    },
    SchemaConflict {
        type_name: String,
        compendium_id: String,
        existing_compendium_id: String,
    },
    CompendiumLoadFailed {
        compendium_id: String,
    },

    // === Validation ===
    NoContext {
        entity_count: usize,
    },
    UnknownEntityType {
        entity_type: String,
        entity_count: usize,
    },
    InvalidEntity {
        entity_type: String,
        entity_id: String,
        errors: Vec<String>,
    },

    // === Calculation ===
    FormulaFallback {
        target: String,
        source_name: String,
        formula: String,
        error: String,
    },
    CustomVariableCycle {
        variables: Vec<String>,
    },
    InvalidCgeConfig {
        cge_id: String,
        reason: String,
    },
    MissingProgression {
        class_id: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingDependency {
                compendium_id,
                dependency_id,
            } => write!(
                f,
                "compendium '{}' depends on '{}', which is not active",
                compendium_id, dependency_id
            ),
            Warning::SchemaConflict {
                type_name,
                compendium_id,
                existing_compendium_id,
            } => write!(
                f,
                "entity type '{}' from '{}' ignored, already defined by '{}'",
                type_name, compendium_id, existing_compendium_id
            ),
            Warning::CompendiumLoadFailed { compendium_id } => {
                write!(f, "compendium '{}' could not be loaded", compendium_id)
            }
            Warning::NoContext { entity_count } => write!(
                f,
                "{} custom entities skipped: no compendium context",
                entity_count
            ),
            Warning::UnknownEntityType {
                entity_type,
                entity_count,
            } => write!(
                f,
                "unknown entity type '{}', {} entities skipped",
                entity_type, entity_count
            ),
            Warning::InvalidEntity {
                entity_type,
                entity_id,
                errors,
            } => write!(
                f,
                "invalid {} '{}': {}",
                entity_type,
                entity_id,
                errors.join("; ")
            ),
            Warning::FormulaFallback {
                target,
                source_name,
                formula,
                error,
            } => write!(
                f,
                "formula '{}' from '{}' for {} failed ({}), using 0",
                formula, source_name, target, error
            ),
            Warning::CustomVariableCycle { variables } => write!(
                f,
                "custom variables form a cycle: {}",
                variables.join(", ")
            ),
            Warning::InvalidCgeConfig { cge_id, reason } => {
                write!(f, "resource configuration '{}' skipped: {}", cge_id, reason)
            }
            Warning::MissingProgression { class_id } => write!(
                f,
                "no class definition for '{}', its levels contribute nothing",
                class_id
            ),
        }
    }
}

/// Append a warning and log it
pub fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    tracing::warn!(warning = %warning, "calculation warning");
    warnings.push(warning);
}
