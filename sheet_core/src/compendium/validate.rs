//! Entity validation against resolved schemas

use super::{CompendiumContext, EntitySchema, FieldDefinition, FieldType};
use crate::entity::Entity;
use crate::sheet::{record, Warning};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field checks compiled from one schema
#[derive(Debug, Clone, PartialEq)]
pub struct EntityValidator {
    fields: Vec<FieldDefinition>,
}

impl EntityValidator {
    pub fn new(schema: &EntitySchema) -> Self {
        EntityValidator {
            fields: schema.fields.clone(),
        }
    }

    /// Every problem found, or `Ok` when the entity conforms
    pub fn validate(&self, entity: &Entity) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if entity.id.trim().is_empty() {
            errors.push("id must not be empty".to_string());
        }
        for field in &self.fields {
            check_field(field, entity.field_value(&field.name).as_ref(), &field.name, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_field(field: &FieldDefinition, value: Option<&Value>, path: &str, errors: &mut Vec<String>) {
    let value = match value {
        None | Some(Value::Null) => {
            if !field.optional {
                errors.push(format!("{}: required field is missing", path));
            }
            return;
        }
        Some(value) => value,
    };

    match field.field_type {
        FieldType::String | FieldType::Image => {
            if value.is_string() {
                check_allowed(field, value, path, errors);
            } else {
                errors.push(format!("{}: expected a string", path));
            }
        }
        FieldType::Integer => {
            if is_integer(value) {
                check_allowed(field, value, path, errors);
            } else {
                errors.push(format!("{}: expected an integer", path));
            }
        }
        FieldType::Number => {
            if !value.is_number() {
                errors.push(format!("{}: expected a number", path));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                errors.push(format!("{}: expected a boolean", path));
            }
        }
        FieldType::Enum => {
            if field.allowed_values.is_empty() {
                errors.push(format!("{}: enum field has no allowed values", path));
            } else {
                check_allowed(field, value, path, errors);
            }
        }
        FieldType::StringArray | FieldType::Reference => {
            check_array(field, value, path, errors, |v| v.is_string(), "string");
        }
        FieldType::IntegerArray => {
            check_array(field, value, path, errors, is_integer, "integer");
        }
        FieldType::Object => match value.as_object() {
            Some(object) => {
                for nested in &field.object_fields {
                    let nested_path = format!("{}.{}", path, nested.name);
                    check_field(nested, object.get(&nested.name), &nested_path, errors);
                }
            }
            None => errors.push(format!("{}: expected an object", path)),
        },
        FieldType::ObjectArray => match value.as_array() {
            Some(items) => {
                if field.non_empty && items.is_empty() {
                    errors.push(format!("{}: must not be empty", path));
                }
                for (index, item) in items.iter().enumerate() {
                    let Some(object) = item.as_object() else {
                        errors.push(format!("{}[{}]: expected an object", path, index));
                        continue;
                    };
                    for nested in &field.object_fields {
                        let nested_path = format!("{}[{}].{}", path, index, nested.name);
                        check_field(nested, object.get(&nested.name), &nested_path, errors);
                    }
                }
            }
            None => errors.push(format!("{}: expected an array", path)),
        },
    }
}

fn check_array(
    field: &FieldDefinition,
    value: &Value,
    path: &str,
    errors: &mut Vec<String>,
    element_ok: fn(&Value) -> bool,
    element_kind: &str,
) {
    let Some(items) = value.as_array() else {
        errors.push(format!("{}: expected an array", path));
        return;
    };
    if field.non_empty && items.is_empty() {
        errors.push(format!("{}: must not be empty", path));
    }
    for (index, item) in items.iter().enumerate() {
        if !element_ok(item) {
            errors.push(format!("{}[{}]: expected {}", path, index, element_kind));
        } else {
            check_allowed(field, item, &format!("{}[{}]", path, index), errors);
        }
    }
}

fn check_allowed(field: &FieldDefinition, value: &Value, path: &str, errors: &mut Vec<String>) {
    if !field.allowed_values.is_empty() && !field.allowed_values.contains(value) {
        errors.push(format!("{}: value {} is not allowed", path, value));
    }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

/// Typed references must name a pack entity or one of the character's own
fn check_references(
    schema: &EntitySchema,
    entity: &Entity,
    context: &CompendiumContext,
    custom: &BTreeMap<String, Vec<Entity>>,
) -> Vec<String> {
    let mut errors = Vec::new();
    for field in &schema.fields {
        let (FieldType::Reference, Some(target)) = (field.field_type, &field.reference_type) else {
            continue;
        };
        let Some(Value::Array(ids)) = entity.field_value(&field.name) else {
            continue;
        };
        for id in ids.iter().filter_map(Value::as_str) {
            let custom_known = custom
                .get(target)
                .is_some_and(|group| group.iter().any(|e| e.id == id));
            if !custom_known && !context.knows_entity(target, id) {
                errors.push(format!("{}: unknown {} '{}'", field.name, target, id));
            }
        }
    }
    errors
}

/// Entities that passed validation, keyed by type, plus one warning per dropped entity or group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub valid_entities: BTreeMap<String, Vec<Entity>>,
    pub warnings: Vec<Warning>,
}

/// Filter ad-hoc entities through the registry
///
/// Without a context every entity is skipped with a single warning. Unknown
/// types drop their whole group; invalid entities are dropped one by one.
pub fn validate_custom_entities(
    entities: &BTreeMap<String, Vec<Entity>>,
    context: Option<&CompendiumContext>,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    let entity_count: usize = entities.values().map(Vec::len).sum();
    if entity_count == 0 {
        return outcome;
    }

    let Some(context) = context else {
        record(&mut outcome.warnings, Warning::NoContext { entity_count });
        return outcome;
    };

    for (entity_type, group) in entities {
        if group.is_empty() {
            continue;
        }
        let Some(entry) = context.registry.get(entity_type) else {
            record(
                &mut outcome.warnings,
                Warning::UnknownEntityType {
                    entity_type: entity_type.clone(),
                    entity_count: group.len(),
                },
            );
            continue;
        };

        let mut valid = Vec::new();
        for entity in group {
            let mut errors = entry.validator.validate(entity).err().unwrap_or_default();
            errors.extend(check_references(&entry.schema, entity, context, entities));
            if errors.is_empty() {
                valid.push(entity.clone());
            } else {
                record(
                    &mut outcome.warnings,
                    Warning::InvalidEntity {
                        entity_type: entity_type.clone(),
                        entity_id: entity.id.clone(),
                        errors,
                    },
                );
            }
        }
        if !valid.is_empty() {
            outcome.valid_entities.insert(entity_type.clone(), valid);
        }
    }
    outcome
}
