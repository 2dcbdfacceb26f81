//! Compendiums - content packs defining entity-type schemas
//!
//! Packs are merged by [`resolve_compendiums`] into a [`CompendiumContext`],
//! which [`validate_custom_entities`] then uses to filter a character's
//! ad-hoc entities.

mod resolve;
mod validate;

pub use resolve::resolve_compendiums;
pub use validate::{validate_custom_entities, EntityValidator, ValidationOutcome};

use crate::entity::Entity;
use crate::sheet::Warning;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Kind of value a schema field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
    IntegerArray,
    /// Ids of other entities
    Reference,
    Object,
    ObjectArray,
    /// A string or number restricted to `allowed_values`
    Enum,
    /// URL or asset path
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub optional: bool,
    /// Arrays and references must have at least one element
    #[serde(default)]
    pub non_empty: bool,
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    /// Nested fields for `object` and `object_array`
    #[serde(default)]
    pub object_fields: Vec<FieldDefinition>,
    /// Entity type a `reference` field points at; references are then
    /// checked against the known entities of that type
    #[serde(default)]
    pub reference_type: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
            optional: false,
            non_empty: false,
            allowed_values: Vec::new(),
            object_fields: Vec::new(),
            reference_type: None,
        }
    }

    pub fn referencing(mut self, entity_type: impl Into<String>) -> Self {
        self.reference_type = Some(entity_type.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Shape of one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub type_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A versioned bundle of schemas and entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compendium {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Packs that must also be active
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub schemas: Vec<EntitySchema>,
    /// Content shipped by the pack, keyed by entity type; its ids are what
    /// typed reference fields may point at
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<Entity>>,
}

/// A registered entity type
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub schema: EntitySchema,
    pub validator: EntityValidator,
    /// Pack that claimed the type
    pub compendium_id: String,
}

/// Entity types by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompendiumRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl CompendiumRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        CompendiumRegistry {
            entries: BTreeMap::new(),
        }
    }

    /// Register a schema unless its type is already claimed
    ///
    /// Returns the id of the owning pack when the type was taken.
    pub fn register(&mut self, schema: EntitySchema, compendium_id: &str) -> Result<(), String> {
        if let Some(existing) = self.entries.get(&schema.type_name) {
            return Err(existing.compendium_id.clone());
        }
        let validator = EntityValidator::new(&schema);
        self.entries.insert(
            schema.type_name.clone(),
            RegistryEntry {
                schema,
                validator,
                compendium_id: compendium_id.to_string(),
            },
        );
        Ok(())
    }

    /// Get a registered type by name
    pub fn get(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of resolving the active packs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompendiumContext {
    pub registry: CompendiumRegistry,
    /// Type names in registration order
    pub available_type_names: Vec<String>,
    /// Ids of pack-shipped entities by entity type
    pub entity_ids: BTreeMap<String, BTreeSet<String>>,
    pub warnings: Vec<Warning>,
}

impl CompendiumContext {
    pub fn knows_entity(&self, entity_type: &str, id: &str) -> bool {
        self.entity_ids
            .get(entity_type)
            .is_some_and(|ids| ids.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(type_name: &str) -> EntitySchema {
        EntitySchema {
            type_name: type_name.into(),
            description: String::new(),
            fields: vec![FieldDefinition::new("level", FieldType::Integer)],
            version: None,
        }
    }

    #[test]
    fn test_registry_first_claim_wins() {
        let mut registry = CompendiumRegistry::new();
        assert!(registry.register(schema("spell"), "core").is_ok());
        assert_eq!(registry.register(schema("spell"), "homebrew"), Err("core".to_string()));
        assert_eq!(registry.get("spell").map(|e| e.compendium_id.as_str()), Some("core"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deserialize_field_type_key() {
        let json = r#"{"name": "school", "type": "enum", "allowed_values": ["evocation", "illusion"]}"#;
        let field: FieldDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Enum);
        assert_eq!(field.allowed_values.len(), 2);
        assert!(!field.optional);
    }
}
