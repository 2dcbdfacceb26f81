//! Entities - content pieces that carry modifications

mod compile;

pub use compile::{compile_entities, CompiledEntities};

use crate::changes::{Change, ContextualChange, SpecialChange};
use crate::types::OriginType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The modification payload of one content format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub changes: Vec<Change>,
    #[serde(default)]
    pub contextual_changes: Vec<ContextualChange>,
    #[serde(default)]
    pub special_changes: Vec<SpecialChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
            && self.contextual_changes.is_empty()
            && self.special_changes.is_empty()
    }
}

/// Borrowed view of the modifications an entity effectively declares
#[derive(Debug, Clone, Copy)]
pub struct ResolvedContent<'a> {
    pub changes: &'a [Change],
    pub contextual_changes: &'a [ContextualChange],
    pub special_changes: &'a [SpecialChange],
}

/// Entity modifications in either content format
#[derive(Debug, Clone, PartialEq)]
pub enum EntityContent {
    Current(ChangeSet),
    /// Content that still carries the legacy lists alongside the plain ones
    Legacy { legacy: ChangeSet, current: ChangeSet },
}

impl Default for EntityContent {
    fn default() -> Self {
        EntityContent::Current(ChangeSet::default())
    }
}

impl EntityContent {
    /// Pick the effective lists: each legacy list wins over its plain counterpart when non-empty
    pub fn resolve(&self) -> ResolvedContent<'_> {
        match self {
            EntityContent::Current(set) => ResolvedContent {
                changes: &set.changes,
                contextual_changes: &set.contextual_changes,
                special_changes: &set.special_changes,
            },
            EntityContent::Legacy { legacy, current } => ResolvedContent {
                changes: prefer(&legacy.changes, &current.changes),
                contextual_changes: prefer(&legacy.contextual_changes, &current.contextual_changes),
                special_changes: prefer(&legacy.special_changes, &current.special_changes),
            },
        }
    }
}

fn prefer<'a, T>(preferred: &'a [T], fallback: &'a [T]) -> &'a [T] {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

/// A piece of content: spell, feat, item, buff, class feature, race...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntity", into = "RawEntity")]
pub struct Entity {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub content: EntityContent,
    /// Type-specific fields checked against the compendium schema
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>, name: impl Into<String>) -> Self {
        Entity {
            id: id.into(),
            entity_type: entity_type.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            content: EntityContent::default(),
            fields: Map::new(),
        }
    }

    pub fn with_changes(mut self, changes: Vec<Change>) -> Self {
        match &mut self.content {
            EntityContent::Current(set) => set.changes = changes,
            EntityContent::Legacy { current, .. } => current.changes = changes,
        }
        self
    }

    pub fn with_special_changes(mut self, special_changes: Vec<SpecialChange>) -> Self {
        match &mut self.content {
            EntityContent::Current(set) => set.special_changes = special_changes,
            EntityContent::Legacy { current, .. } => current.special_changes = special_changes,
        }
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn origin_type(&self) -> OriginType {
        OriginType::from_entity_type(&self.entity_type)
    }

    /// Value of a named field, including the common header fields
    pub fn field_value(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "entity_type" => Some(Value::String(self.entity_type.clone())),
            "description" => Some(Value::String(self.description.clone())),
            "tags" => Some(Value::from(self.tags.clone())),
            _ => self.fields.get(name).cloned(),
        }
    }
}

/// Wire shape of an entity, with legacy and plain lists side by side
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawEntity {
    id: String,
    entity_type: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    changes: Vec<Change>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    contextual_changes: Vec<ContextualChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    special_changes: Vec<SpecialChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    legacy_changes: Vec<Change>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    legacy_contextual_changes: Vec<ContextualChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    legacy_special_changes: Vec<SpecialChange>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<RawEntity> for Entity {
    fn from(raw: RawEntity) -> Self {
        let current = ChangeSet {
            changes: raw.changes,
            contextual_changes: raw.contextual_changes,
            special_changes: raw.special_changes,
        };
        let legacy = ChangeSet {
            changes: raw.legacy_changes,
            contextual_changes: raw.legacy_contextual_changes,
            special_changes: raw.legacy_special_changes,
        };
        let content = if legacy.is_empty() {
            EntityContent::Current(current)
        } else {
            EntityContent::Legacy { legacy, current }
        };
        Entity {
            id: raw.id,
            entity_type: raw.entity_type,
            name: raw.name,
            description: raw.description,
            tags: raw.tags,
            content,
            fields: raw.fields,
        }
    }
}

impl From<Entity> for RawEntity {
    fn from(entity: Entity) -> Self {
        let (current, legacy) = match entity.content {
            EntityContent::Current(set) => (set, ChangeSet::default()),
            EntityContent::Legacy { legacy, current } => (current, legacy),
        };
        RawEntity {
            id: entity.id,
            entity_type: entity.entity_type,
            name: entity.name,
            description: entity.description,
            tags: entity.tags,
            changes: current.changes,
            contextual_changes: current.contextual_changes,
            special_changes: current.special_changes,
            legacy_changes: legacy.changes,
            legacy_contextual_changes: legacy.contextual_changes,
            legacy_special_changes: legacy.special_changes,
            fields: entity.fields,
        }
    }
}

/// An entity placed on a character by the level system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInstance {
    pub instance_id: String,
    /// Set upstream by level resolution; inapplicable instances are ignored
    #[serde(default)]
    pub applicable: bool,
    pub entity: Entity,
}

/// An entity wrapped with per-calculation origin metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedEntity {
    pub entity: Entity,
    pub origin_type: OriginType,
    pub origin_id: String,
    pub name: String,
    /// Reserved for conditional disabling; always false today
    pub suppressed: bool,
}

impl ComputedEntity {
    pub fn from_entity(entity: Entity) -> Self {
        ComputedEntity {
            origin_type: entity.origin_type(),
            origin_id: entity.id.clone(),
            name: entity.name.clone(),
            suppressed: false,
            entity,
        }
    }
}
