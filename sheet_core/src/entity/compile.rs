//! Entity compilation - one uniform stream of computed entities and their modifications

use super::{ComputedEntity, Entity};
use crate::changes::{SourcedChange, SourcedContextualChange, SourcedSpecialChange};
use crate::character::CharacterBaseData;
use crate::source::{character_sources, sourced_contextual, sourced_special, ChangeSource};
use std::collections::BTreeMap;

/// Everything the character's entities declare, tagged with its origin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledEntities {
    pub computed_entities: Vec<ComputedEntity>,
    pub changes: Vec<SourcedChange>,
    pub contextual_changes: Vec<SourcedContextualChange>,
    pub special_changes: Vec<SourcedSpecialChange>,
}

impl CompiledEntities {
    fn add_source(&mut self, source: &dyn ChangeSource) {
        self.changes.extend(source.sourced_changes());
        self.contextual_changes.extend(source.sourced_contextual_changes());
        self.special_changes.extend(source.sourced_special_changes());
        self.computed_entities.push(source.computed_entity());
    }

    fn add_entity(&mut self, entity: &Entity) {
        let computed = ComputedEntity::from_entity(entity.clone());
        let content = entity.content.resolve();

        self.changes.extend(content.changes.iter().map(|change| SourcedChange {
            change: change.clone(),
            name: computed.name.clone(),
            origin_id: computed.origin_id.clone(),
            origin_type: computed.origin_type,
        }));
        self.contextual_changes.extend(sourced_contextual(
            content.contextual_changes,
            &computed.origin_id,
            computed.origin_type,
        ));
        self.special_changes.extend(sourced_special(
            content.special_changes,
            &computed.name,
            &computed.origin_id,
        ));
        self.computed_entities.push(computed);
    }
}

/// Compile the character's sources, its validated ad-hoc entities and its
/// applicable per-level entity instances
///
/// Ad-hoc entities are compiled unconditionally; per-level instances only
/// when flagged applicable. No validation happens here.
pub fn compile_entities(
    base: &CharacterBaseData,
    custom_entities: &BTreeMap<String, Vec<Entity>>,
) -> CompiledEntities {
    let mut compiled = CompiledEntities::default();

    for source in character_sources(base) {
        compiled.add_source(source);
    }

    for entity in custom_entities.values().flatten() {
        compiled.add_entity(entity);
    }

    for instance in base.entities.values().flatten().filter(|i| i.applicable) {
        compiled.add_entity(&instance.entity);
    }

    tracing::debug!(
        entities = compiled.computed_entities.len(),
        changes = compiled.changes.len(),
        special = compiled.special_changes.len(),
        "compiled entities"
    );
    compiled
}
