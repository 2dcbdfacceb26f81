//! ChangeSource - Trait and implementations for modification providers

mod buff;
mod class_feature;
mod feat;
mod item;
mod race;

pub use buff::Buff;
pub use class_feature::ClassFeature;
pub use feat::Feat;
pub use item::{ArmorData, ArmorKind, Item};
pub use race::Race;

use crate::changes::{
    ContextualChange, SourcedChange, SourcedContextualChange, SourcedSpecialChange, SpecialChange,
};
use crate::character::CharacterBaseData;
use crate::entity::{ChangeSet, ComputedEntity, Entity, EntityContent};
use crate::types::OriginType;

/// Anything on a character that contributes modifications
pub trait ChangeSource {
    /// Unique identifier for this source
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn origin_type(&self) -> OriginType;

    /// Inactive sources (unequipped items, paused buffs) contribute nothing
    fn is_active(&self) -> bool {
        true
    }

    /// Sort key used by [`character_sources`]; lower keys come first
    ///
    /// The resulting order decides which of two equal non-stacking bonuses
    /// the aggregator keeps under the first/last tie policies, and which
    /// duplicate resource declaration survives. The race sorts before class
    /// features, feats sit at 0, equipment follows and buffs close the list.
    fn priority(&self) -> i32 {
        0
    }

    fn content(&self) -> &ChangeSet;

    /// Listed among the sheet's special features
    fn is_special_feature(&self) -> bool {
        false
    }

    fn sourced_changes(&self) -> Vec<SourcedChange> {
        self.content()
            .changes
            .iter()
            .map(|change| SourcedChange {
                change: change.clone(),
                name: self.name().to_string(),
                origin_id: self.id().to_string(),
                origin_type: self.origin_type(),
            })
            .collect()
    }

    fn sourced_contextual_changes(&self) -> Vec<SourcedContextualChange> {
        sourced_contextual(
            &self.content().contextual_changes,
            self.id(),
            self.origin_type(),
        )
    }

    fn sourced_special_changes(&self) -> Vec<SourcedSpecialChange> {
        sourced_special(&self.content().special_changes, self.name(), self.id())
    }

    /// The source viewed as an entity for the computed entity list
    fn computed_entity(&self) -> ComputedEntity {
        let mut entity = Entity::new(self.id(), self.origin_type().entity_type(), self.name());
        entity.description = self.description().to_string();
        entity.content = EntityContent::Current(self.content().clone());
        ComputedEntity {
            entity,
            origin_type: self.origin_type(),
            origin_id: self.id().to_string(),
            name: self.name().to_string(),
            suppressed: false,
        }
    }
}

pub(crate) fn sourced_contextual(
    contextual: &[ContextualChange],
    origin_id: &str,
    origin_type: OriginType,
) -> Vec<SourcedContextualChange> {
    contextual
        .iter()
        .map(|c| SourcedContextualChange {
            contextual: c.clone(),
            origin_id: origin_id.to_string(),
            origin_type,
        })
        .collect()
}

pub(crate) fn sourced_special(
    special: &[SpecialChange],
    name: &str,
    origin_id: &str,
) -> Vec<SourcedSpecialChange> {
    special
        .iter()
        .map(|s| SourcedSpecialChange {
            special: s.clone(),
            name: name.to_string(),
            origin_id: origin_id.to_string(),
        })
        .collect()
}

/// Active sources on the character, in compile order
///
/// Sources with equal priority keep their declaration order.
pub fn character_sources(base: &CharacterBaseData) -> Vec<&dyn ChangeSource> {
    let mut sources: Vec<&dyn ChangeSource> = Vec::new();
    if let Some(race) = &base.race {
        sources.push(race);
    }
    sources.extend(base.class_features.iter().map(|s| s as &dyn ChangeSource));
    sources.extend(base.feats.iter().map(|s| s as &dyn ChangeSource));
    sources.extend(base.items.iter().map(|s| s as &dyn ChangeSource));
    sources.extend(base.buffs.iter().map(|s| s as &dyn ChangeSource));

    sources.retain(|s| s.is_active());
    sources.sort_by_key(|s| s.priority());
    sources
}
