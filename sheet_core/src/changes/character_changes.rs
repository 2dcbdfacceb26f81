//! CharacterChanges - every sourced modification of a character, grouped by target

use super::{ContextualChange, SourcedChange, SourcedContextualChange};
use crate::types::OriginType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Modifications grouped by target statistic path
///
/// Within a group, modifications keep the order they were added in, which is
/// the order the stacking tie rule sees them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterChanges {
    by_target: BTreeMap<String, Vec<SourcedChange>>,
}

impl CharacterChanges {
    pub fn new() -> Self {
        CharacterChanges {
            by_target: BTreeMap::new(),
        }
    }

    /// Build from a flat list, then fold in enabled contextual groups
    pub fn from_sources(
        changes: impl IntoIterator<Item = SourcedChange>,
        contextual: &[SourcedContextualChange],
    ) -> Self {
        let mut grouped = CharacterChanges::new();
        for change in changes {
            grouped.push(change);
        }
        for sourced in contextual.iter().filter(|c| c.contextual.enabled) {
            grouped.push_contextual(&sourced.contextual, &sourced.origin_id, sourced.origin_type);
        }
        grouped
    }

    pub fn push(&mut self, change: SourcedChange) {
        self.by_target
            .entry(change.target_path())
            .or_default()
            .push(change);
    }

    fn push_contextual(&mut self, contextual: &ContextualChange, origin_id: &str, origin_type: OriginType) {
        for change in &contextual.changes {
            self.push(SourcedChange {
                change: change.clone(),
                name: contextual.name.clone(),
                origin_id: origin_id.to_string(),
                origin_type,
            });
        }
    }

    /// Modifications targeting `path`, in insertion order
    pub fn for_target(&self, path: &str) -> &[SourcedChange] {
        self.by_target.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All modifications whose target starts with `prefix`
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a SourcedChange> + 'a {
        self.by_target
            .iter()
            .filter(move |(path, _)| path.starts_with(prefix))
            .flat_map(|(_, changes)| changes.iter())
    }

    /// Ids of every custom variable some modification targets, sorted
    pub fn custom_variable_ids(&self) -> Vec<String> {
        self.by_target
            .keys()
            .filter_map(|path| path.strip_prefix("customVariable."))
            .map(str::to_string)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{Change, ChangeKind};
    use crate::types::{Ability, BonusType};

    fn sourced(kind: ChangeKind, value: &str, name: &str) -> SourcedChange {
        SourcedChange {
            change: Change::new(kind, value, BonusType::Untyped),
            name: name.to_string(),
            origin_id: name.to_lowercase(),
            origin_type: OriginType::Feat,
        }
    }

    #[test]
    fn test_grouping_preserves_order() {
        let changes = CharacterChanges::from_sources(
            vec![
                sourced(ChangeKind::AbilityScore { ability: Ability::Strength }, "2", "First"),
                sourced(ChangeKind::Initiative, "4", "Improved Initiative"),
                sourced(ChangeKind::AbilityScore { ability: Ability::Strength }, "4", "Second"),
            ],
            &[],
        );
        let strength = changes.for_target("ability.strength.score");
        assert_eq!(strength.len(), 2);
        assert_eq!(strength[0].name, "First");
        assert_eq!(strength[1].name, "Second");
        assert_eq!(changes.len(), 3);
        assert!(changes.for_target("ac.total").is_empty());
    }

    #[test]
    fn test_enabled_contextual_changes_merge() {
        let contextual = vec![
            SourcedContextualChange {
                contextual: ContextualChange {
                    id: "power_attack".into(),
                    name: "Power Attack".into(),
                    enabled: true,
                    changes: vec![Change::new(ChangeKind::AttackRolls, "-1", BonusType::Untyped)],
                },
                origin_id: "power_attack".into(),
                origin_type: OriginType::Feat,
            },
            SourcedContextualChange {
                contextual: ContextualChange {
                    id: "fight_defensively".into(),
                    name: "Fighting Defensively".into(),
                    enabled: false,
                    changes: vec![Change::new(ChangeKind::ArmorClass, "2", BonusType::Dodge)],
                },
                origin_id: "core".into(),
                origin_type: OriginType::Entity,
            },
        ];
        let changes = CharacterChanges::from_sources(Vec::new(), &contextual);
        assert_eq!(changes.for_target("attack.total")[0].name, "Power Attack");
        assert!(changes.for_target("ac.total").is_empty());
    }

    #[test]
    fn test_custom_variable_ids() {
        let changes = CharacterChanges::from_sources(
            vec![
                sourced(ChangeKind::CustomVariable { variable: "sneak".into() }, "1", "Rogue"),
                sourced(ChangeKind::CustomVariable { variable: "ki".into() }, "1", "Monk"),
            ],
            &[],
        );
        assert_eq!(changes.custom_variable_ids(), vec!["ki".to_string(), "sneak".to_string()]);
        assert_eq!(changes.with_prefix("customVariable.").count(), 2);
    }
}
