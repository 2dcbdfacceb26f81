//! Source aggregation - applies stacking rules to the sources of one statistic

use crate::config::{StackingConstants, TiePolicy};
use crate::types::BonusType;
use serde::{Deserialize, Serialize};

/// One evaluated contribution before stacking rules are applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub value: f64,
    pub name: String,
    pub bonus_type: BonusType,
    /// Stable id for UI correlation (usually the origin entity id)
    pub source_id: String,
}

impl Source {
    pub fn new(
        value: f64,
        name: impl Into<String>,
        bonus_type: BonusType,
        source_id: impl Into<String>,
    ) -> Self {
        Source {
            value,
            name: name.into(),
            bonus_type,
            source_id: source_id.into(),
        }
    }

    /// A `base` source whose id is derived from its name
    pub fn base(value: f64, name: impl Into<String>) -> Self {
        let name = name.into();
        let source_id = name.to_ascii_lowercase().replace(' ', "_");
        Source::new(value, name, BonusType::Base, source_id)
    }
}

/// One entry of a statistic's audit breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceValue {
    pub value: f64,
    pub source_name: String,
    pub bonus_type: BonusType,
    /// False when excluded by stacking rules; kept for display
    pub relevant: bool,
    pub source_id: String,
}

/// A statistic total together with its breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceValueSum {
    pub total: f64,
    pub source_values: Vec<SourceValue>,
}

impl SourceValueSum {
    /// Sum of the relevant entries; equals `total` by construction
    pub fn relevant_sum(&self) -> f64 {
        self.source_values
            .iter()
            .filter(|sv| sv.relevant)
            .map(|sv| sv.value)
            .sum()
    }

    /// Same breakdown, keeping only entries that pass `keep`; the total is recomputed
    pub fn filtered(&self, keep: impl Fn(&SourceValue) -> bool) -> SourceValueSum {
        let source_values: Vec<SourceValue> =
            self.source_values.iter().filter(|sv| keep(sv)).cloned().collect();
        let total = source_values.iter().filter(|sv| sv.relevant).map(|sv| sv.value).sum();
        SourceValueSum {
            total,
            source_values,
        }
    }
}

/// Drop `base` sources when any `replacement` exists, and treat replacements as base
fn apply_replacements(sources: Vec<Source>) -> Vec<Source> {
    if !sources.iter().any(|s| s.bonus_type == BonusType::Replacement) {
        return sources;
    }
    sources
        .into_iter()
        .filter(|s| s.bonus_type != BonusType::Base)
        .map(|mut s| {
            if s.bonus_type == BonusType::Replacement {
                s.bonus_type = BonusType::Base;
            }
            s
        })
        .collect()
}

/// Index of the source that stays relevant among positive same-type values
fn best_positive(group: &[&Source], tie_policy: TiePolicy) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, source) in group.iter().enumerate() {
        if source.value <= 0.0 {
            continue;
        }
        best = match best {
            None => Some(index),
            Some(current) => {
                let current_value = group[current].value;
                let better = match tie_policy {
                    TiePolicy::FirstEncountered => source.value > current_value,
                    TiePolicy::LastEncountered => source.value >= current_value,
                };
                if better {
                    Some(index)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Apply stacking rules and produce a total with its breakdown
///
/// Zero-valued sources are dropped. Within a stacking bonus type every value
/// counts; within a non-stacking type only the highest positive value counts
/// and penalties always count in full. The breakdown keeps input order.
pub fn aggregate_sources(sources: Vec<Source>, rules: &StackingConstants) -> SourceValueSum {
    let sources: Vec<Source> = apply_replacements(
        sources.into_iter().filter(|s| s.value != 0.0).collect(),
    );

    let mut relevant = vec![true; sources.len()];

    // bonus types in first-seen order
    let mut bonus_types: Vec<&BonusType> = Vec::new();
    for source in &sources {
        if !bonus_types.contains(&&source.bonus_type) {
            bonus_types.push(&source.bonus_type);
        }
    }

    for bonus_type in bonus_types {
        if rules.stacks(bonus_type) {
            continue;
        }
        let members: Vec<usize> = (0..sources.len())
            .filter(|&i| &sources[i].bonus_type == bonus_type)
            .collect();
        let group: Vec<&Source> = members.iter().map(|&i| &sources[i]).collect();
        let best = best_positive(&group, rules.tie_policy);
        for (position, &index) in members.iter().enumerate() {
            if sources[index].value > 0.0 {
                relevant[index] = best == Some(position);
            }
        }
    }

    let source_values: Vec<SourceValue> = sources
        .into_iter()
        .zip(relevant)
        .map(|(source, relevant)| SourceValue {
            value: source.value,
            source_name: source.name,
            bonus_type: source.bonus_type,
            relevant,
            source_id: source.source_id,
        })
        .collect();

    let total = source_values
        .iter()
        .filter(|sv| sv.relevant)
        .map(|sv| sv.value)
        .sum();

    SourceValueSum {
        total,
        source_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn source(value: f64, bonus_type: BonusType, id: &str) -> Source {
        Source::new(value, id, bonus_type, id)
    }

    #[test]
    fn test_non_stacking_keeps_highest() {
        let result = aggregate_sources(
            vec![
                source(16.0, BonusType::Base, "base"),
                source(2.0, BonusType::Enhancement, "belt"),
                source(4.0, BonusType::Enhancement, "spell"),
            ],
            &StackingConstants::default(),
        );
        assert!((result.total - 20.0).abs() < f64::EPSILON);
        let belt = result.source_values.iter().find(|sv| sv.source_id == "belt").unwrap();
        assert!(!belt.relevant);
    }

    #[test]
    fn test_dodge_stacks() {
        let result = aggregate_sources(
            vec![
                source(1.0, BonusType::Dodge, "a"),
                source(2.0, BonusType::Dodge, "b"),
            ],
            &StackingConstants::default(),
        );
        assert!((result.total - 3.0).abs() < f64::EPSILON);
        assert!(result.source_values.iter().all(|sv| sv.relevant));
    }

    #[test]
    fn test_penalties_always_count() {
        let result = aggregate_sources(
            vec![
                source(3.0, BonusType::Morale, "heroism"),
                source(-2.0, BonusType::Morale, "shaken"),
                source(-1.0, BonusType::Morale, "fatigue"),
                source(1.0, BonusType::Morale, "bardic"),
            ],
            &StackingConstants::default(),
        );
        assert!((result.total - 0.0).abs() < f64::EPSILON);
        let relevant: Vec<&str> = result
            .source_values
            .iter()
            .filter(|sv| sv.relevant)
            .map(|sv| sv.source_id.as_str())
            .collect();
        assert_eq!(relevant, vec!["heroism", "shaken", "fatigue"]);
    }

    #[test]
    fn test_zero_sources_dropped() {
        let result = aggregate_sources(
            vec![source(0.0, BonusType::Luck, "nothing"), source(1.0, BonusType::Untyped, "x")],
            &StackingConstants::default(),
        );
        assert_eq!(result.source_values.len(), 1);
    }

    #[test]
    fn test_tie_first_encountered() {
        let result = aggregate_sources(
            vec![
                source(2.0, BonusType::Luck, "first"),
                source(2.0, BonusType::Luck, "second"),
            ],
            &StackingConstants::default(),
        );
        let relevant: Vec<&str> = result
            .source_values
            .iter()
            .filter(|sv| sv.relevant)
            .map(|sv| sv.source_id.as_str())
            .collect();
        assert_eq!(relevant, vec!["first"]);
        assert!((result.total - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tie_last_encountered() {
        let rules = StackingConstants {
            tie_policy: TiePolicy::LastEncountered,
            extra_stacking_types: Vec::new(),
        };
        let result = aggregate_sources(
            vec![
                source(2.0, BonusType::Luck, "first"),
                source(2.0, BonusType::Luck, "second"),
            ],
            &rules,
        );
        let relevant: Vec<&str> = result
            .source_values
            .iter()
            .filter(|sv| sv.relevant)
            .map(|sv| sv.source_id.as_str())
            .collect();
        assert_eq!(relevant, vec!["second"]);
    }

    #[test]
    fn test_flagged_custom_type_stacks() {
        let rules = StackingConstants {
            tie_policy: TiePolicy::FirstEncountered,
            extra_stacking_types: vec![BonusType::Custom("trait".into())],
        };
        let result = aggregate_sources(
            vec![
                source(1.0, BonusType::Custom("trait".into()), "a"),
                source(1.0, BonusType::Custom("trait".into()), "b"),
            ],
            &rules,
        );
        assert!((result.total - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_replacement_drops_base() {
        let result = aggregate_sources(
            vec![
                source(12.0, BonusType::Base, "base"),
                source(18.0, BonusType::Replacement, "wild_shape"),
                source(2.0, BonusType::Enhancement, "belt"),
            ],
            &StackingConstants::default(),
        );
        assert!((result.total - 20.0).abs() < f64::EPSILON);
        assert!(result.source_values.iter().all(|sv| sv.source_id != "base"));
        assert_eq!(result.source_values[0].bonus_type, BonusType::Base);
    }

    fn bonus_type_strategy() -> impl Strategy<Value = BonusType> {
        prop_oneof![
            Just(BonusType::Untyped),
            Just(BonusType::Dodge),
            Just(BonusType::Enhancement),
            Just(BonusType::Morale),
            Just(BonusType::Luck),
            Just(BonusType::Deflection),
        ]
    }

    proptest! {
        #[test]
        fn prop_total_equals_relevant_sum(
            entries in prop::collection::vec((-10i32..10, bonus_type_strategy()), 0..24)
        ) {
            let sources: Vec<Source> = entries
                .iter()
                .enumerate()
                .map(|(i, (v, bt))| source(*v as f64, bt.clone(), &format!("s{}", i)))
                .collect();
            let result = aggregate_sources(sources, &StackingConstants::default());
            prop_assert!((result.total - result.relevant_sum()).abs() < 1e-9);
        }

        #[test]
        fn prop_one_relevant_positive_per_non_stacking_type(
            entries in prop::collection::vec((-10i32..10, bonus_type_strategy()), 0..24)
        ) {
            let sources: Vec<Source> = entries
                .iter()
                .enumerate()
                .map(|(i, (v, bt))| source(*v as f64, bt.clone(), &format!("s{}", i)))
                .collect();
            let result = aggregate_sources(sources, &StackingConstants::default());
            for bt in [BonusType::Enhancement, BonusType::Morale, BonusType::Luck, BonusType::Deflection] {
                let positives: Vec<&SourceValue> = result
                    .source_values
                    .iter()
                    .filter(|sv| sv.bonus_type == bt && sv.value > 0.0)
                    .collect();
                let relevant: Vec<&&SourceValue> = positives.iter().filter(|sv| sv.relevant).collect();
                prop_assert!(relevant.len() <= 1);
                if let Some(max) = positives.iter().map(|sv| sv.value).reduce(f64::max) {
                    prop_assert_eq!(relevant.len(), 1);
                    prop_assert!((relevant[0].value - max).abs() < f64::EPSILON);
                    // first encountered among the maxima
                    let first_max = positives.iter().find(|sv| sv.value == max).unwrap();
                    prop_assert_eq!(&relevant[0].source_id, &first_max.source_id);
                }
                prop_assert!(result
                    .source_values
                    .iter()
                    .filter(|sv| sv.bonus_type == bt && sv.value < 0.0)
                    .all(|sv| sv.relevant));
            }
        }

        #[test]
        fn prop_stacking_types_all_relevant(
            entries in prop::collection::vec((-10i32..10, bonus_type_strategy()), 0..24)
        ) {
            let sources: Vec<Source> = entries
                .iter()
                .enumerate()
                .map(|(i, (v, bt))| source(*v as f64, bt.clone(), &format!("s{}", i)))
                .collect();
            let result = aggregate_sources(sources, &StackingConstants::default());
            prop_assert!(result
                .source_values
                .iter()
                .filter(|sv| sv.bonus_type == BonusType::Untyped || sv.bonus_type == BonusType::Dodge)
                .all(|sv| sv.relevant));
        }
    }
}
