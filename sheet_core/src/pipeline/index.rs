//! SubstitutionIndex - the variable store shared across stages

use crate::formula::VariableLookup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entries a stage publishes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexEntries {
    values: BTreeMap<String, f64>,
}

impl IndexEntries {
    pub fn new() -> Self {
        IndexEntries {
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, path: impl Into<String>, value: f64) {
        self.values.insert(path.into(), value);
    }

    pub fn get(&self, path: &str) -> Option<f64> {
        self.values.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Flat map from dotted variable path to value
///
/// Stages receive it by shared reference and return [`IndexEntries`]; the
/// pipeline folds those into a new index. Paths are never removed,
/// re-publishing a path overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionIndex {
    values: BTreeMap<String, f64>,
}

impl SubstitutionIndex {
    pub fn new() -> Self {
        SubstitutionIndex {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<f64> {
        self.values.get(path).copied()
    }

    pub fn get_or_zero(&self, path: &str) -> f64 {
        self.get(path).unwrap_or(0.0)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    /// A new index with `entries` merged in
    pub fn merged(mut self, entries: IndexEntries) -> Self {
        self.values.extend(entries.values);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> BTreeMap<String, f64> {
        self.values
    }
}

impl VariableLookup for SubstitutionIndex {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.get(path)
    }
}

/// The index with `entries` visible on top, without merging
///
/// Lets a stage evaluate formulas against values it has published itself.
pub struct Layered<'a> {
    pub index: &'a SubstitutionIndex,
    pub entries: &'a IndexEntries,
}

impl VariableLookup for Layered<'_> {
    fn lookup(&self, path: &str) -> Option<f64> {
        self.entries.get(path).or_else(|| self.index.get(path))
    }
}
