//! Race - Racial traits and size

use crate::entity::ChangeSet;
use crate::source::ChangeSource;
use crate::types::{OriginType, SizeCategory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: SizeCategory,
    #[serde(flatten)]
    pub content: ChangeSet,
}

impl Race {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size: SizeCategory) -> Self {
        Race {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            size,
            content: ChangeSet::default(),
        }
    }

    pub fn with_content(mut self, content: ChangeSet) -> Self {
        self.content = content;
        self
    }
}

impl ChangeSource for Race {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn origin_type(&self) -> OriginType {
        OriginType::Race
    }

    fn priority(&self) -> i32 {
        -100
    }

    fn content(&self) -> &ChangeSet {
        &self.content
    }

    fn is_special_feature(&self) -> bool {
        true
    }
}
