//! ClassFeature - Features granted by class levels

use crate::entity::ChangeSet;
use crate::source::ChangeSource;
use crate::types::OriginType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFeature {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Granting class, for display
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(flatten)]
    pub content: ChangeSet,
}

impl ClassFeature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        ClassFeature {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            class_id: None,
            content: ChangeSet::default(),
        }
    }

    pub fn with_content(mut self, content: ChangeSet) -> Self {
        self.content = content;
        self
    }
}

impl ChangeSource for ClassFeature {
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
        OriginType::ClassFeature
    }

    fn priority(&self) -> i32 {
        -50
    }

    fn content(&self) -> &ChangeSet {
        &self.content
    }

    fn is_special_feature(&self) -> bool {
        true
    }
}
