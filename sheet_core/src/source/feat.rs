//! Feat - Learned feats

use crate::entity::ChangeSet;
use crate::source::ChangeSource;
use crate::types::OriginType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feat {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub content: ChangeSet,
}

impl Feat {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Feat {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            content: ChangeSet::default(),
        }
    }

    pub fn with_content(mut self, content: ChangeSet) -> Self {
        self.content = content;
        self
    }
}

impl ChangeSource for Feat {
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
        OriginType::Feat
    }

    fn content(&self) -> &ChangeSet {
        &self.content
    }

    fn is_special_feature(&self) -> bool {
        true
    }
}
