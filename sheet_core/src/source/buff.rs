//! Buff - Temporary effects such as spells cast on the character

use crate::entity::ChangeSet;
use crate::source::ChangeSource;
use crate::types::OriginType;
use serde::{Deserialize, Serialize};

/// A temporary buff or debuff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    /// Buff identifier
    pub id: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Whether the buff is currently applied
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(flatten)]
    pub content: ChangeSet,
}

fn default_active() -> bool {
    true
}

impl Buff {
    /// Create a new, active buff with no modifications
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Buff {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            active: true,
            content: ChangeSet::default(),
        }
    }

    pub fn with_content(mut self, content: ChangeSet) -> Self {
        self.content = content;
        self
    }

    /// Toggle the buff
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

impl ChangeSource for Buff {
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
        OriginType::Buff
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn priority(&self) -> i32 {
        200
    }

    fn content(&self) -> &ChangeSet {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buff_defaults_active() {
        let buff: Buff = serde_json::from_str(r#"{"id": "haste", "name": "Haste"}"#).unwrap();
        assert!(buff.is_active());
    }

    #[test]
    fn test_inactive_buff() {
        let mut buff = Buff::new("rage", "Rage");
        buff.set_active(false);
        assert!(!buff.is_active());
        assert_eq!(buff.priority(), 200);
    }
}
