//! Item - Modifications from owned and equipped items

use crate::entity::ChangeSet;
use crate::source::ChangeSource;
use crate::types::OriginType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorKind {
    Armor,
    Shield,
}

/// Defensive values of a suit of armor or a shield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmorData {
    pub kind: ArmorKind,
    pub armor_bonus: i32,
    #[serde(default)]
    pub enhancement: i32,
    /// Cap on the Dexterity bonus to armor class
    #[serde(default)]
    pub max_dex: Option<i32>,
}

impl ArmorData {
    pub fn total_bonus(&self) -> i32 {
        self.armor_bonus + self.enhancement
    }
}

/// An owned item; only equipped items contribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_equipped")]
    pub equipped: bool,
    #[serde(default)]
    pub armor: Option<ArmorData>,
    #[serde(flatten)]
    pub content: ChangeSet,
}

fn default_equipped() -> bool {
    true
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            equipped: true,
            armor: None,
            content: ChangeSet::default(),
        }
    }

    pub fn with_content(mut self, content: ChangeSet) -> Self {
        self.content = content;
        self
    }

    pub fn with_armor(mut self, armor: ArmorData) -> Self {
        self.armor = Some(armor);
        self
    }

    /// Armor data when the item is equipped
    pub fn equipped_armor(&self) -> Option<&ArmorData> {
        self.armor.as_ref().filter(|_| self.equipped)
    }
}

impl ChangeSource for Item {
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
        OriginType::Item
    }

    fn is_active(&self) -> bool {
        self.equipped
    }

    fn priority(&self) -> i32 {
        100
    }

    fn content(&self) -> &ChangeSet {
        &self.content
    }
}
