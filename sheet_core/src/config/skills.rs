//! Skill catalogue loading

use super::ConfigError;
use crate::types::Ability;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One skill the sheet can report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    /// Ability whose modifier keys this skill
    pub ability: Ability,
    /// Unusable without at least one rank
    #[serde(default)]
    pub trained_only: bool,
}

/// Ordered list of skills known to the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillCatalogue {
    #[serde(rename = "skills")]
    pub skills: Vec<SkillDefinition>,
}

impl SkillCatalogue {
    pub fn get(&self, id: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|skill| skill.id == id)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        for (index, skill) in self.skills.iter().enumerate() {
            if self.skills[..index].iter().any(|other| other.id == skill.id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate skill id '{}'",
                    skill.id
                )));
            }
        }
        Ok(self)
    }
}

/// Load a skill catalogue from a TOML file
pub fn load_skill_catalogue(path: &Path) -> Result<SkillCatalogue, ConfigError> {
    let catalogue: SkillCatalogue = super::load_toml(path)?;
    catalogue.validate()
}

/// Load a skill catalogue from a TOML string
pub fn parse_skill_catalogue(content: &str) -> Result<SkillCatalogue, ConfigError> {
    let catalogue: SkillCatalogue = super::parse_toml(content)?;
    catalogue.validate()
}

/// Get the default skill catalogue
pub fn default_skills() -> SkillCatalogue {
    let toml = include_str!("../../config/skills.toml");
    parse_skill_catalogue(toml).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "embedded skill catalogue failed to parse");
        SkillCatalogue::default()
    })
}
