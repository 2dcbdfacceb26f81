//! Configuration - rule constants and the skill list, loadable from TOML
//!
//! Every table has a built-in default, so a calculation never needs a file
//! on disk. Files only override the defaults.

mod constants;
mod skills;

pub use constants::{
    AbilityConstants, ArmorClassConstants, EngineConstants, ProgressionConstants,
    SkillConstants, StackingConstants, TiePolicy,
};
pub use skills::{default_skills, load_skill_catalogue, parse_skill_catalogue, SkillCatalogue, SkillDefinition};

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Read a TOML file into `T`
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    parse_toml(&fs::read_to_string(path)?)
}

/// Deserialize TOML text into `T`
pub fn parse_toml<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(content)?)
}
