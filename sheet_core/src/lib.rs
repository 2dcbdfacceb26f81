//! sheet_core - Character sheet calculation engine for tabletop role-playing characters
//!
//! This library provides:
//! - CharacterBaseData: The raw build (scores, classes, feats, items, buffs, entities)
//! - Compendiums: Content-pack resolution and ad-hoc entity validation
//! - Changes: Typed bonuses with stacking rules and an audit breakdown per statistic
//! - Formulas: Variable substitution and dice expressions with an injected roller
//! - Pipeline: Ordered stages folding a substitution index into a CharacterSheet
//! - CGE: Known/prepared/limited-use capability configurations (spell slots and kin)

pub mod calculate;
pub mod cge;
pub mod changes;
pub mod character;
pub mod compendium;
pub mod config;
pub mod entity;
pub mod formula;
pub mod pipeline;
pub mod prelude;
pub mod sheet;
pub mod source;
pub mod types;

// Re-export core types for convenience
pub use calculate::{
    calculate_character_sheet, calculate_with_defaults, CalculationContext, CalculationError,
    CalculationOptions,
};
pub use cge::{validate_cge_config, CalculatedCge, CgeConfig, CgeConfigError, CgeMode};
pub use changes::{aggregate_sources, Change, ChangeKind, Source, SourceValue, SourceValueSum};
pub use character::{AbilityScore, CharacterBaseData, CharacterClass, LevelEntry, SkillRanks};
pub use compendium::{resolve_compendiums, validate_custom_entities, Compendium, CompendiumContext};
pub use config::{default_skills, EngineConstants, SkillCatalogue};
pub use entity::{compile_entities, Entity};
pub use formula::{DiceRoller, Formula, FormulaError};
pub use sheet::{CharacterSheet, Warning};
pub use source::{Buff, ChangeSource, ClassFeature, Feat, Item, Race};
pub use types::{Ability, BonusType, OriginType, SaveKind, SizeCategory};
