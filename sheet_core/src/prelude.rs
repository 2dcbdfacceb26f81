//! Prelude module for convenient imports
//!
//! ```rust
//! use sheet_core::prelude::*;
//! ```

// Calculation
pub use crate::calculate::{calculate_character_sheet, CalculationContext, CalculationOptions};
pub use crate::sheet::{CharacterSheet, Warning};

// Base data
pub use crate::character::{AbilityScore, CharacterBaseData, CharacterClass, LevelEntry, SkillRanks};
pub use crate::types::{Ability, BabProgression, BonusType, SaveKind, SaveProgression, SizeCategory};

// Changes
pub use crate::changes::{Change, ChangeKind, SourceValueSum};

// Sources
pub use crate::source::{ArmorData, ArmorKind, Buff, ChangeSource, ClassFeature, Feat, Item, Race};

// Content
pub use crate::compendium::{resolve_compendiums, Compendium};
pub use crate::entity::{Entity, EntityInstance};

// Config
pub use crate::config::{default_skills, EngineConstants};
