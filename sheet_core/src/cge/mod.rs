//! Capability management - known/prepared/limited-use configurations (spell slots and kin)
//!
//! A [`CgeConfig`] is declared by an entity (usually a class) as a special
//! change. At compile time it expands into custom variable definitions for
//! every slot and known-limit cell; the pipeline's CGE stage then reads the
//! final variable values back and assembles a [`CalculatedCge`].

mod calculate;
mod compile;

pub use calculate::calculate_cge;
pub use compile::{compile_cge_variables, config_class_level};

use crate::changes::ResourceDefinition;
use crate::formula::Formula;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Values per entity level, keyed by class level
///
/// `{1: [3, 1]}` means a level 1 character has 3 level-0 and 1 level-1 slot.
pub type LevelTable = BTreeMap<u32, Vec<u32>>;

/// Serde helpers for maps keyed by level
///
/// Internally tagged enums and flattened fields buffer their input, and the
/// buffered JSON object keys only deserialize as strings.
mod level_keys {
    use serde::de::{Deserialize, Deserializer, Error};
    use std::collections::BTreeMap;

    fn parse_keys<V, E: Error>(raw: BTreeMap<String, V>) -> Result<BTreeMap<u32, V>, E> {
        raw.into_iter()
            .map(|(key, value)| match key.trim().parse::<u32>() {
                Ok(level) => Ok((level, value)),
                Err(_) => Err(E::custom(format!("invalid level key {:?}", key))),
            })
            .collect()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<u32, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        parse_keys(BTreeMap::<String, V>::deserialize(deserializer)?)
    }

    pub fn optional<'de, D, V>(deserializer: D) -> Result<Option<BTreeMap<u32, V>>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        Option::<BTreeMap<String, V>>::deserialize(deserializer)?
            .map(parse_keys)
            .transpose()
    }
}

/// Row used for `level`: the greatest key not above `level`, after clamping
/// `level` into the table's key range
pub fn table_row(table: &LevelTable, level: u32) -> Option<&Vec<u32>> {
    let min = *table.keys().next()?;
    let max = *table.keys().next_back()?;
    let clamped = level.clamp(min, max);
    table.range(..=clamped).next_back().map(|(_, row)| row)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshType {
    #[default]
    Daily,
    Encounter,
    Manual,
    Never,
}

/// How many entities the character may know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownConfig {
    /// A book without limit
    Unlimited,
    /// Known entities per entity level
    LimitedPerEntityLevel {
        #[serde(deserialize_with = "level_keys::deserialize")]
        table: LevelTable,
    },
    /// A single total across entity levels, from a table (first column) or a formula
    LimitedTotal {
        #[serde(default, deserialize_with = "level_keys::optional")]
        table: Option<LevelTable>,
        #[serde(default)]
        formula: Option<Formula>,
    },
}

impl KnownConfig {
    pub fn is_limited(&self) -> bool {
        !matches!(self, KnownConfig::Unlimited)
    }
}

/// What a track consumes when an entity is used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceConfig {
    /// At will
    None,
    Slots {
        #[serde(deserialize_with = "level_keys::deserialize")]
        table: LevelTable,
        /// Variable whose `.level.<n>` entries add slots (e.g. `@bonusSpells`)
        #[serde(default)]
        bonus_variable: Option<String>,
        #[serde(default)]
        refresh: RefreshType,
    },
    Pool {
        /// Id of a resource declared in [`CgeConfig::resources`]
        resource_id: String,
        #[serde(default)]
        refresh: RefreshType,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListStructure {
    /// One list regardless of entity level
    Global,
    PerLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreparationConfig {
    None,
    /// Entities are prepared into individual slots
    Bound,
    /// An independent prepared list
    List {
        structure: ListStructure,
        #[serde(default)]
        max_formula: Option<Formula>,
        #[serde(default, deserialize_with = "level_keys::optional")]
        max_per_level: Option<LevelTable>,
        #[serde(default)]
        consume_on_use: bool,
        #[serde(default)]
        recovery: Option<RefreshType>,
    },
}

/// One independent lane of preparation and use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub resource: ResourceConfig,
    pub preparation: PreparationConfig,
}

/// Names of the variables a configuration publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablesConfig {
    /// Prefix for slot and known variables: `wizard.spell` -> `wizard.spell.slot.1.max`
    pub class_prefix: String,
    /// Caster level variable for this configuration
    pub caster_level_var: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgeConfig {
    pub id: String,
    /// Class (or race, for innate abilities) whose levels drive this configuration
    pub class_id: String,
    /// Entity type managed: spell, power, maneuver...
    pub entity_type: String,
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
    #[serde(default)]
    pub known: Option<KnownConfig>,
    pub tracks: Vec<Track>,
    pub variables: VariablesConfig,
    /// Whether a higher-level slot may be spent on a lower-level entity
    #[serde(default)]
    pub overcast: bool,
}

/// The five interchangeable management models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CgeMode {
    UsesPerEntity,
    PreparedByLevel,
    Spontaneous,
    GloballyPrepared,
    AllAccess,
}

impl CgeConfig {
    pub fn mode(&self) -> CgeMode {
        let preparations = || self.tracks.iter().map(|t| &t.preparation);

        if preparations().any(|p| {
            matches!(
                p,
                PreparationConfig::Bound
                    | PreparationConfig::List {
                        structure: ListStructure::PerLevel,
                        ..
                    }
            )
        }) {
            return CgeMode::PreparedByLevel;
        }
        if preparations().any(|p| {
            matches!(
                p,
                PreparationConfig::List {
                    structure: ListStructure::Global,
                    ..
                }
            )
        }) {
            return CgeMode::GloballyPrepared;
        }

        let all_at_will = self
            .tracks
            .iter()
            .all(|t| matches!(t.resource, ResourceConfig::None));
        if all_at_will && !self.tracks.is_empty() {
            return CgeMode::UsesPerEntity;
        }
        if self.known.as_ref().is_some_and(KnownConfig::is_limited) {
            return CgeMode::Spontaneous;
        }
        CgeMode::AllAccess
    }

    pub fn slot_max_var(&self, level: usize) -> String {
        format!("{}.slot.{}.max", self.variables.class_prefix, level)
    }

    pub fn slot_current_var(&self, level: usize) -> String {
        format!("{}.slot.{}.current", self.variables.class_prefix, level)
    }

    pub fn known_max_var(&self, level: usize) -> String {
        format!("{}.known.{}.max", self.variables.class_prefix, level)
    }

    pub fn known_total_var(&self) -> String {
        format!("{}.known.total.max", self.variables.class_prefix)
    }

    pub fn prepared_max_var(&self) -> String {
        format!("{}.preparedMax", self.variables.class_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CgeConfigError {
    #[error("configuration has no tracks")]
    NoTracks,
    #[error("track '{0}': bound preparation requires slot resources")]
    BoundWithoutSlots(String),
    #[error("track '{0}': list consumed on use requires a recovery")]
    ConsumeWithoutRecovery(String),
    #[error("track '{0}': global list requires max_formula")]
    MissingMaxFormula(String),
    #[error("track '{0}': per-level list requires max_per_level")]
    MissingMaxPerLevel(String),
    #[error("track '{track}': pool resource '{resource_id}' is not declared")]
    UnknownPoolResource { track: String, resource_id: String },
}

/// Check that a configuration is internally coherent
pub fn validate_cge_config(config: &CgeConfig) -> Result<(), CgeConfigError> {
    if config.tracks.is_empty() {
        return Err(CgeConfigError::NoTracks);
    }

    for track in &config.tracks {
        match (&track.preparation, &track.resource) {
            (PreparationConfig::Bound, ResourceConfig::Slots { .. }) => {}
            (PreparationConfig::Bound, _) => {
                return Err(CgeConfigError::BoundWithoutSlots(track.id.clone()))
            }
            (
                PreparationConfig::List {
                    structure,
                    max_formula,
                    max_per_level,
                    consume_on_use,
                    recovery,
                },
                _,
            ) => {
                if *consume_on_use && recovery.is_none() {
                    return Err(CgeConfigError::ConsumeWithoutRecovery(track.id.clone()));
                }
                match structure {
                    ListStructure::Global if max_formula.is_none() => {
                        return Err(CgeConfigError::MissingMaxFormula(track.id.clone()))
                    }
                    ListStructure::PerLevel if max_per_level.is_none() => {
                        return Err(CgeConfigError::MissingMaxPerLevel(track.id.clone()))
                    }
                    _ => {}
                }
            }
            (PreparationConfig::None, _) => {}
        }

        if let ResourceConfig::Pool { resource_id, .. } = &track.resource {
            if !config.resources.iter().any(|r| &r.resource_id == resource_id) {
                return Err(CgeConfigError::UnknownPoolResource {
                    track: track.id.clone(),
                    resource_id: resource_id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Computed state of one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedCge {
    pub id: String,
    pub class_id: String,
    pub entity_type: String,
    pub mode: CgeMode,
    pub class_level: u32,
    pub caster_level: f64,
    pub known_limits: Vec<KnownLimit>,
    pub tracks: Vec<CalculatedTrack>,
    /// Total prepared entities for list preparation with a global structure
    pub prepared_max: Option<f64>,
    pub overcast: bool,
}

/// Maximum known entities; `level` is `None` for a total across levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLimit {
    pub level: Option<u32>,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    None,
    Slots,
    Pool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreparationKind {
    None,
    Bound,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedTrack {
    pub id: String,
    pub label: Option<String>,
    pub resource_kind: ResourceKind,
    pub preparation_kind: PreparationKind,
    pub slots: Vec<CalculatedSlot>,
    pub pool: Option<CalculatedPool>,
    /// Prepared limits per entity level for per-level lists
    pub prepared_per_level: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedSlot {
    pub level: u32,
    pub max: f64,
    pub current: f64,
    /// Extra slots from the bonus variable, included in `max`
    pub bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedPool {
    pub resource_id: String,
    pub max: f64,
    pub current: f64,
}

/// Persisted player-facing consumption state of one configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CgeState {
    /// Remaining slots keyed by entity level
    #[serde(default, deserialize_with = "level_keys::deserialize")]
    pub slot_current_values: BTreeMap<u32, f64>,
    #[serde(default)]
    pub pool_current_value: Option<f64>,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::changes::SpecialChange;

    #[test]
    fn test_table_row_clamps_and_falls_back() {
        let table: LevelTable = [(1, vec![1]), (3, vec![3]), (5, vec![5])].into_iter().collect();
        assert_eq!(table_row(&table, 0), Some(&vec![1]));
        assert_eq!(table_row(&table, 2), Some(&vec![1]));
        assert_eq!(table_row(&table, 4), Some(&vec![3]));
        assert_eq!(table_row(&table, 20), Some(&vec![5]));
        assert_eq!(table_row(&LevelTable::new(), 3), None);
    }

    #[test]
    fn test_modes() {
        assert_eq!(sorcerer().mode(), CgeMode::Spontaneous);
        assert_eq!(wizard().mode(), CgeMode::PreparedByLevel);
        assert_eq!(psion().mode(), CgeMode::Spontaneous);

        let mut warlock = psion();
        warlock.tracks[0].resource = ResourceConfig::None;
        assert_eq!(warlock.mode(), CgeMode::UsesPerEntity);

        let mut wizard_5e = wizard();
        wizard_5e.tracks[0].preparation = PreparationConfig::List {
            structure: ListStructure::Global,
            max_formula: Some("@class.wizard.level + @ability.intelligence.modifier".into()),
            max_per_level: None,
            consume_on_use: false,
            recovery: None,
        };
        assert_eq!(wizard_5e.mode(), CgeMode::GloballyPrepared);

        let mut cleric_list = sorcerer();
        cleric_list.known = None;
        assert_eq!(cleric_list.mode(), CgeMode::AllAccess);
    }

    #[test]
    fn test_validate_accepts_fixtures() {
        assert!(validate_cge_config(&sorcerer()).is_ok());
        assert!(validate_cge_config(&wizard()).is_ok());
        assert!(validate_cge_config(&psion()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bound_without_slots() {
        let mut config = wizard();
        config.tracks[0].resource = ResourceConfig::None;
        assert_eq!(
            validate_cge_config(&config),
            Err(CgeConfigError::BoundWithoutSlots("base".into()))
        );
    }

    #[test]
    fn test_validate_list_rules() {
        let mut config = wizard();
        config.tracks[0].preparation = PreparationConfig::List {
            structure: ListStructure::Global,
            max_formula: Some("3".into()),
            max_per_level: None,
            consume_on_use: true,
            recovery: None,
        };
        assert_eq!(
            validate_cge_config(&config),
            Err(CgeConfigError::ConsumeWithoutRecovery("base".into()))
        );

        config.tracks[0].preparation = PreparationConfig::List {
            structure: ListStructure::Global,
            max_formula: None,
            max_per_level: None,
            consume_on_use: false,
            recovery: None,
        };
        assert_eq!(
            validate_cge_config(&config),
            Err(CgeConfigError::MissingMaxFormula("base".into()))
        );

        config.tracks[0].preparation = PreparationConfig::List {
            structure: ListStructure::PerLevel,
            max_formula: None,
            max_per_level: None,
            consume_on_use: false,
            recovery: None,
        };
        assert_eq!(
            validate_cge_config(&config),
            Err(CgeConfigError::MissingMaxPerLevel("base".into()))
        );
    }

    #[test]
    fn test_validate_pool_resource_must_exist() {
        let mut config = psion();
        config.resources.clear();
        assert!(matches!(
            validate_cge_config(&config),
            Err(CgeConfigError::UnknownPoolResource { .. })
        ));
    }

    #[test]
    fn test_deserialize_config() {
        let json = r#"{
            "id": "sorcerer-spells",
            "class_id": "sorcerer",
            "entity_type": "spell",
            "known": {"type": "LIMITED_PER_ENTITY_LEVEL", "table": {"1": [4, 2]}},
            "tracks": [{
                "id": "base",
                "resource": {"type": "SLOTS", "table": {"1": [5, 3]}, "refresh": "daily"},
                "preparation": {"type": "NONE"}
            }],
            "variables": {"class_prefix": "sorcerer.spell", "caster_level_var": "casterLevel.sorcerer"}
        }"#;
        let config: CgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode(), CgeMode::Spontaneous);
        assert!(!config.overcast);
        assert_eq!(
            config.known,
            Some(KnownConfig::LimitedPerEntityLevel {
                table: [(1, vec![4, 2])].into_iter().collect()
            })
        );
        assert!(matches!(
            &config.tracks[0].resource,
            ResourceConfig::Slots { table, .. } if table.get(&1) == Some(&vec![5, 3])
        ));
    }

    #[test]
    fn test_deserialize_pool_and_known_total_table() {
        let json = r#"{
            "id": "psion-powers",
            "class_id": "psion",
            "entity_type": "power",
            "resources": [{"resource_id": "powerPoints", "name": "Power Points", "max_value_formula": "2"}],
            "known": {"type": "LIMITED_TOTAL", "table": {"1": [3], "2": [5]}},
            "tracks": [{
                "id": "base",
                "resource": {"type": "POOL", "resource_id": "powerPoints"},
                "preparation": {"type": "NONE"}
            }],
            "variables": {"class_prefix": "psion.power", "caster_level_var": "manifesterLevel.psion"}
        }"#;
        let config: CgeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.known,
            Some(KnownConfig::LimitedTotal {
                table: Some([(1, vec![3]), (2, vec![5])].into_iter().collect()),
                formula: None,
            })
        );
        assert_eq!(
            config.tracks[0].resource,
            ResourceConfig::Pool { resource_id: "powerPoints".into(), refresh: RefreshType::Daily }
        );
        assert!(validate_cge_config(&config).is_ok());
    }

    #[test]
    fn test_deserialize_per_level_list_and_state() {
        let preparation: PreparationConfig = serde_json::from_str(
            r#"{"type": "LIST", "structure": "PER_LEVEL", "max_per_level": {"1": [2, 1], "3": [3, 2]}}"#,
        )
        .unwrap();
        let PreparationConfig::List { max_per_level: Some(table), .. } = preparation else {
            panic!("expected a per-level list");
        };
        assert_eq!(table_row(&table, 2), Some(&vec![2, 1]));

        let state: CgeState =
            serde_json::from_str(r#"{"slot_current_values": {"0": 3, "1": 1.5}}"#).unwrap();
        assert_eq!(state.slot_current_values.get(&1), Some(&1.5));
        assert_eq!(state.pool_current_value, None);
    }

    #[test]
    fn test_deserialize_through_special_change() {
        let json = r#"{
            "type": "cge_definition",
            "id": "sorcerer-spells",
            "class_id": "sorcerer",
            "entity_type": "spell",
            "known": {"type": "LIMITED_TOTAL", "formula": "@class.sorcerer.level + 1"},
            "tracks": [{
                "id": "base",
                "resource": {"type": "SLOTS", "table": {"1": [5, 3], "2": [6, 4]}},
                "preparation": {"type": "NONE"}
            }],
            "variables": {"class_prefix": "sorcerer.spell", "caster_level_var": "casterLevel.sorcerer"}
        }"#;
        let special: SpecialChange = serde_json::from_str(json).unwrap();
        let SpecialChange::CgeDefinition(config) = special else {
            panic!("expected a capability definition");
        };
        assert!(matches!(
            &config.tracks[0].resource,
            ResourceConfig::Slots { table, .. } if table.len() == 2
        ));
    }

    #[test]
    fn test_non_numeric_level_key_rejected() {
        let result: Result<ResourceConfig, _> =
            serde_json::from_str(r#"{"type": "SLOTS", "table": {"first": [1]}}"#);
        let message = result.unwrap_err().to_string();
        assert!(message.contains("invalid level key"), "{}", message);
    }
}
