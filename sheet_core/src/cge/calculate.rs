//! CGE stage - assembles capacities from the generated variables

use super::{
    config_class_level, table_row, validate_cge_config, CalculatedCge, CalculatedPool,
    CalculatedSlot, CalculatedTrack, CgeConfig, CgeState, KnownConfig, KnownLimit, ListStructure,
    PreparationConfig, PreparationKind, ResourceConfig, ResourceKind, Track,
};
use crate::changes::SpecialChange;
use crate::pipeline::resources::evaluate_resource;
use crate::pipeline::{IndexEntries, Layered, StageContext, StageOutput, SubstitutionIndex};
use crate::sheet::{record, SheetPatch, Warning};
use std::collections::BTreeMap;

/// Final value of a generated variable, or the table value when it was never published
fn variable_value(index: &SubstitutionIndex, variable: &str, fallback: f64) -> f64 {
    index
        .get(&format!("customVariable.{}", variable))
        .unwrap_or(fallback)
}

/// Extra slots at `entity_level` granted by the track's bonus variable
fn slot_bonus(index: &SubstitutionIndex, bonus_variable: Option<&String>, entity_level: usize) -> f64 {
    let Some(variable) = bonus_variable else {
        return 0.0;
    };
    if entity_level == 0 {
        return 0.0;
    }
    let path = format!("{}.level.{}", variable.trim_start_matches('@'), entity_level);
    index
        .get(&path)
        .or_else(|| index.get(&format!("customVariable.{}", path)))
        .unwrap_or(0.0)
}

struct Calculation<'c, 'a> {
    ctx: &'c StageContext<'a>,
    index: &'c SubstitutionIndex,
    config: &'c CgeConfig,
    state: Option<&'a CgeState>,
    level: u32,
}

impl Calculation<'_, '_> {
    fn slots(
        &self,
        table: &super::LevelTable,
        bonus_variable: Option<&String>,
        publish_variables: bool,
        entries: &mut IndexEntries,
    ) -> Vec<CalculatedSlot> {
        let Some(row) = table_row(table, self.level) else {
            return Vec::new();
        };

        row.iter()
            .enumerate()
            .map(|(entity_level, table_value)| {
                let base = if publish_variables {
                    variable_value(self.index, &self.config.slot_max_var(entity_level), f64::from(*table_value))
                } else {
                    f64::from(*table_value)
                };
                let bonus = slot_bonus(self.index, bonus_variable, entity_level);
                let max = base + bonus;
                let current = self
                    .state
                    .and_then(|s| s.slot_current_values.get(&(entity_level as u32)))
                    .map(|v| v.max(0.0).min(max))
                    .unwrap_or(max);

                if publish_variables {
                    entries.set(self.config.slot_max_var(entity_level), max);
                    entries.set(self.config.slot_current_var(entity_level), current);
                }
                CalculatedSlot {
                    level: entity_level as u32,
                    max,
                    current,
                    bonus,
                }
            })
            .collect()
    }

    fn pool(&self, resource_id: &str, warnings: &mut Vec<Warning>) -> Option<CalculatedPool> {
        let definition = self
            .config
            .resources
            .iter()
            .find(|r| r.resource_id == resource_id)?;
        let persisted = self.state.and_then(|s| s.pool_current_value);
        let resource = evaluate_resource(self.ctx, self.index, definition, persisted, warnings);
        Some(CalculatedPool {
            resource_id: resource_id.to_string(),
            max: resource.max,
            current: resource.current,
        })
    }

    fn track(
        &self,
        track: &Track,
        first_slot_track: bool,
        entries: &mut IndexEntries,
        warnings: &mut Vec<Warning>,
    ) -> CalculatedTrack {
        let (resource_kind, slots, pool) = match &track.resource {
            ResourceConfig::None => (ResourceKind::None, Vec::new(), None),
            ResourceConfig::Slots {
                table,
                bonus_variable,
                ..
            } => (
                ResourceKind::Slots,
                self.slots(table, bonus_variable.as_ref(), first_slot_track, entries),
                None,
            ),
            ResourceConfig::Pool { resource_id, .. } => {
                (ResourceKind::Pool, Vec::new(), self.pool(resource_id, warnings))
            }
        };

        let (preparation_kind, prepared_per_level) = match &track.preparation {
            PreparationConfig::None => (PreparationKind::None, Vec::new()),
            PreparationConfig::Bound => (PreparationKind::Bound, Vec::new()),
            PreparationConfig::List {
                structure: ListStructure::PerLevel,
                max_per_level: Some(table),
                ..
            } => (
                PreparationKind::List,
                table_row(table, self.level).cloned().unwrap_or_default(),
            ),
            PreparationConfig::List { .. } => (PreparationKind::List, Vec::new()),
        };

        CalculatedTrack {
            id: track.id.clone(),
            label: track.label.clone(),
            resource_kind,
            preparation_kind,
            slots,
            pool,
            prepared_per_level,
        }
    }

    fn known_limits(&self, entries: &mut IndexEntries) -> Vec<KnownLimit> {
        match &self.config.known {
            Some(KnownConfig::LimitedPerEntityLevel { table }) => table_row(table, self.level)
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .map(|(entity_level, known)| {
                            let variable = self.config.known_max_var(entity_level);
                            let max = variable_value(self.index, &variable, f64::from(*known));
                            entries.set(variable, max);
                            KnownLimit {
                                level: Some(entity_level as u32),
                                max,
                            }
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Some(KnownConfig::LimitedTotal { .. }) => {
                let variable = self.config.known_total_var();
                match self.index.get(&format!("customVariable.{}", variable)) {
                    Some(max) => {
                        entries.set(variable, max);
                        vec![KnownLimit { level: None, max }]
                    }
                    None => Vec::new(),
                }
            }
            Some(KnownConfig::Unlimited) | None => Vec::new(),
        }
    }

    fn calculate(&self, entries: &mut IndexEntries, warnings: &mut Vec<Warning>) -> CalculatedCge {
        let caster_level = variable_value(
            self.index,
            &self.config.variables.caster_level_var,
            f64::from(self.level),
        );
        entries.set(self.config.variables.caster_level_var.clone(), caster_level);

        let first_slot_track = self
            .config
            .tracks
            .iter()
            .position(|t| matches!(t.resource, ResourceConfig::Slots { .. }));
        let tracks = self
            .config
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| self.track(track, first_slot_track == Some(i), entries, warnings))
            .collect();

        let known_limits = self.known_limits(entries);

        let prepared_max = self.config.tracks.iter().find_map(|track| match &track.preparation {
            PreparationConfig::List {
                structure: ListStructure::Global,
                max_formula: Some(formula),
                ..
            } => Some(formula),
            _ => None,
        });
        let prepared_max = prepared_max.map(|formula| {
            let variable = self.config.prepared_max_var();
            let value = {
                let lookup = Layered {
                    index: self.index,
                    entries,
                };
                self.ctx
                    .evaluate(formula, &lookup, &variable, &self.config.id, warnings)
            };
            entries.set(variable, value);
            value
        });

        CalculatedCge {
            id: self.config.id.clone(),
            class_id: self.config.class_id.clone(),
            entity_type: self.config.entity_type.clone(),
            mode: self.config.mode(),
            class_level: self.level,
            caster_level,
            known_limits,
            tracks,
            prepared_max,
            overcast: self.config.overcast,
        }
    }
}

/// Compute every active configuration; inactive ones leave no entry
pub fn calculate_cge(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let mut entries = IndexEntries::new();
    let mut calculated = BTreeMap::new();
    let mut highest_caster_level: Option<f64> = None;

    for sourced in ctx.special_changes {
        let SpecialChange::CgeDefinition(config) = &sourced.special else {
            continue;
        };
        if let Err(error) = validate_cge_config(config) {
            record(
                &mut warnings,
                Warning::InvalidCgeConfig {
                    cge_id: config.id.clone(),
                    reason: error.to_string(),
                },
            );
            continue;
        }
        let level = config_class_level(config, ctx.base);
        if level == 0 {
            tracing::debug!(cge = %config.id, class = %config.class_id, "no levels, skipping");
            continue;
        }

        let calculation = Calculation {
            ctx,
            index,
            config,
            state: ctx.base.cge_state.get(&config.id),
            level,
        };
        let cge = calculation.calculate(&mut entries, &mut warnings);
        highest_caster_level = Some(highest_caster_level.map_or(cge.caster_level, |h| h.max(cge.caster_level)));
        calculated.insert(config.id.clone(), cge);
    }

    if let Some(caster_level) = highest_caster_level {
        entries.set("casterLevel", caster_level);
    }

    StageOutput {
        patch: SheetPatch::Cge(calculated),
        entries,
        warnings,
    }
}
