//! Hit points stage

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{HitPointsSheet, SheetPatch};
use crate::types::{Ability, BonusType};
use std::collections::BTreeMap;

/// Hit points rolled per class, in first-taken order
///
/// The first character level takes the maximum of its die; later unrolled
/// levels take half the die plus one.
fn hit_die_totals(ctx: &StageContext<'_>) -> Vec<(String, String, u32)> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    let mut order: Vec<(String, String)> = Vec::new();
    let mut first = true;

    for entry in ctx.base.level_entries() {
        let Some(class) = ctx.base.class(&entry.class_id) else {
            continue;
        };
        let rolled = match entry.hit_die_roll {
            Some(roll) => roll.min(class.hit_die),
            None if first => class.hit_die,
            None => class.hit_die / 2 + 1,
        };
        first = false;

        if !totals.contains_key(&class.id) {
            order.push((class.id.clone(), class.name.clone()));
        }
        let total = totals.entry(class.id.clone()).or_insert(0);
        *total = total.saturating_add(rolled);
    }

    order
        .into_iter()
        .map(|(id, name)| {
            let total = totals.get(&id).copied().unwrap_or(0);
            (id, name, total)
        })
        .collect()
}

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let level = index.get_or_zero("level");
    let con_modifier = ctx.ability_modifier(index, Ability::Constitution);

    let mut sources: Vec<Source> = hit_die_totals(ctx)
        .into_iter()
        .map(|(id, name, total)| Source::new(total as f64, format!("{} hit dice", name), BonusType::Base, id))
        .collect();
    sources.push(Source::new(
        level * con_modifier,
        "Constitution",
        BonusType::Base,
        "constitution",
    ));
    sources.extend(ctx.sources_for("hp.max", index, &mut warnings));
    let max = ctx.aggregate(sources);

    let mut temporary_sources = vec![Source::base(ctx.base.temporary_hp, "Temporary hit points")];
    temporary_sources.extend(ctx.sources_for("hp.temporary", index, &mut warnings));
    let temporary = ctx.aggregate(temporary_sources);

    let current = match ctx.base.custom_current_hp {
        Some(custom) => custom.min(max.total),
        None => max.total - ctx.base.current_damage,
    };
    let rest_healing = level + con_modifier;

    let mut entries = IndexEntries::new();
    entries.set("hp.max", max.total);
    entries.set("hp.current", current);
    entries.set("hp.temporary", temporary.total);
    entries.set("hp.restHealing", rest_healing);

    StageOutput {
        patch: SheetPatch::HitPoints(HitPointsSheet {
            max,
            current,
            temporary,
            damage: ctx.base.current_damage,
            rest_healing,
        }),
        entries,
        warnings,
    }
}
