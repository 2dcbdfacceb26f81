//! Saving throws stage

use super::{save_path, IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::SheetPatch;
use crate::types::{BonusType, SaveKind};
use std::collections::BTreeMap;

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let mut entries = IndexEntries::new();
    let mut saves = BTreeMap::new();
    let class_levels = ctx.base.class_levels();

    for save in SaveKind::all() {
        let mut sources = Vec::new();
        for (class_id, level) in &class_levels {
            if let Some(class) = ctx.base.class(class_id) {
                let value = ctx.constants.progression.save(class.save_progression(*save), *level);
                sources.push(Source::new(value as f64, class.name.clone(), BonusType::Base, class_id.clone()));
            }
        }

        let ability = save.ability();
        sources.push(Source::new(
            ctx.ability_modifier(index, ability),
            ability.display_name(),
            BonusType::Base,
            ability.key(),
        ));
        sources.extend(ctx.sources_for(&format!("savingThrows.{}", save.key()), index, &mut warnings));
        sources.extend(ctx.sources_for("savingThrows.all", index, &mut warnings));

        let total = ctx.aggregate(sources);
        entries.set(save_path(*save), total.total);
        saves.insert(*save, total);
    }

    StageOutput {
        patch: SheetPatch::SavingThrows(saves),
        entries,
        warnings,
    }
}
