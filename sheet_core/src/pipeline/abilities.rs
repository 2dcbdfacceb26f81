//! Ability scores stage

use super::{IndexEntries, Layered, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{AbilitySheet, SheetPatch};
use crate::types::{Ability, BonusType};
use std::collections::BTreeMap;

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let mut entries = IndexEntries::new();
    let mut abilities = BTreeMap::new();

    for ability in Ability::all() {
        let base = ctx.base.ability(*ability);
        let variables = Layered { index, entries: &entries };

        let mut sources = vec![
            Source::base(base.score, "Base score"),
            Source::new(-base.drain, "Drain", BonusType::Untyped, "drain"),
            Source::new(-base.damage, "Damage", BonusType::Untyped, "damage"),
            Source::new(-base.penalty, "Penalty", BonusType::Untyped, "penalty"),
        ];
        sources.extend(ctx.sources_for(&ability.score_path(), &variables, &mut warnings));

        let mut score = ctx.aggregate(sources.clone());
        if score.total < 0.0 {
            // scores never drop below zero
            sources.push(Source::new(-score.total, "Minimum score", BonusType::Untyped, "minimum"));
            score = ctx.aggregate(sources);
        }
        let modifier = ctx.constants.abilities.modifier(score.total);

        let mut check_sources = vec![Source::new(
            modifier,
            format!("{} modifier", ability.display_name()),
            BonusType::Base,
            ability.key(),
        )];
        check_sources.extend(ctx.sources_for(
            &format!("ability.{}.check", ability.key()),
            &variables,
            &mut warnings,
        ));
        let check = ctx.aggregate(check_sources);

        entries.set(ability.score_path(), score.total);
        entries.set(ability.modifier_path(), modifier);
        entries.set(format!("ability.{}.check", ability.key()), check.total);

        abilities.insert(
            *ability,
            AbilitySheet {
                base_score: base.score,
                score,
                modifier,
                check,
            },
        );
    }

    StageOutput {
        patch: SheetPatch::Abilities(abilities),
        entries,
        warnings,
    }
}
