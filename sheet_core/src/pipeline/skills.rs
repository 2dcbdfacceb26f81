//! Skills stage

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{SheetPatch, SkillSheet};
use crate::types::BonusType;
use std::collections::BTreeMap;

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let mut entries = IndexEntries::new();
    let mut skills = BTreeMap::new();

    for skill in &ctx.skills.skills {
        let ranks = ctx
            .base
            .skill_ranks
            .get(&skill.id)
            .map(|r| r.effective())
            .unwrap_or(0);
        let class_skill = ctx.base.is_class_skill(&skill.id);

        let mut sources = vec![
            Source::new(
                ctx.ability_modifier(index, skill.ability),
                skill.ability.display_name(),
                BonusType::Base,
                skill.ability.key(),
            ),
            Source::new(ranks as f64, "Ranks", BonusType::Base, "ranks"),
        ];
        if class_skill && ranks >= 1 {
            sources.push(Source::new(
                ctx.constants.skills.class_skill_bonus as f64,
                "Class skill",
                BonusType::Base,
                "class_skill",
            ));
        }
        sources.extend(ctx.sources_for(&format!("skills.{}", skill.id), index, &mut warnings));
        sources.extend(ctx.sources_for(
            &format!("abilitySkills.{}", skill.ability.key()),
            index,
            &mut warnings,
        ));
        let total = ctx.aggregate(sources);

        entries.set(format!("skills.{}.total", skill.id), total.total);
        entries.set(format!("skills.{}.ranks", skill.id), ranks as f64);

        skills.insert(
            skill.id.clone(),
            SkillSheet {
                name: skill.name.clone(),
                ability: skill.ability,
                ranks,
                class_skill,
                usable: !skill.trained_only || ranks > 0,
                total,
            },
        );
    }

    StageOutput {
        patch: SheetPatch::Skills(skills),
        entries,
        warnings,
    }
}
