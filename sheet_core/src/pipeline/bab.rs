//! Base attack bonus stage, with the attack and combat maneuver summary

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{BaseAttackSheet, SheetPatch};
use crate::types::{Ability, BonusType};

/// Attack bonus of every attack in a full attack; the first is always present
pub fn iterative_attacks(bab: i32, step: i32, max_attacks: usize) -> Vec<i32> {
    let mut attacks = vec![bab];
    let mut next = bab - step;
    while next >= 1 && attacks.len() < max_attacks {
        attacks.push(next);
        next -= step;
    }
    attacks
}

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let progression = &ctx.constants.progression;

    let mut sources = Vec::new();
    for (class_id, level) in ctx.base.class_levels() {
        if let Some(class) = ctx.base.class(&class_id) {
            sources.push(Source::new(
                progression.bab(class.bab, level) as f64,
                class.name.clone(),
                BonusType::Base,
                class_id,
            ));
        }
    }
    sources.extend(ctx.sources_for("bab.total", index, &mut warnings));
    let total = ctx.aggregate(sources);
    let bab = total.total;

    let strength = ctx.ability_modifier(index, Ability::Strength);
    let dexterity = ctx.ability_modifier(index, Ability::Dexterity);
    let size_modifier = index.get_or_zero("size.modifier");
    let special_size = index.get_or_zero("size.specialModifier");

    let bab_source = || Source::new(bab, "Base attack bonus", BonusType::Base, "bab");
    let strength_source = || Source::new(strength, "Strength", BonusType::Base, "strength");
    let dexterity_source = || Source::new(dexterity, "Dexterity", BonusType::Dexterity, "dexterity");
    let attack_changes = ctx.sources_for("attack.total", index, &mut warnings);

    let mut melee_sources = vec![
        bab_source(),
        strength_source(),
        Source::new(size_modifier, "Size", BonusType::Size, "size"),
    ];
    melee_sources.extend(attack_changes.iter().cloned());
    let melee = ctx.aggregate(melee_sources);

    let mut ranged_sources = vec![
        bab_source(),
        dexterity_source(),
        Source::new(size_modifier, "Size", BonusType::Size, "size"),
    ];
    ranged_sources.extend(attack_changes);
    let ranged = ctx.aggregate(ranged_sources);

    let cmb = ctx.aggregate(vec![
        bab_source(),
        strength_source(),
        Source::new(special_size, "Special size", BonusType::Size, "size"),
    ]);
    let cmd = ctx.aggregate(vec![
        Source::base(ctx.constants.armor_class.base as f64, "Base"),
        bab_source(),
        strength_source(),
        dexterity_source(),
        Source::new(special_size, "Special size", BonusType::Size, "size"),
    ]);

    let iterative = iterative_attacks(
        bab as i32,
        progression.iterative_attack_step,
        progression.max_iterative_attacks,
    );

    let mut entries = IndexEntries::new();
    entries.set("bab.total", bab);
    entries.set("attack.melee.total", melee.total);
    entries.set("attack.ranged.total", ranged.total);
    entries.set("cmb.total", cmb.total);
    entries.set("cmd.total", cmd.total);

    StageOutput {
        patch: SheetPatch::BaseAttack(BaseAttackSheet {
            total,
            iterative_attacks: iterative,
            melee,
            ranged,
            cmb,
            cmd,
        }),
        entries,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Stage;
    use super::iterative_attacks;
    use crate::character::fixtures::{fighter, wizard, with_levels};
    use crate::character::{AbilityScore, CharacterBaseData};
    use crate::source::Race;
    use crate::types::{Ability, SizeCategory};

    #[test]
    fn test_iterative_attacks() {
        assert_eq!(iterative_attacks(0, 5, 4), vec![0]);
        assert_eq!(iterative_attacks(6, 5, 4), vec![6, 1]);
        assert_eq!(iterative_attacks(11, 5, 4), vec![11, 6, 1]);
        assert_eq!(iterative_attacks(20, 5, 4), vec![20, 15, 10, 5]);
    }

    #[test]
    fn test_multiclass_bab_and_maneuvers() {
        let mut base = CharacterBaseData::new("Seelah");
        base.classes = vec![with_levels(fighter(), 6), with_levels(wizard(), 3)];
        base.abilities.insert(Ability::Strength, AbilityScore::new(16.0));
        base.abilities.insert(Ability::Dexterity, AbilityScore::new(12.0));
        base.race = Some(Race::new("halfling", "Halfling", SizeCategory::Small));
        let fixture = Fixture::new(base, Vec::new());
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::BaseAttack);

        // fighter 6 + wizard 1
        assert!((sheet.base_attack.total.total - 7.0).abs() < f64::EPSILON);
        assert_eq!(sheet.base_attack.iterative_attacks, vec![7, 2]);
        // 7 + 3 STR + 1 size
        assert_eq!(index.get("attack.melee.total"), Some(11.0));
        // 7 + 1 DEX + 1 size
        assert_eq!(index.get("attack.ranged.total"), Some(9.0));
        // 7 + 3 STR - 4 special size
        assert_eq!(index.get("cmb.total"), Some(6.0));
        // 10 + 7 + 3 + 1 - 4
        assert_eq!(index.get("cmd.total"), Some(17.0));
    }
}
