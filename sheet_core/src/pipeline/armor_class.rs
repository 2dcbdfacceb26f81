//! Armor class stage

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{ArmorClassSheet, SheetPatch};
use crate::source::ArmorKind;
use crate::types::{Ability, BonusType};

fn is_armor_type(bonus_type: &BonusType) -> bool {
    matches!(
        bonus_type,
        BonusType::Armor | BonusType::Shield | BonusType::NaturalArmor
    )
}

/// Dexterity and dodge bonuses; penalties of either type still apply when flat-footed
fn is_lost_when_flat_footed(source: &Source) -> bool {
    source.value > 0.0 && matches!(source.bonus_type, BonusType::Dexterity | BonusType::Dodge)
}

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();

    let mut natural_sources = Vec::new();
    natural_sources.extend(ctx.sources_for("ac.natural", index, &mut warnings));
    let natural = ctx.aggregate(natural_sources);

    let dexterity = ctx.ability_modifier(index, Ability::Dexterity);
    let max_dex = ctx
        .base
        .items
        .iter()
        .filter_map(|item| item.equipped_armor())
        .filter_map(|armor| armor.max_dex)
        .min();
    let dexterity = match max_dex {
        Some(cap) => dexterity.min(cap as f64),
        None => dexterity,
    };

    let mut sources = vec![
        Source::base(ctx.constants.armor_class.base as f64, "Base"),
        Source::new(dexterity, "Dexterity", BonusType::Dexterity, "dexterity"),
        Source::new(index.get_or_zero("size.modifier"), "Size", BonusType::Size, "size"),
    ];
    for item in &ctx.base.items {
        if let Some(armor) = item.equipped_armor() {
            let bonus_type = match armor.kind {
                ArmorKind::Armor => BonusType::Armor,
                ArmorKind::Shield => BonusType::Shield,
            };
            sources.push(Source::new(
                armor.total_bonus() as f64,
                item.name.clone(),
                bonus_type,
                item.id.clone(),
            ));
        }
    }
    sources.push(Source::new(
        natural.total,
        "Natural armor",
        BonusType::NaturalArmor,
        "natural_armor",
    ));
    sources.extend(ctx.sources_for("ac.total", index, &mut warnings));

    let touch_sources: Vec<Source> = sources
        .iter()
        .filter(|s| !is_armor_type(&s.bonus_type))
        .cloned()
        .collect();
    let flat_footed_sources: Vec<Source> = sources
        .iter()
        .filter(|s| !is_lost_when_flat_footed(s))
        .cloned()
        .collect();

    let total = ctx.aggregate(sources);
    let touch = ctx.aggregate(touch_sources);
    let flat_footed = ctx.aggregate(flat_footed_sources);

    let mut entries = IndexEntries::new();
    entries.set("ac.total", total.total);
    entries.set("ac.touch.total", touch.total);
    entries.set("ac.flatFooted.total", flat_footed.total);
    entries.set("ac.natural.total", natural.total);

    StageOutput {
        patch: SheetPatch::ArmorClass(ArmorClassSheet {
            total,
            touch,
            flat_footed,
            natural,
        }),
        entries,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Stage;
    use crate::changes::{Change, ChangeKind};
    use crate::character::{AbilityScore, CharacterBaseData};
    use crate::source::{ArmorData, ArmorKind, Item};
    use crate::types::{Ability, BonusType};

    fn armored() -> CharacterBaseData {
        let mut base = CharacterBaseData::new("Seoni");
        base.abilities.insert(Ability::Dexterity, AbilityScore::new(18.0));
        base.items.push(Item::new("breastplate", "Breastplate").with_armor(ArmorData {
            kind: ArmorKind::Armor,
            armor_bonus: 6,
            enhancement: 1,
            max_dex: Some(3),
        }));
        base.items.push(Item::new("buckler", "Buckler").with_armor(ArmorData {
            kind: ArmorKind::Shield,
            armor_bonus: 1,
            enhancement: 0,
            max_dex: None,
        }));
        base
    }

    #[test]
    fn test_armor_class_variants() {
        let fixture = Fixture::new(
            armored(),
            vec![
                sourced(Change::new(ChangeKind::ArmorClass, "1", BonusType::Dodge), "Dodge"),
                sourced(Change::new(ChangeKind::ArmorClass, "2", BonusType::Deflection), "Ring of Protection"),
                sourced(Change::new(ChangeKind::NaturalArmor, "2", BonusType::Enhancement), "Barkskin"),
            ],
        );
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::ArmorClass);

        // 10 + 3 capped DEX + 7 armor + 1 shield + 2 natural + 1 dodge + 2 deflection
        assert!((sheet.armor_class.total.total - 26.0).abs() < f64::EPSILON);
        // 10 + 3 + 1 + 2
        assert_eq!(index.get("ac.touch.total"), Some(16.0));
        // 10 + 7 + 1 + 2 + 2
        assert_eq!(index.get("ac.flatFooted.total"), Some(22.0));
        assert_eq!(index.get("ac.natural.total"), Some(2.0));
    }

    #[test]
    fn test_dexterity_penalty_kept_flat_footed() {
        let mut base = CharacterBaseData::new("Clumsy");
        base.abilities.insert(Ability::Dexterity, AbilityScore::new(8.0));
        let fixture = Fixture::new(base, Vec::new());
        let roller = fixed_roller();
        let (sheet, _) = run_until(&fixture.context(&roller), Stage::ArmorClass);

        assert!((sheet.armor_class.total.total - 9.0).abs() < f64::EPSILON);
        assert!((sheet.armor_class.flat_footed.total - 9.0).abs() < f64::EPSILON);
    }
}
