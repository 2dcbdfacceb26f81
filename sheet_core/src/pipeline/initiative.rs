//! Initiative stage

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::SheetPatch;
use crate::types::{Ability, BonusType};

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();

    let mut sources = vec![Source::new(
        ctx.ability_modifier(index, Ability::Dexterity),
        "Dexterity",
        BonusType::Dexterity,
        "dexterity",
    )];
    sources.extend(ctx.sources_for("initiative.total", index, &mut warnings));
    let initiative = ctx.aggregate(sources);

    let mut entries = IndexEntries::new();
    entries.set("initiative.total", initiative.total);

    StageOutput {
        patch: SheetPatch::Initiative(initiative),
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
    use crate::types::{Ability, BonusType};

    #[test]
    fn test_dexterity_plus_improved_initiative() {
        let mut base = CharacterBaseData::new("Merisiel");
        base.abilities.insert(Ability::Dexterity, AbilityScore::new(18.0));
        let fixture = Fixture::new(
            base,
            vec![sourced(
                Change::new(ChangeKind::Initiative, "4", BonusType::Untyped),
                "Improved Initiative",
            )],
        );
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::Initiative);

        assert!((sheet.initiative.total - 8.0).abs() < f64::EPSILON);
        assert_eq!(sheet.initiative.source_values.len(), 2);
        assert_eq!(index.get("initiative.total"), Some(8.0));
    }
}
