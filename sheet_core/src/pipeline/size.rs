//! Size stage

use super::{IndexEntries, StageContext, StageOutput, SubstitutionIndex};
use crate::changes::Source;
use crate::sheet::{SheetPatch, SizeSheet};
use crate::types::SizeCategory;

pub(super) fn calculate(ctx: &StageContext<'_>, index: &SubstitutionIndex) -> StageOutput {
    let mut warnings = Vec::new();
    let base = ctx.base.base_size();

    let mut sources = vec![Source::base(base.numeric() as f64, "Base size")];
    sources.extend(ctx.sources_for("size.total", index, &mut warnings));
    let breakdown = ctx.aggregate(sources);

    let category = SizeCategory::from_numeric(breakdown.total.round() as i32);

    let mut entries = IndexEntries::new();
    entries.set("size.total", category.numeric() as f64);
    entries.set("size.modifier", category.modifier() as f64);
    entries.set("size.specialModifier", category.special_modifier() as f64);

    StageOutput {
        patch: SheetPatch::Size(SizeSheet {
            base,
            category,
            numeric: category.numeric(),
            modifier: category.modifier(),
            special_modifier: category.special_modifier(),
            breakdown,
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
    use crate::character::CharacterBaseData;
    use crate::sheet::SheetPatch;
    use crate::source::Race;
    use crate::types::{BonusType, SizeCategory};

    #[test]
    fn test_racial_size_and_enlarge() {
        let mut base = CharacterBaseData::new("Lem");
        base.race = Some(Race::new("halfling", "Halfling", SizeCategory::Small));
        let fixture = Fixture::new(
            base,
            vec![sourced(Change::new(ChangeKind::Size, "1", BonusType::Untyped), "Enlarge Person")],
        );
        let roller = fixed_roller();
        let (sheet, index) = run_until(&fixture.context(&roller), Stage::Size);

        assert_eq!(sheet.size.base, SizeCategory::Small);
        assert_eq!(sheet.size.category, SizeCategory::Medium);
        assert_eq!(index.get("size.modifier"), Some(0.0));
    }

    #[test]
    fn test_size_clamped_to_colossal() {
        let mut base = CharacterBaseData::new("Titan");
        base.size = Some(SizeCategory::Gargantuan);
        let fixture = Fixture::new(
            base,
            vec![sourced(Change::new(ChangeKind::Size, "3", BonusType::Untyped), "Giant Form")],
        );
        let roller = fixed_roller();
        let output = super::calculate(
            &fixture.context(&roller),
            &super::SubstitutionIndex::new(),
        );
        match output.patch {
            SheetPatch::Size(size) => {
                assert_eq!(size.category, SizeCategory::Colossal);
                assert!((size.breakdown.total - 6.0).abs() < f64::EPSILON);
                assert_eq!(size.special_modifier, 16);
            }
            other => panic!("unexpected patch {:?}", other),
        }
    }
}
