//! Plain-text rendering of a computed sheet

use sheet_core::prelude::*;
use std::fmt::Write;

fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", value)
    } else {
        format!("{}", value)
    }
}

pub fn render(sheet: &CharacterSheet) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = write_sheet(&mut out, sheet);
    out
}

fn write_sheet(out: &mut String, sheet: &CharacterSheet) -> std::fmt::Result {
    let classes: Vec<String> = sheet
        .class_levels
        .iter()
        .map(|(id, level)| format!("{} {}", id, level))
        .collect();
    writeln!(out, "{} - level {} ({})", sheet.name, sheet.level, classes.join(" / "))?;
    writeln!(out)?;

    for (ability, values) in &sheet.abilities {
        writeln!(
            out,
            "{:<13} {:>3} ({})",
            ability.display_name(),
            values.score.total,
            signed(values.modifier)
        )?;
    }
    writeln!(out)?;

    let hp = &sheet.hit_points;
    writeln!(out, "HP          {}/{} (+{} temporary)", hp.current, hp.max.total, hp.temporary.total)?;
    let ac = &sheet.armor_class;
    writeln!(
        out,
        "AC          {} (touch {}, flat-footed {})",
        ac.total.total, ac.touch.total, ac.flat_footed.total
    )?;
    writeln!(out, "Initiative  {}", signed(sheet.initiative.total))?;
    let attacks: Vec<String> = sheet.base_attack.iterative_attacks.iter().map(|a| signed(f64::from(*a))).collect();
    writeln!(
        out,
        "BAB         {}  CMB {}  CMD {}",
        attacks.join("/"),
        signed(sheet.base_attack.cmb.total),
        sheet.base_attack.cmd.total
    )?;
    for (save, total) in &sheet.saving_throws {
        writeln!(out, "{:<11} {}", save.key(), signed(total.total))?;
    }

    writeln!(out, "\nSkills")?;
    for (id, skill) in &sheet.skills {
        if skill.ranks == 0 && skill.total.total.abs() < f64::EPSILON {
            continue;
        }
        let marker = if skill.usable { "" } else { " (untrained)" };
        writeln!(out, "  {:<24} {}{}", id, signed(skill.total.total), marker)?;
    }

    if !sheet.cge.is_empty() {
        writeln!(out, "\nCapabilities")?;
        for cge in sheet.cge.values() {
            writeln!(out, "  {} ({:?}, level {})", cge.id, cge.mode, cge.caster_level)?;
            for slot in cge.tracks.iter().flat_map(|t| &t.slots) {
                writeln!(out, "    level {}: {}/{}", slot.level, slot.current, slot.max)?;
            }
        }
    }

    if !sheet.resources.is_empty() {
        writeln!(out, "\nResources")?;
        for resource in sheet.resources.values() {
            writeln!(out, "  {:<24} {}/{}", resource.name, resource.current, resource.max)?;
        }
    }

    if !sheet.warnings.is_empty() {
        writeln!(out, "\nWarnings")?;
        for warning in &sheet.warnings {
            writeln!(out, "  - {}", warning)?;
        }
    }
    Ok(())
}
