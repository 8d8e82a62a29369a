//! Regenerate bulletin text from a stored version.
//!
//! The output is meant to parse back into the same unit and enhancement
//! records, and to line up with the source bulletin after normalisation.

use std::fmt::Write as _;

use munitorum_core::snapshot::{FactionView, UnitView, VersionSnapshot};

use crate::{
  parse::{AGENTS_OF_THE_IMPERIUM, EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD},
  patterns::{self, LineKind},
};

/// Column the dot leader runs to before the points value.
pub const LEADER_WIDTH: usize = 40;
const MIN_LEADER: usize = 3;

const IMPERIAL_AGENTS: &str = "IMPERIAL AGENTS";

/// Render a whole version as bulletin text.
pub fn render(snapshot: &VersionSnapshot) -> String {
  let mut out = String::new();
  let version = &snapshot.version;
  let _ = writeln!(out, "MUNITORUM FIELD MANUAL v{}", version.version);
  if let Some(label) = &version.release_label {
    let _ = writeln!(out, "{label}");
  }
  out.push('\n');

  let mut in_imperial_agents = false;
  for faction in &snapshot.factions {
    let name = faction.faction.name.as_str();
    match agents_marker(name) {
      Some(marker) => {
        if !in_imperial_agents {
          let _ = writeln!(out, "CODEX: {IMPERIAL_AGENTS}");
          in_imperial_agents = true;
        }
        let _ = writeln!(out, "{marker}");
      }
      None => {
        let _ = writeln!(out, "CODEX: {}", name.to_uppercase());
        in_imperial_agents = name.eq_ignore_ascii_case(IMPERIAL_AGENTS);
      }
    }
    render_faction(&mut out, faction);
    out.push('\n');
  }
  out
}

/// The subsection marker line for a synthetic Imperial Agents faction.
fn agents_marker(name: &str) -> Option<&'static str> {
  if name.eq_ignore_ascii_case(AGENTS_OF_THE_IMPERIUM) {
    Some("AGENTS OF THE IMPERIUM")
  } else if name.eq_ignore_ascii_case(EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD) {
    Some("EVERY MODEL HAS THE IMPERIUM KEYWORD")
  } else {
    None
  }
}

fn render_faction(out: &mut String, faction: &FactionView) {
  let (forge_world, standard): (Vec<&UnitView>, Vec<&UnitView>) = faction
    .units
    .iter()
    .partition(|u| u.unit.unit_type.is_forge_world());

  for unit in standard {
    render_unit(out, unit);
  }

  if !forge_world.is_empty() {
    out.push_str("FORGE WORLD POINTS VALUES\n");
    for unit in forge_world {
      render_unit(out, unit);
    }
  }

  if !faction.detachments.is_empty() {
    out.push_str("DETACHMENT ENHANCEMENTS\n");
    for d in &faction.detachments {
      let _ = writeln!(out, "{}", d.detachment.name);
      for e in &d.enhancements {
        let _ = writeln!(out, "{}", leader_line(&e.name, e.points));
      }
    }
  }
}

fn render_unit(out: &mut String, unit: &UnitView) {
  let name = unit.unit.name.as_str();
  // A name that would not read back as a plain name line goes inline.
  let inline = patterns::mentions_points_or_models(name)
    || patterns::classify(name) != LineKind::Text;
  if !inline {
    let _ = writeln!(out, "{name}");
  }
  for v in &unit.variants {
    let label = models_label(v.model_count);
    let label = if inline { format!("{name} {label}") } else { label };
    let _ = writeln!(out, "{}", leader_line(&label, v.points));
  }
}

fn models_label(count: u32) -> String {
  if count == 1 { "1 model".to_owned() } else { format!("{count} models") }
}

/// `label` padded with dots to [`LEADER_WIDTH`], then ` <points> pts`.
pub fn leader_line(label: &str, points: u32) -> String {
  let mut line = format!("{label} ");
  let dots = LEADER_WIDTH
    .saturating_sub(line.chars().count())
    .max(MIN_LEADER);
  line.extend(std::iter::repeat_n('.', dots));
  let _ = write!(line, " {points} pts");
  line
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_helpers::{SnapshotBuilder, make_snapshot};

  #[test]
  fn leader_runs_to_fixed_column() {
    let line = leader_line("5 models", 80);
    assert_eq!(line.find(" 80 pts"), Some(LEADER_WIDTH));
    assert!(line.starts_with("5 models ...."));
    assert_eq!(leader_line("1 model", 65).len(), LEADER_WIDTH + " 65 pts".len());
  }

  #[test]
  fn long_labels_keep_a_short_leader() {
    let label = "A".repeat(50);
    assert_eq!(leader_line(&label, 5), format!("{label} ... 5 pts"));
  }

  #[test]
  fn renders_sections_in_order() {
    let snapshot = make_snapshot("3.2", |b: &mut SnapshotBuilder| {
      b.faction("SPACE MARINES")
        .unit("Intercessor Squad", false, &[(5, 80), (10, 160)])
        .unit("Relic Contemptor Dreadnought", true, &[(1, 150)])
        .detachment("Gladius Task Force", &[("Adept of the Codex", 20)]);
    });
    let text = render(&snapshot);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "MUNITORUM FIELD MANUAL v3.2");
    assert_eq!(lines[1], "June 2025");
    assert_eq!(lines[3], "CODEX: SPACE MARINES");
    assert_eq!(lines[4], "Intercessor Squad");
    assert_eq!(lines[5], leader_line("5 models", 80));
    assert_eq!(lines[6], leader_line("10 models", 160));
    assert_eq!(lines[7], "FORGE WORLD POINTS VALUES");
    assert_eq!(lines[8], "Relic Contemptor Dreadnought");
    assert_eq!(lines[9], leader_line("1 model", 150));
    assert_eq!(lines[10], "DETACHMENT ENHANCEMENTS");
    assert_eq!(lines[11], "Gladius Task Force");
    assert_eq!(lines[12], leader_line("Adept of the Codex", 20));
  }

  #[test]
  fn imperial_agents_share_one_header() {
    let snapshot = make_snapshot("3.2", |b: &mut SnapshotBuilder| {
      b.faction("IMPERIAL AGENTS");
      b.faction(AGENTS_OF_THE_IMPERIUM).unit("Inquisitor", false, &[(1, 55)]);
      b.faction(EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD)
        .unit("Callidus Assassin", false, &[(1, 100)]);
    });
    let text = render(&snapshot);
    assert_eq!(text.matches("CODEX: IMPERIAL AGENTS").count(), 1);
    assert!(text.contains("\nAGENTS OF THE IMPERIUM\nInquisitor\n"));
    assert!(text.contains("\nEVERY MODEL HAS THE IMPERIUM KEYWORD\nCallidus Assassin\n"));
  }

  #[test]
  fn awkward_unit_names_render_inline() {
    let snapshot = make_snapshot("1.0", |b: &mut SnapshotBuilder| {
      b.faction("ORKS").unit("Modelled Boyz", false, &[(10, 85)]);
    });
    let text = render(&snapshot);
    assert!(text.contains(&leader_line("Modelled Boyz 10 models", 85)));
  }
}
