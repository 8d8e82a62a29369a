//! Text codecs for Munitorum Field Manual bulletins.
//!
//! Parses raw bulletin text into flat records, renders a stored version back
//! into bulletin text, compares two texts line by line, and reads the
//! structured points files used for bulk migration. Pure synchronous; no
//! HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use munitorum_text::parse;
//!
//! let text = "MUNITORUM FIELD MANUAL v3.2\nCODEX: ORKS\nBoyz\n10 models ..... 85 pts\n";
//! let parsed = parse(text);
//! println!("version={:?}, {} units", parsed.version, parsed.units.len());
//! ```

pub mod error;
pub mod parse;
mod patterns;
pub mod render;
pub mod structured;
pub mod validate;

pub use error::{Error, Result};
pub use parse::parse;
pub use render::render;
pub use validate::{
  Comparison, Difference, DifferenceKind, compare, line_multiset,
  normalize_line,
};

// ─── Round-trip test ─────────────────────────────────────────────────────────

#[cfg(test)]
mod roundtrip_tests {
  use munitorum_core::model::UnitType;

  use super::{
    parse::{AGENTS_OF_THE_IMPERIUM, EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD},
    test_helpers::{SnapshotBuilder, make_snapshot},
    *,
  };

  fn snapshot_triples(snapshot: &munitorum_core::snapshot::VersionSnapshot) -> Vec<(String, u32, u32)> {
    let mut triples: Vec<_> = snapshot
      .factions
      .iter()
      .flat_map(|f| &f.units)
      .flat_map(|u| {
        u.variants
          .iter()
          .map(|v| (u.unit.name.clone(), v.model_count, v.points))
      })
      .collect();
    triples.sort();
    triples
  }

  #[test]
  fn rendered_version_parses_back() {
    let snapshot = make_snapshot("3.10", |b: &mut SnapshotBuilder| {
      b.faction("SPACE MARINES")
        .unit("Intercessor Squad", false, &[(5, 80), (10, 160)])
        .unit("Captain", false, &[(1, 80)])
        .unit("Relic Contemptor Dreadnought", true, &[(1, 150)])
        .detachment("Gladius Task Force", &[
          ("Adept of the Codex", 20),
          ("Artificer Armour", 10),
        ]);
      b.faction("CHAOS SPACE MARINES")
        .unit("Legionaries", false, &[(5, 90), (10, 180)])
        .detachment("Veterans of the Long War", &[("Eager for Glory", 15)]);
      b.faction("IMPERIAL AGENTS");
      b.faction(AGENTS_OF_THE_IMPERIUM).unit("Inquisitor", false, &[(1, 55)]);
      b.faction(EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD)
        .unit("Callidus Assassin", false, &[(1, 100)]);
    });

    let parsed = parse(&render(&snapshot));
    assert_eq!(parsed.version.as_deref(), Some("3.10"));
    assert_eq!(parsed.release_label.as_deref(), Some("June 2025"));
    assert_eq!(parsed.unit_triples(), snapshot_triples(&snapshot));
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);

    let factions: Vec<_> = parsed.factions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(factions, [
      "SPACE MARINES",
      "CHAOS SPACE MARINES",
      "IMPERIAL AGENTS",
      AGENTS_OF_THE_IMPERIUM,
      EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD,
    ]);

    let forge_world: Vec<_> = parsed
      .units
      .iter()
      .filter(|u| u.forge_world)
      .map(|u| u.name.as_str())
      .collect();
    assert_eq!(forge_world, ["Relic Contemptor Dreadnought"]);
    assert_eq!(
      snapshot.factions[0].units[2].unit.unit_type,
      UnitType::ForgeWorld
    );

    let enhancements: Vec<_> = parsed
      .enhancements
      .iter()
      .map(|e| (e.faction.as_str(), e.detachment.as_str(), e.name.as_str(), e.points))
      .collect();
    assert_eq!(enhancements, [
      ("SPACE MARINES", "Gladius Task Force", "Adept of the Codex", 20),
      ("SPACE MARINES", "Gladius Task Force", "Artificer Armour", 10),
      ("CHAOS SPACE MARINES", "Veterans of the Long War", "Eager for Glory", 15),
    ]);
  }

  #[test]
  fn rendered_text_matches_itself_after_normalisation() {
    let snapshot = make_snapshot("3.2", |b: &mut SnapshotBuilder| {
      b.faction("NECRONS").unit("Necron Warriors", false, &[(10, 90), (20, 180)]);
    });
    let text = render(&snapshot);
    let reformatted = text.replace(" pts", "pts").replace("....", ". . ");
    let cmp = compare(&text, &reformatted);
    assert!(cmp.is_exact(), "{:?}", cmp.differences);
  }
}

// ─── Shared test helpers ─────────────────────────────────────────────────────
