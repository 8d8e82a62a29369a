//! Line-oriented bulletin parser.
//!
//! Parsing is a fold over [`step`], a pure transition from the current
//! [`ParseState`] and a [`Cursor`] into the next state, at most one
//! [`Record`], and the number of lines consumed.

use munitorum_core::{
  bulletin::{
    DetachmentRecord, Diagnostic, DiagnosticKind, EnhancementRecord,
    FactionRecord, ParsedBulletin, UnitRecord,
  },
  model::Supergroup,
};

use crate::patterns::{self, LineKind};

/// How far back a models-only line may look for its unit name.
pub const LOOKBACK_LINES: usize = 5;

pub const AGENTS_OF_THE_IMPERIUM: &str =
  "IMPERIAL AGENTS - AGENTS OF THE IMPERIUM";
pub const EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD: &str =
  "IMPERIAL AGENTS - EVERY MODEL HAS THE IMPERIUM KEYWORD";

const IMPERIAL_AGENTS: &str = "IMPERIAL AGENTS";
const IMPERIUM_ALLY: &str = "Imperium";

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
  pub faction:             Option<String>,
  pub detachment:          Option<String>,
  pub forge_world:         bool,
  pub enhancement_section: bool,
  /// Inside an Imperial Agents codex, where subsection markers open
  /// synthetic factions.
  pub imperial_agents:     bool,
  pub agents_subsection:   bool,
  version_seen:            bool,
  release_seen:            bool,
}

impl ParseState {
  /// Fresh section state under a new faction.
  fn enter_faction(&self, name: &str, imperial_agents: bool) -> Self {
    Self {
      faction: Some(name.to_owned()),
      detachment: None,
      forge_world: false,
      enhancement_section: false,
      imperial_agents,
      agents_subsection: false,
      version_seen: self.version_seen,
      release_seen: self.release_seen,
    }
  }
}

/// Read-only view of the input positioned on one line.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
  lines: &'a [&'a str],
  index: usize,
}

impl<'a> Cursor<'a> {
  pub fn new(lines: &'a [&'a str], index: usize) -> Self { Self { lines, index } }

  pub fn line(&self) -> &'a str { self.lines.get(self.index).copied().unwrap_or("") }

  /// 1-based.
  pub fn line_number(&self) -> usize { self.index + 1 }

  /// The next non-blank line after the current one, with its distance.
  pub fn next_non_blank(&self) -> Option<(usize, &'a str)> {
    self.lines[(self.index + 1).min(self.lines.len())..]
      .iter()
      .enumerate()
      .find(|(_, l)| !l.trim().is_empty())
      .map(|(i, l)| (i + 1, *l))
  }

  /// Up to `n` preceding lines, nearest first.
  pub fn lookback(&self, n: usize) -> impl Iterator<Item = &'a str> + 'a {
    let start = self.index.saturating_sub(n);
    self.lines[start..self.index.min(self.lines.len())]
      .iter()
      .rev()
      .copied()
  }
}

/// What a single step extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
  Preamble { version: Option<String>, release_label: Option<String> },
  Faction(FactionRecord),
  Detachment(DetachmentRecord),
  Unit(UnitRecord),
  Enhancement(EnhancementRecord),
  Skipped(Diagnostic),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub state:   ParseState,
  pub record:  Option<Record>,
  /// Lines consumed, at least 1.
  pub advance: usize,
}

impl Transition {
  fn skip(state: ParseState) -> Self { Self { state, record: None, advance: 1 } }

  fn emit(state: ParseState, record: Record) -> Self {
    Self { state, record: Some(record), advance: 1 }
  }

  fn consuming(mut self, advance: usize) -> Self {
    self.advance = advance.max(1);
    self
  }
}

// ─── Transition ──────────────────────────────────────────────────────────────

/// Decide what the line under `cursor` means given `state`.
pub fn step(state: &ParseState, cursor: &Cursor<'_>) -> Transition {
  let raw = cursor.line();
  let line = raw.trim();
  let line_no = cursor.line_number();
  let kind = patterns::classify(line);

  if kind == LineKind::Blank {
    return Transition::skip(state.clone());
  }

  // Version and release label are only looked for above the first faction.
  if state.faction.is_none() {
    let version =
      (!state.version_seen).then(|| patterns::version_in(line)).flatten();
    let release_label =
      (!state.release_seen).then(|| patterns::release_label_in(line)).flatten();
    if version.is_some() || release_label.is_some() {
      let next = ParseState {
        version_seen: state.version_seen || version.is_some(),
        release_seen: state.release_seen || release_label.is_some(),
        ..state.clone()
      };
      return Transition::emit(next, Record::Preamble {
        version:       version.map(str::to_owned),
        release_label: release_label.map(str::to_owned),
      });
    }
  }

  match kind {
    LineKind::FactionHeader { name } => faction_header(state, cursor, name),

    LineKind::AgentsOfTheImperium if state.imperial_agents => {
      agents_subsection(state, AGENTS_OF_THE_IMPERIUM, line_no)
    }
    LineKind::EveryModelHas { complete } if state.imperial_agents => {
      let advance = match cursor.next_non_blank() {
        Some((offset, next))
          if !complete
            && patterns::classify(next) == LineKind::ImperiumKeywordTail =>
        {
          offset + 1
        }
        _ => 1,
      };
      agents_subsection(state, EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD, line_no)
        .consuming(advance)
    }

    LineKind::ForgeWorldMarker => Transition::skip(ParseState {
      forge_world: true,
      enhancement_section: false,
      ..state.clone()
    }),
    LineKind::EnhancementMarker => Transition::skip(ParseState {
      enhancement_section: true,
      detachment: None,
      ..state.clone()
    }),

    _ => match &state.faction {
      None => outside_faction(state, &kind, line, line_no),
      Some(faction) => in_faction(state, cursor, faction, kind, line, line_no),
    },
  }
}

fn faction_header(
  state: &ParseState,
  cursor: &Cursor<'_>,
  name: Option<&str>,
) -> Transition {
  let line_no = cursor.line_number();
  let (name, advance) = match name {
    Some(name) => (name.to_owned(), 1),
    // `CODEX SUPPLEMENT` with the name on the following line.
    None => match cursor.next_non_blank() {
      Some((offset, next))
        if patterns::classify(next) == LineKind::Text =>
      {
        (next.trim().to_owned(), offset + 1)
      }
      _ => {
        return Transition::emit(
          state.clone(),
          skipped(line_no, cursor.line(), DiagnosticKind::Unrecognized),
        );
      }
    },
  };

  let imperial_agents = name.to_uppercase().contains(IMPERIAL_AGENTS);
  let record = FactionRecord {
    supergroup: Supergroup::from_faction_name(&name),
    name: name.clone(),
    ally_to: None,
    line: line_no,
  };
  Transition::emit(
    state.enter_faction(&name, imperial_agents),
    Record::Faction(record),
  )
  .consuming(advance)
}

fn agents_subsection(
  state: &ParseState,
  name: &str,
  line_no: usize,
) -> Transition {
  let mut next = state.enter_faction(name, true);
  next.agents_subsection = true;
  Transition::emit(
    next,
    Record::Faction(FactionRecord {
      name:       name.to_owned(),
      supergroup: Supergroup::Imperium,
      ally_to:    Some(IMPERIUM_ALLY.to_owned()),
      line:       line_no,
    }),
  )
}

fn outside_faction(
  state: &ParseState,
  kind: &LineKind<'_>,
  line: &str,
  line_no: usize,
) -> Transition {
  match kind {
    LineKind::UnitInline { .. }
    | LineKind::UnitModelsOnly { .. }
    | LineKind::Enhancement { .. } => Transition::emit(
      state.clone(),
      skipped(line_no, line, DiagnosticKind::OutsideFaction),
    ),
    _ => Transition::skip(state.clone()),
  }
}

fn in_faction(
  state: &ParseState,
  cursor: &Cursor<'_>,
  faction: &str,
  kind: LineKind<'_>,
  line: &str,
  line_no: usize,
) -> Transition {
  let unit = |name: &str, model_count: u32, points: u32| {
    Record::Unit(UnitRecord {
      faction: faction.to_owned(),
      detachment: state.detachment.clone(),
      name: name.to_owned(),
      model_count,
      points,
      forge_world: state.forge_world,
      line: line_no,
    })
  };

  match kind {
    LineKind::Text
      if state.enhancement_section
        && !patterns::mentions_points_or_models(line) =>
    {
      let next = ParseState {
        detachment: Some(line.to_owned()),
        ..state.clone()
      };
      Transition::emit(
        next,
        Record::Detachment(DetachmentRecord {
          faction: faction.to_owned(),
          name:    line.to_owned(),
          line:    line_no,
        }),
      )
    }

    LineKind::Enhancement { name, points } if state.enhancement_section => {
      match &state.detachment {
        Some(detachment) => Transition::emit(
          state.clone(),
          Record::Enhancement(EnhancementRecord {
            faction: faction.to_owned(),
            detachment: detachment.clone(),
            name: name.to_owned(),
            points,
            line: line_no,
          }),
        ),
        None => Transition::emit(
          state.clone(),
          skipped(line_no, line, DiagnosticKind::EnhancementWithoutDetachment),
        ),
      }
    }

    LineKind::UnitInline { name, models, points } => {
      Transition::emit(state.clone(), unit(name, models, points))
    }

    LineKind::UnitModelsOnly { models, points } => match lookback_name(cursor) {
      Some(name) => Transition::emit(state.clone(), unit(name, models, points)),
      None => Transition::emit(
        state.clone(),
        skipped(line_no, line, DiagnosticKind::UnresolvedUnitName),
      ),
    },

    // Points-bearing lines that fit no pattern in this section.
    LineKind::Enhancement { .. } => Transition::emit(
      state.clone(),
      skipped(line_no, line, DiagnosticKind::Unrecognized),
    ),
    LineKind::Text if patterns::mentions_points_or_models(line) => {
      Transition::emit(
        state.clone(),
        skipped(line_no, line, DiagnosticKind::Unrecognized),
      )
    }

    // Candidate unit names, page numbers and stray markers.
    _ => Transition::skip(state.clone()),
  }
}

/// Find the unit name for a models-only line among the preceding
/// [`LOOKBACK_LINES`] lines.
fn lookback_name<'a>(cursor: &Cursor<'a>) -> Option<&'a str> {
  for prev in cursor.lookback(LOOKBACK_LINES) {
    match patterns::classify(prev) {
      LineKind::Blank
      | LineKind::PageNumber
      | LineKind::UnitModelsOnly { .. }
      | LineKind::Enhancement { .. } => continue,
      LineKind::UnitInline { name, .. } => return Some(name),
      kind if kind.is_structural() => return None,
      _ if patterns::mentions_points_or_models(prev) => continue,
      _ => return Some(prev.trim()),
    }
  }
  None
}

fn skipped(line: usize, text: &str, kind: DiagnosticKind) -> Record {
  Record::Skipped(Diagnostic { line, text: text.trim().to_owned(), kind })
}

// ─── Fold ────────────────────────────────────────────────────────────────────

/// Parse a whole bulletin. Never fails: lines that cannot be placed are
/// reported in [`ParsedBulletin::diagnostics`].
pub fn parse(text: &str) -> ParsedBulletin {
  let text = text.strip_prefix('\u{feff}').unwrap_or(text);
  let lines: Vec<&str> = text.lines().collect();

  let mut out = ParsedBulletin::default();
  let mut state = ParseState::default();
  let mut index = 0;
  while index < lines.len() {
    let transition = step(&state, &Cursor::new(&lines, index));
    if let Some(record) = transition.record {
      collect(&mut out, record);
    }
    state = transition.state;
    index += transition.advance.max(1);
  }
  out
}

fn collect(out: &mut ParsedBulletin, record: Record) {
  match record {
    Record::Preamble { version, release_label } => {
      if out.version.is_none() {
        out.version = version;
      }
      if out.release_label.is_none() {
        out.release_label = release_label;
      }
    }
    Record::Faction(faction) => {
      if !out.factions.iter().any(|f| f.name == faction.name) {
        out.factions.push(faction);
      }
    }
    Record::Detachment(d) => out.detachments.push(d),
    Record::Unit(u) => out.units.push(u),
    Record::Enhancement(e) => out.enhancements.push(e),
    Record::Skipped(d) => out.diagnostics.push(d),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
MUNITORUM FIELD MANUAL v3.2
June 2025

CODEX: SPACE MARINES
Intercessor Squad
5 models ................ 80 pts
10 models ............... 160 pts
Terminator Squad 5 models ..... (+10) ..... 170 pts

FORGE WORLD POINTS VALUES
Relic Contemptor Dreadnought
1 model ................. 150 pts
12

DETACHMENT ENHANCEMENTS
Gladius Task Force
Adept of the Codex ........ 20 pts
Artificer Armour .......... 10 pts

CODEX: NECRONS
Necron Warriors
10 models ............... 90 pts
";

  #[test]
  fn sample_bulletin() {
    let parsed = parse(SAMPLE);
    assert_eq!(parsed.version.as_deref(), Some("3.2"));
    assert_eq!(parsed.release_label.as_deref(), Some("June 2025"));

    let names: Vec<_> = parsed.factions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["SPACE MARINES", "NECRONS"]);
    assert_eq!(parsed.factions[0].supergroup, Supergroup::Imperium);
    assert_eq!(parsed.factions[1].supergroup, Supergroup::Xenos);

    assert_eq!(parsed.unit_triples(), vec![
      ("Intercessor Squad".to_owned(), 5, 80),
      ("Intercessor Squad".to_owned(), 10, 160),
      ("Necron Warriors".to_owned(), 10, 90),
      ("Relic Contemptor Dreadnought".to_owned(), 1, 150),
      ("Terminator Squad".to_owned(), 5, 170),
    ]);

    let relic = parsed
      .units
      .iter()
      .find(|u| u.name == "Relic Contemptor Dreadnought")
      .unwrap();
    assert!(relic.forge_world);
    assert_eq!(relic.line, 12);

    assert_eq!(parsed.detachments.len(), 1);
    assert_eq!(parsed.detachments[0].name, "Gladius Task Force");
    let enh: Vec<_> = parsed
      .enhancements
      .iter()
      .map(|e| (e.detachment.as_str(), e.name.as_str(), e.points))
      .collect();
    assert_eq!(enh, [
      ("Gladius Task Force", "Adept of the Codex", 20),
      ("Gladius Task Force", "Artificer Armour", 10),
    ]);
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
  }

  #[test]
  fn name_on_previous_line() {
    let parsed =
      parse("CODEX: SPACE MARINES\nIntercessor Squad\n5 models ........ 100 pts\n");
    assert_eq!(parsed.units.len(), 1);
    let unit = &parsed.units[0];
    assert_eq!(unit.name, "Intercessor Squad");
    assert_eq!((unit.model_count, unit.points), (5, 100));
    assert_eq!(unit.faction, "SPACE MARINES");
    assert!(!unit.forge_world);
  }

  #[test]
  fn lookback_window_is_five_lines() {
    let within = "CODEX: ORKS\nBoyz\n\n\n\n\n10 models ..... 85 pts\n";
    assert_eq!(parse(within).units[0].name, "Boyz");

    let beyond = "CODEX: ORKS\nBoyz\n\n\n\n\n\n10 models ..... 85 pts\n";
    let parsed = parse(beyond);
    assert!(parsed.units.is_empty());
    assert_eq!(parsed.diagnostics.len(), 1);
    assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::UnresolvedUnitName);
    assert_eq!(parsed.diagnostics[0].line, 8);
  }

  #[test]
  fn lookback_stops_at_structural_lines() {
    let parsed = parse("CODEX: ORKS\n10 models ..... 85 pts\n");
    assert!(parsed.units.is_empty());
    assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::UnresolvedUnitName);
  }

  #[test]
  fn inline_unit_captures_exact_values() {
    let parsed = parse("INDEX: ADEPTUS CUSTODES\nShield-Captain 1 model ...... 130 pts\n");
    let unit = &parsed.units[0];
    assert_eq!(unit.name, "Shield-Captain");
    assert_eq!((unit.model_count, unit.points), (1, 130));
  }

  #[test]
  fn codex_supplement_takes_name_from_next_line() {
    let parsed = parse(
      "CODEX SUPPLEMENT:\n\nBLOOD ANGELS\nDeath Company Marines\n5 models ..... 85 pts\n",
    );
    assert_eq!(parsed.factions.len(), 1);
    assert_eq!(parsed.factions[0].name, "BLOOD ANGELS");
    assert_eq!(parsed.units[0].name, "Death Company Marines");
    assert_eq!(parsed.units[0].faction, "BLOOD ANGELS");
  }

  #[test]
  fn imperial_agents_subsections() {
    let text = "\
CODEX: IMPERIAL AGENTS
AGENTS OF THE IMPERIUM
Inquisitor
1 model ..... 55 pts
EVERY MODEL HAS THE
IMPERIUM KEYWORD
Callidus Assassin
1 model ..... 100 pts
";
    let parsed = parse(text);
    let factions: Vec<_> = parsed
      .factions
      .iter()
      .map(|f| (f.name.as_str(), f.ally_to.as_deref()))
      .collect();
    assert_eq!(factions, [
      ("IMPERIAL AGENTS", None),
      (AGENTS_OF_THE_IMPERIUM, Some("Imperium")),
      (EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD, Some("Imperium")),
    ]);
    assert_eq!(parsed.units[0].faction, AGENTS_OF_THE_IMPERIUM);
    assert_eq!(parsed.units[1].faction, EVERY_MODEL_HAS_THE_IMPERIUM_KEYWORD);
    assert_eq!(parsed.units[1].name, "Callidus Assassin");
  }

  #[test]
  fn agents_markers_outside_imperial_agents_are_ignored() {
    let parsed = parse("CODEX: ORKS\nAGENTS OF THE IMPERIUM\nBoyz\n10 models ... 85 pts\n");
    assert_eq!(parsed.factions.len(), 1);
    assert_eq!(parsed.units[0].faction, "ORKS");
  }

  #[test]
  fn enhancement_before_detachment_is_reported() {
    let parsed =
      parse("CODEX: ORKS\nDETACHMENT ENHANCEMENTS\nHeadwoppa's Killchoppa ..... 20 pts\n");
    assert!(parsed.enhancements.is_empty());
    // The enhancement line itself cannot be a detachment header.
    assert!(parsed.detachments.is_empty());
    assert_eq!(
      parsed.diagnostics[0].kind,
      DiagnosticKind::EnhancementWithoutDetachment
    );
  }

  #[test]
  fn units_carry_a_detachment_only_inside_the_enhancement_section() {
    let parsed = parse(
      "CODEX: ORKS\n\
       Warboss\n\
       Waaagh! Tribe\n\
       1 model ..... 75 pts\n\
       DETACHMENT ENHANCEMENTS\n\
       Waaagh! Tribe\n\
       Headwoppa's Killchoppa ..... 20 pts\n\
       Beastboss 1 model ..... 85 pts\n",
    );
    // Outside the enhancement section a bare line is a unit-name candidate,
    // never a detachment header.
    assert_eq!(parsed.detachments.len(), 1);
    assert_eq!(parsed.units[0].name, "Waaagh! Tribe");
    assert_eq!(parsed.units[0].detachment, None);

    assert_eq!(parsed.units[1].name, "Beastboss");
    assert_eq!(parsed.units[1].detachment.as_deref(), Some("Waaagh! Tribe"));
    assert_eq!(parsed.enhancements[0].detachment, "Waaagh! Tribe");
  }

  #[test]
  fn points_before_any_faction() {
    let parsed = parse("Boyz 10 models ..... 85 pts\n");
    assert!(parsed.units.is_empty());
    assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::OutsideFaction);
  }

  #[test]
  fn version_ignored_after_first_faction() {
    let parsed = parse("CODEX: ORKS\nVersion 9.9\n");
    assert_eq!(parsed.version, None);
  }

  #[test]
  fn faction_repeated_is_recorded_once() {
    let parsed = parse("CODEX: ORKS\nBoyz\n10 models .. 85 pts\nCODEX: ORKS\nGretchin\n11 models .. 40 pts\n");
    assert_eq!(parsed.factions.len(), 1);
    assert_eq!(parsed.units.len(), 2);
  }

  #[test]
  fn step_is_pure() {
    let lines = ["CODEX: ORKS"];
    let state = ParseState::default();
    let cursor = Cursor::new(&lines, 0);
    assert_eq!(step(&state, &cursor), step(&state, &cursor));
    assert_eq!(state, ParseState::default());
  }
}
