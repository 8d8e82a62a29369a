//! Fixed line patterns for MFM bulletin text.
//!
//! [`classify`] is context-free: it looks at one trimmed line and says what
//! the line *could* be. Whether a candidate is acted upon (a detachment
//! header, an Imperial Agents subsection) is decided by the parser's state.

use once_cell::sync::Lazy;
use regex::Regex;

// ─── Regexes ──────────────────────────────────────────────────────────────────

/// `(-15)`, `(+10)`, also with typographic minus signs.
const ADJUSTMENT: &str = r"(?:\([+\-\x{2212}\x{2013}]?\s*\d+\)[\s.]*)?";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)\b(?:version\s*:?\s*v?|v)(?P<version>\d+(?:\.\d+)+)\b").unwrap()
});

static RELEASE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)\b(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{4}\b",
  )
  .unwrap()
});

static FACTION_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^(?P<kind>codex\s+supplement|codex|index)\s*(?::\s*(?P<name>.*?))?\s*$")
    .unwrap()
});

static UNIT_MODELS_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"(?i)^(?P<models>\d+)\s+models?\b[\s.]*{ADJUSTMENT}(?P<points>\d+)\s*pts\.?$"
  ))
  .unwrap()
});

static UNIT_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"(?i)^(?P<name>\S.*?)[\s.]+(?P<models>\d+)\s+models?\b[\s.]*{ADJUSTMENT}(?P<points>\d+)\s*pts\.?$"
  ))
  .unwrap()
});

static ENHANCEMENT_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(&format!(
    r"(?i)^(?P<name>\S.*?)[\s.]+{ADJUSTMENT}(?P<points>\d+)\s*pts\.?$"
  ))
  .unwrap()
});

static MODEL_TOKEN_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\bmodels?\b").unwrap());

static FORGE_WORLD_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\bforge\s+world\s+points\b").unwrap());

static ENHANCEMENT_SECTION_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^detachment\s+enhancements\b").unwrap());

static AGENTS_OF_THE_IMPERIUM_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^agents\s+of\s+the\s+imperium$").unwrap());

static EVERY_MODEL_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^every\s+model\s+has\s+the\b").unwrap());

static IMPERIUM_KEYWORD_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\bimperium\s+keyword\b").unwrap());

static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

// ─── Classification ──────────────────────────────────────────────────────────

/// What a single line looks like, independent of parse state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
  Blank,
  PageNumber,
  /// `CODEX: X`, `INDEX: X`, `CODEX SUPPLEMENT: X`; `name` is `None` when the
  /// header carries no name on the same line.
  FactionHeader { name: Option<&'a str> },
  AgentsOfTheImperium,
  /// First line of the "every model has the Imperium keyword" marker.
  /// `complete` is true when the keyword is on the same line.
  EveryModelHas { complete: bool },
  /// A dangling "Imperium keyword" continuation line.
  ImperiumKeywordTail,
  ForgeWorldMarker,
  EnhancementMarker,
  UnitInline { name: &'a str, models: u32, points: u32 },
  UnitModelsOnly { models: u32, points: u32 },
  Enhancement { name: &'a str, points: u32 },
  Text,
}

impl LineKind<'_> {
  /// Headers and markers that delimit sections.
  pub(crate) fn is_structural(&self) -> bool {
    matches!(
      self,
      Self::FactionHeader { .. }
        | Self::AgentsOfTheImperium
        | Self::EveryModelHas { .. }
        | Self::ImperiumKeywordTail
        | Self::ForgeWorldMarker
        | Self::EnhancementMarker
    )
  }
}

/// Classify one line. The input is trimmed before matching.
pub(crate) fn classify(raw: &str) -> LineKind<'_> {
  let line = raw.trim();
  if line.is_empty() {
    return LineKind::Blank;
  }
  if PAGE_NUMBER_RE.is_match(line) {
    return LineKind::PageNumber;
  }
  if let Some(caps) = FACTION_HEADER_RE.captures(line) {
    let name = caps
      .name("name")
      .map(|m| m.as_str().trim())
      .filter(|s| !s.is_empty());
    return LineKind::FactionHeader { name };
  }
  if AGENTS_OF_THE_IMPERIUM_RE.is_match(line) {
    return LineKind::AgentsOfTheImperium;
  }
  if EVERY_MODEL_RE.is_match(line) {
    return LineKind::EveryModelHas {
      complete: IMPERIUM_KEYWORD_RE.is_match(line),
    };
  }
  if IMPERIUM_KEYWORD_RE.is_match(line) && !line.to_lowercase().contains("pts") {
    return LineKind::ImperiumKeywordTail;
  }
  if FORGE_WORLD_RE.is_match(line) {
    return LineKind::ForgeWorldMarker;
  }
  if ENHANCEMENT_SECTION_RE.is_match(line) {
    return LineKind::EnhancementMarker;
  }
  if let Some(caps) = UNIT_MODELS_ONLY_RE.captures(line)
    && let (Some(models), Some(points)) =
      (capture_u32(&caps, "models"), capture_u32(&caps, "points"))
  {
    return LineKind::UnitModelsOnly { models, points };
  }
  if let Some(caps) = UNIT_INLINE_RE.captures(line)
    && let (Some(name), Some(models), Some(points)) = (
      caps.name("name"),
      capture_u32(&caps, "models"),
      capture_u32(&caps, "points"),
    )
  {
    return LineKind::UnitInline {
      name: trim_leader(name.as_str()),
      models,
      points,
    };
  }
  if let Some(caps) = ENHANCEMENT_RE.captures(line)
    && let (Some(name), Some(points)) =
      (caps.name("name"), capture_u32(&caps, "points"))
    && !MODEL_TOKEN_RE.is_match(name.as_str())
  {
    return LineKind::Enhancement {
      name: trim_leader(name.as_str()),
      points,
    };
  }
  LineKind::Text
}

fn capture_u32(caps: &regex::Captures<'_>, group: &str) -> Option<u32> {
  caps.name(group).and_then(|m| m.as_str().parse().ok())
}

/// Strip a trailing dot leader that the lazy name group may have kept.
fn trim_leader(name: &str) -> &str {
  name.trim_end_matches(|c: char| c == '.' || c.is_whitespace())
}

// ─── Other line predicates ───────────────────────────────────────────────────

/// The version string declared on `line`, if any.
pub(crate) fn version_in(line: &str) -> Option<&str> {
  VERSION_RE
    .captures(line)
    .and_then(|c| c.name("version"))
    .map(|m| m.as_str())
}

/// A `<Month> <Year>` release label on `line`, if any.
pub(crate) fn release_label_in(line: &str) -> Option<&str> {
  RELEASE_RE.find(line).map(|m| m.as_str())
}

/// True for lines that only hold a page number.
pub(crate) fn is_page_number(line: &str) -> bool {
  PAGE_NUMBER_RE.is_match(line.trim())
}

/// True when `line` mentions points or models anywhere (case-insensitive).
/// Such lines are never names.
pub(crate) fn mentions_points_or_models(line: &str) -> bool {
  let lower = line.to_lowercase();
  lower.contains("pts") || lower.contains("model")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn models_only_line() {
    assert_eq!(
      classify("5 models ........ 100 pts"),
      LineKind::UnitModelsOnly { models: 5, points: 100 }
    );
    assert_eq!(
      classify("1 model .......... 65 pts"),
      LineKind::UnitModelsOnly { models: 1, points: 65 }
    );
  }

  #[test]
  fn inline_unit_line() {
    assert_eq!(
      classify("Terminator Squad 5 models .......... 170 pts"),
      LineKind::UnitInline { name: "Terminator Squad", models: 5, points: 170 }
    );
  }

  #[test]
  fn point_adjustment_is_tolerated_and_dropped() {
    assert_eq!(
      classify("10 models ...... (-15) ...... 160 pts"),
      LineKind::UnitModelsOnly { models: 10, points: 160 }
    );
    assert_eq!(
      classify("Captain 1 model ....(+10)..... 90 pts"),
      LineKind::UnitInline { name: "Captain", models: 1, points: 90 }
    );
  }

  #[test]
  fn enhancement_line_has_no_model_token() {
    assert_eq!(
      classify("Adept of the Codex ................ 20 pts"),
      LineKind::Enhancement { name: "Adept of the Codex", points: 20 }
    );
    assert_eq!(
      classify("Artificer Armour.......10pts"),
      LineKind::Enhancement { name: "Artificer Armour", points: 10 }
    );
  }

  #[test]
  fn faction_headers() {
    assert_eq!(
      classify("CODEX: SPACE MARINES"),
      LineKind::FactionHeader { name: Some("SPACE MARINES") }
    );
    assert_eq!(
      classify("Index: Imperial Knights"),
      LineKind::FactionHeader { name: Some("Imperial Knights") }
    );
    assert_eq!(
      classify("CODEX SUPPLEMENT:"),
      LineKind::FactionHeader { name: None }
    );
    assert_eq!(
      classify("CODEX SUPPLEMENT"),
      LineKind::FactionHeader { name: None }
    );
    assert_eq!(classify("Codex Warriors"), LineKind::Text);
  }

  #[test]
  fn markers() {
    assert_eq!(classify("FORGE WORLD POINTS VALUES"), LineKind::ForgeWorldMarker);
    assert_eq!(classify("DETACHMENT ENHANCEMENTS"), LineKind::EnhancementMarker);
    assert_eq!(classify("AGENTS OF THE IMPERIUM"), LineKind::AgentsOfTheImperium);
    assert_eq!(
      classify("EVERY MODEL HAS THE"),
      LineKind::EveryModelHas { complete: false }
    );
    assert_eq!(
      classify("Every model has the Imperium keyword"),
      LineKind::EveryModelHas { complete: true }
    );
    assert_eq!(classify("IMPERIUM KEYWORD"), LineKind::ImperiumKeywordTail);
  }

  #[test]
  fn blank_page_and_text() {
    assert_eq!(classify("   "), LineKind::Blank);
    assert_eq!(classify("42"), LineKind::PageNumber);
    assert_eq!(classify("Intercessor Squad"), LineKind::Text);
  }

  #[test]
  fn version_and_release_label() {
    assert_eq!(version_in("MUNITORUM FIELD MANUAL v3.2"), Some("3.2"));
    assert_eq!(version_in("Version: 2.10"), Some("2.10"));
    assert_eq!(version_in("Intercessor Squad"), None);
    assert_eq!(release_label_in("Updated June 2025"), Some("June 2025"));
  }
}
