//! Line normalisation and multiset comparison of bulletin texts.

use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::patterns;

static ADJUSTMENT_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"\(\s*[+\-\x{2212}\x{2013}]?\s*\d+\s*\)").unwrap()
});
static DOT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:\s*\.)+").unwrap());
static POINTS_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)(\d+)\s*pts\b\.?").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Canonical form of a line for comparison, or `None` for lines that never
/// take part (blank, page numbers).
///
/// Strips point adjustments, reduces dot leaders to a single dot, writes
/// points as `N pts`, and collapses whitespace. Applying it twice gives the
/// same result as applying it once.
pub fn normalize_line(line: &str) -> Option<String> {
  let line = line.trim();
  if line.is_empty() || patterns::is_page_number(line) {
    return None;
  }
  let line = strip_adjustments(line);
  let line = DOT_RUN_RE.replace_all(&line, " . ");
  let line = POINTS_RE.replace_all(&line, "$1 pts");
  let line = WHITESPACE_RE.replace_all(&line, " ");
  let line = line.trim();
  (!line.is_empty() && !patterns::is_page_number(line)).then(|| line.to_owned())
}

/// Remove `(±N)` adjustments until none are left; dropping an inner one can
/// expose an outer one.
fn strip_adjustments(line: &str) -> String {
  let mut line = line.to_owned();
  loop {
    let next = ADJUSTMENT_RE.replace_all(&line, " ").into_owned();
    if next == line {
      return line;
    }
    line = next;
  }
}

/// Count of each normalised line.
pub fn line_multiset(text: &str) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for line in text.lines().filter_map(normalize_line) {
    *counts.entry(line).or_default() += 1;
  }
  counts
}

// ─── Comparison ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
  /// The original has more copies of the line.
  MissingInRegenerated,
  /// The regenerated text has more copies of the line.
  ExtraInRegenerated,
}

impl fmt::Display for DifferenceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::MissingInRegenerated => "Missing in regenerated",
      Self::ExtraInRegenerated => "Extra in regenerated",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
  pub line:              String,
  pub original_count:    usize,
  pub regenerated_count: usize,
  pub kind:              DifferenceKind,
  pub message:           String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
  /// Distinct lines with the same count on both sides.
  pub matches:           usize,
  pub differences:       Vec<Difference>,
  /// Normalised, non-blank line totals.
  pub original_lines:    usize,
  pub regenerated_lines: usize,
}

impl Comparison {
  pub fn match_percentage(&self) -> f64 {
    let total = self.matches + self.differences.len();
    if total == 0 {
      100.0
    } else {
      self.matches as f64 / total as f64 * 100.0
    }
  }

  pub fn is_exact(&self) -> bool { self.differences.is_empty() }
}

/// Compare two texts as multisets of normalised lines. Differences come out
/// in line order.
pub fn compare(original: &str, regenerated: &str) -> Comparison {
  let left = line_multiset(original);
  let right = line_multiset(regenerated);

  let mut comparison = Comparison {
    original_lines: left.values().sum(),
    regenerated_lines: right.values().sum(),
    ..Default::default()
  };

  let mut keys: Vec<&String> = left.keys().chain(right.keys()).collect();
  keys.sort();
  keys.dedup();

  for line in keys {
    let original_count = left.get(line).copied().unwrap_or(0);
    let regenerated_count = right.get(line).copied().unwrap_or(0);
    if original_count == regenerated_count {
      comparison.matches += 1;
      continue;
    }
    let kind = if original_count > regenerated_count {
      DifferenceKind::MissingInRegenerated
    } else {
      DifferenceKind::ExtraInRegenerated
    };
    comparison.differences.push(Difference {
      line: line.clone(),
      original_count,
      regenerated_count,
      kind,
      message: kind.to_string(),
    });
  }
  comparison
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalizes_leaders_adjustments_and_points() {
    assert_eq!(
      normalize_line("  5 models ...... (-15) ...... 160pts ").as_deref(),
      Some("5 models . 160 pts")
    );
    assert_eq!(
      normalize_line("5 models . . . . 160 pts").as_deref(),
      Some("5 models . 160 pts")
    );
    assert_eq!(
      normalize_line("Adept of the Codex.......20 PTS").as_deref(),
      Some("Adept of the Codex . 20 pts")
    );
    assert_eq!(normalize_line("St. Celestine").as_deref(), Some("St. Celestine"));
  }

  #[test]
  fn blank_and_page_lines_drop_out() {
    assert_eq!(normalize_line(""), None);
    assert_eq!(normalize_line("   "), None);
    assert_eq!(normalize_line("17"), None);
  }

  #[test]
  fn normalization_is_idempotent() {
    for line in [
      "5 models ...... (-15) ...... 160pts",
      "Terminator Squad 5 models .. (+10) .. 170 pts.",
      "x. .y",
      "20pts..",
      "CODEX:   SPACE    MARINES",
      "a . . b (+3)",
      "Boyz (+3(+4))",
      "12 (+3)",
    ] {
      let Some(once) = normalize_line(line) else { continue };
      assert_eq!(normalize_line(&once).as_deref(), Some(once.as_str()), "{line}");
    }
    assert_eq!(normalize_line("Boyz (+3(+4))").as_deref(), Some("Boyz"));
    assert_eq!(normalize_line("12 (+3)"), None);
  }

  #[test]
  fn compare_counts_distinct_lines() {
    let original = "A\nA\nB\n5 models .... 80 pts\n";
    let regenerated = "A\nB\nC\n5 models ............ 80 pts\n";
    let cmp = compare(original, regenerated);
    assert_eq!(cmp.matches, 2);
    assert_eq!(cmp.original_lines, 4);
    assert_eq!(cmp.regenerated_lines, 4);
    assert_eq!(cmp.differences, vec![
      Difference {
        line:              "A".into(),
        original_count:    2,
        regenerated_count: 1,
        kind:              DifferenceKind::MissingInRegenerated,
        message:           "Missing in regenerated".into(),
      },
      Difference {
        line:              "C".into(),
        original_count:    0,
        regenerated_count: 1,
        kind:              DifferenceKind::ExtraInRegenerated,
        message:           "Extra in regenerated".into(),
      },
    ]);
    assert!((cmp.match_percentage() - 50.0).abs() < f64::EPSILON);
  }

  #[test]
  fn empty_texts_match_fully() {
    let cmp = compare("\n\n", "12\n");
    assert!(cmp.is_exact());
    assert_eq!(cmp.match_percentage(), 100.0);
  }
}
