//! Flat records produced by parsing a raw MFM bulletin.
//!
//! These mirror the text, not the database: names are strings, duplicates are
//! kept, and every record remembers the 1-based source line it came from.

use serde::{Deserialize, Serialize};

use crate::model::Supergroup;

/// A faction header (or a synthetic faction) in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRecord {
  pub name:       String,
  pub supergroup: Supergroup,
  pub ally_to:    Option<String>,
  pub line:       usize,
}

/// A detachment header inside an enhancements section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachmentRecord {
  pub faction: String,
  pub name:    String,
  pub line:    usize,
}

/// One purchasable unit size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
  pub faction:     String,
  pub detachment:  Option<String>,
  pub name:        String,
  pub model_count: u32,
  pub points:      u32,
  pub forge_world: bool,
  pub line:        usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementRecord {
  pub faction:    String,
  pub detachment: String,
  pub name:       String,
  pub points:     u32,
  pub line:       usize,
}

/// Why a line was skipped or a record dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
  /// The line matched nothing the parser knows.
  Unrecognized,
  /// A models-only points line with no name within the lookback window.
  UnresolvedUnitName,
  /// A points line before any faction header.
  OutsideFaction,
  /// An enhancement line before any detachment header.
  EnhancementWithoutDetachment,
}

impl DiagnosticKind {
  pub fn describe(self) -> &'static str {
    match self {
      Self::Unrecognized => "unrecognized line",
      Self::UnresolvedUnitName => "unit name not found within lookback window",
      Self::OutsideFaction => "points line outside any faction",
      Self::EnhancementWithoutDetachment => "enhancement without a detachment",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
  pub line: usize,
  pub text: String,
  pub kind: DiagnosticKind,
}

/// Everything extracted from one bulletin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBulletin {
  pub version:       Option<String>,
  pub release_label: Option<String>,
  pub factions:      Vec<FactionRecord>,
  pub detachments:   Vec<DetachmentRecord>,
  pub units:         Vec<UnitRecord>,
  pub enhancements:  Vec<EnhancementRecord>,
  pub diagnostics:   Vec<Diagnostic>,
}

impl ParsedBulletin {
  /// `(name, model_count, points)` triples, sorted. The comparison key used
  /// by round-trip checks.
  pub fn unit_triples(&self) -> Vec<(String, u32, u32)> {
    let mut triples: Vec<_> = self
      .units
      .iter()
      .map(|u| (u.name.clone(), u.model_count, u.points))
      .collect();
    triples.sort();
    triples
  }
}
