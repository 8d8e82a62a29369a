//! Plain-text validation and parser feedback reports.
//!
//! The `format_*` functions are pure so the HTTP layer can serve the same
//! text that [`ReportWriter`] puts on disk.

use std::{
  collections::BTreeMap,
  fmt::Write as _,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use munitorum_core::bulletin::{Diagnostic, DiagnosticKind, ParsedBulletin};
use tracing::info;

use crate::{Error, Result, validation::ValidationReport};

const RULE: &str = "------------------------------------------------------------";

pub fn format_validation_report(
  report: &ValidationReport,
  generated_at: DateTime<Utc>,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "MFM VALIDATION REPORT");
  let _ = writeln!(out, "{RULE}");
  let _ = writeln!(out, "Generated:         {}", generated_at.to_rfc3339());
  let _ = writeln!(out, "Version:           {}", report.version);
  let _ = writeln!(out, "Source:            {}", report.source_name);
  let _ = writeln!(out, "Original lines:    {}", report.original_lines);
  let _ = writeln!(out, "Regenerated lines: {}", report.regenerated_lines);
  let _ = writeln!(out, "Matching lines:    {}", report.matches);
  let _ = writeln!(out, "Match:             {:.2}%", report.match_percentage);
  let _ = writeln!(out, "{RULE}");

  if report.differences.is_empty() {
    let _ = writeln!(out, "No differences.");
    return out;
  }
  let _ = writeln!(out, "Differences ({}):", report.differences.len());
  for d in &report.differences {
    let _ = writeln!(
      out,
      "  [{}] {:?} (original {}, regenerated {})",
      d.message, d.line, d.original_count, d.regenerated_count
    );
  }
  out
}

/// Summary of what the parser made of one file, with skipped lines grouped
/// by reason.
pub fn format_feedback_report(
  source_name: &str,
  parsed: &ParsedBulletin,
  generated_at: DateTime<Utc>,
) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "MFM PARSER FEEDBACK");
  let _ = writeln!(out, "{RULE}");
  let _ = writeln!(out, "Generated:     {}", generated_at.to_rfc3339());
  let _ = writeln!(out, "Source:        {source_name}");
  let _ = writeln!(out, "Version:       {}", parsed.version.as_deref().unwrap_or("(none)"));
  let _ = writeln!(
    out,
    "Release:       {}",
    parsed.release_label.as_deref().unwrap_or("(none)")
  );
  let _ = writeln!(out, "Factions:      {}", parsed.factions.len());
  let _ = writeln!(out, "Unit lines:    {}", parsed.units.len());
  let _ = writeln!(out, "Detachments:   {}", parsed.detachments.len());
  let _ = writeln!(out, "Enhancements:  {}", parsed.enhancements.len());
  let _ = writeln!(out, "Skipped lines: {}", parsed.diagnostics.len());
  let _ = writeln!(out, "{RULE}");

  let mut by_kind: BTreeMap<DiagnosticKind, Vec<&Diagnostic>> = BTreeMap::new();
  for d in &parsed.diagnostics {
    by_kind.entry(d.kind).or_default().push(d);
  }
  for (kind, diagnostics) in by_kind {
    let _ = writeln!(out, "{} ({}):", kind.describe(), diagnostics.len());
    for d in diagnostics {
      let _ = writeln!(out, "  line {:>5}: {}", d.line, d.text);
    }
  }
  out
}

/// File-system friendly form of a version or file stem.
fn slug(s: &str) -> String {
  s.chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '-' })
    .collect()
}

fn stamp(at: DateTime<Utc>) -> String { at.format("%Y%m%dT%H%M%SZ").to_string() }

/// Writes reports under one directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct ReportWriter {
  dir: PathBuf,
}

impl ReportWriter {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Write `mfm-validation-<version>-<stamp>.txt`.
  pub async fn write_validation(&self, report: &ValidationReport) -> Result<PathBuf> {
    let now = Utc::now();
    let name = format!("mfm-validation-{}-{}.txt", slug(&report.version), stamp(now));
    self.write(&name, &format_validation_report(report, now)).await
  }

  /// Write `mfm-feedback-<stem>-<stamp>.txt`.
  pub async fn write_feedback(
    &self,
    source_name: &str,
    parsed: &ParsedBulletin,
  ) -> Result<PathBuf> {
    let now = Utc::now();
    let stem = Path::new(source_name)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| source_name.to_owned());
    let name = format!("mfm-feedback-{}-{}.txt", slug(&stem), stamp(now));
    self
      .write(&name, &format_feedback_report(source_name, parsed, now))
      .await
  }

  async fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(&self.dir)
      .await
      .map_err(|e| Error::io(&self.dir, e))?;
    let path = self.dir.join(name);
    tokio::fs::write(&path, contents)
      .await
      .map_err(|e| Error::io(&path, e))?;
    info!(path = %path.display(), "report written");
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use munitorum_text::{Difference, DifferenceKind};

  use super::*;

  fn at() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() }

  fn report() -> ValidationReport {
    ValidationReport {
      version:           "3.2".into(),
      source_name:       "mfm.txt".into(),
      original_lines:    10,
      regenerated_lines: 9,
      matches:           7,
      match_percentage:  87.5,
      differences:       vec![Difference {
        line:              "Boyz 10 models . 85 pts".into(),
        original_count:    1,
        regenerated_count: 0,
        kind:              DifferenceKind::MissingInRegenerated,
        message:           "Missing in regenerated".into(),
      }],
    }
  }

  #[test]
  fn validation_report_text() {
    let text = format_validation_report(&report(), at());
    assert!(text.starts_with("MFM VALIDATION REPORT\n"));
    assert!(text.contains("Version:           3.2\n"));
    assert!(text.contains("Match:             87.50%\n"));
    assert!(text.contains(
      "  [Missing in regenerated] \"Boyz 10 models . 85 pts\" (original 1, regenerated 0)\n"
    ));
  }

  #[test]
  fn feedback_groups_by_kind() {
    let parsed = munitorum_text::parse(
      "Boyz 10 models ... 85 pts\nCODEX: ORKS\n10 models ... 85 pts\nweird 5 pts line\n",
    );
    let text = format_feedback_report("orks.txt", &parsed, at());
    assert!(text.contains("Version:       (none)\n"));
    assert!(text.contains("Skipped lines: 3\n"));
    assert!(text.contains("points line outside any faction (1):\n  line     1: Boyz 10 models ... 85 pts\n"));
    assert!(text.contains("unit name not found within lookback window (1):\n"));
    assert!(text.contains("unrecognized line (1):\n  line     4: weird 5 pts line\n"));
  }

  #[tokio::test]
  async fn writer_creates_directory_and_names_files() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ReportWriter::new(dir.path().join("logs"));

    let path = writer.write_validation(&report()).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("mfm-validation-3.2-"), "{name}");
    assert!(name.ends_with("Z.txt"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("87.50%"));

    let parsed = munitorum_text::parse("CODEX: ORKS\n");
    let path = writer.write_feedback("raw mfm 3.2.txt", &parsed).await.unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("mfm-feedback-raw-mfm-3.2-"), "{name}");
  }
}
