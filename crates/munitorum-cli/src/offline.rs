//! Commands that work on local files without a server.

use std::{fmt::Write as _, path::Path};

use anyhow::{Context, Result};
use chrono::Utc;
use munitorum_core::bulletin::ParsedBulletin;
use munitorum_ingest::{GraphCounts, build_graph, format_feedback_report};
use munitorum_text::{Comparison, compare};

pub fn read(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// One-screen summary of a parse.
pub fn parse_summary(name: &str, parsed: &ParsedBulletin) -> String {
  let counts = GraphCounts::of(&build_graph(parsed));
  let mut out = String::new();
  let _ = writeln!(out, "{name}");
  let _ = writeln!(out, "  version:      {}", parsed.version.as_deref().unwrap_or("(none)"));
  let _ = writeln!(
    out,
    "  release:      {}",
    parsed.release_label.as_deref().unwrap_or("(none)")
  );
  let _ = writeln!(out, "  factions:     {}", counts.factions);
  let _ = writeln!(out, "  units:        {} ({} sizes)", counts.units, counts.variants);
  let _ = writeln!(out, "  detachments:  {}", counts.detachments);
  let _ = writeln!(out, "  enhancements: {}", counts.enhancements);
  let _ = writeln!(out, "  skipped:      {}", parsed.diagnostics.len());
  out
}

/// `mfm parse <file> [--json]`
pub fn parse(path: &Path, json: bool) -> Result<String> {
  let parsed = munitorum_text::parse(&read(path)?);
  if json {
    serde_json::to_string_pretty(&parsed).context("serialising parse result")
  } else {
    Ok(parse_summary(&display_name(path), &parsed))
  }
}

/// `mfm feedback <file>`
pub fn feedback(path: &Path) -> Result<String> {
  let parsed = munitorum_text::parse(&read(path)?);
  Ok(format_feedback_report(&display_name(path), &parsed, Utc::now()))
}

/// `mfm diff <original> <regenerated>`
pub fn diff(original: &Path, regenerated: &Path) -> Result<(String, Comparison)> {
  let comparison = compare(&read(original)?, &read(regenerated)?);
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{} of {} original lines matched ({:.2}%)",
    comparison.matches,
    comparison.original_lines,
    comparison.match_percentage()
  );
  for d in &comparison.differences {
    let _ = writeln!(
      out,
      "  [{}] {:?} (original {}, regenerated {})",
      d.message, d.line, d.original_count, d.regenerated_count
    );
  }
  Ok((out, comparison))
}

fn display_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEXT: &str = "\
MUNITORUM FIELD MANUAL v3.2
June 2025
CODEX: ORKS
Boyz
10 models ....... 85 pts
20 models ....... 170 pts
DETACHMENT ENHANCEMENTS
Waaagh! Tribe
Headwoppa's Killchoppa ....... 20 pts
";

  fn file(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
  }

  #[test]
  fn summary_counts() {
    let dir = tempfile::tempdir().unwrap();
    let out = parse(&file(dir.path(), "orks.txt", TEXT), false).unwrap();
    assert!(out.starts_with("orks.txt\n"));
    assert!(out.contains("  version:      3.2\n"));
    assert!(out.contains("  units:        1 (2 sizes)\n"));
    assert!(out.contains("  enhancements: 1\n"));
    assert!(out.contains("  skipped:      0\n"));
  }

  #[test]
  fn json_output_is_the_parse_result() {
    let dir = tempfile::tempdir().unwrap();
    let out = parse(&file(dir.path(), "orks.txt", TEXT), true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["version"], "3.2");
    assert_eq!(value["units"][1]["points"], 170);
  }

  #[test]
  fn diff_reports_changed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let a = file(dir.path(), "a.txt", TEXT);
    let b = file(dir.path(), "b.txt", &TEXT.replace("170 pts", "175 pts"));
    let (out, comparison) = diff(&a, &b).unwrap();
    assert_eq!(comparison.differences.len(), 2);
    assert!(out.contains("[Missing in regenerated] \"20 models . 170 pts\""));
    assert!(out.contains("[Extra in regenerated] \"20 models . 175 pts\""));
  }

  #[test]
  fn missing_file_names_the_path() {
    let err = feedback(Path::new("/definitely/not/here.txt")).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.txt"));
  }
}
