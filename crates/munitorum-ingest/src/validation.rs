//! Regenerate a stored version and compare it with its source bulletin.
//!
//! A mismatch is a result, not an error: the report says how close the
//! stored graph comes to the source text.

use std::path::Path;

use munitorum_core::store::MfmStore;
use munitorum_text::{Difference, compare, render};
use serde::Serialize;
use tracing::info;

use crate::{
  Error, Result,
  ingest::{display_name, resolve_version},
};

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
  pub version:           String,
  pub source_name:       String,
  pub original_lines:    usize,
  pub regenerated_lines: usize,
  pub matches:           usize,
  pub match_percentage:  f64,
  pub differences:       Vec<Difference>,
}

/// Regenerated bulletin text for `version` (`latest` allowed).
pub async fn regenerate<S: MfmStore>(store: &S, version: &str) -> Result<String> {
  let v = resolve_version(store, Some(version)).await?;
  let snapshot = store
    .snapshot(v.version_id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::VersionNotFound(v.version.clone()))?;
  Ok(render(&snapshot))
}

/// Validate `text` against the stored version it declares, or against
/// `version` when given.
pub async fn validate_text<S: MfmStore>(
  store: &S,
  text: &str,
  source_name: &str,
  version: Option<&str>,
) -> Result<ValidationReport> {
  let version = match version.map(str::trim).filter(|v| !v.is_empty()) {
    Some(v) => v.to_owned(),
    None => munitorum_text::parse(text)
      .version
      .ok_or_else(|| Error::MissingVersion(source_name.to_owned()))?,
  };

  let regenerated = regenerate(store, &version).await?;
  let comparison = compare(text, &regenerated);

  let report = ValidationReport {
    version,
    source_name: source_name.to_owned(),
    original_lines: comparison.original_lines,
    regenerated_lines: comparison.regenerated_lines,
    matches: comparison.matches,
    match_percentage: comparison.match_percentage(),
    differences: comparison.differences,
  };
  info!(
    version = %report.version,
    source = %report.source_name,
    matches = report.matches,
    differences = report.differences.len(),
    percentage = %format!("{:.2}", report.match_percentage),
    "validated MFM text"
  );
  Ok(report)
}

/// Read `path` and validate it.
pub async fn validate_file<S: MfmStore>(
  store: &S,
  path: &Path,
  version: Option<&str>,
) -> Result<ValidationReport> {
  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| Error::io(path, e))?;
  validate_text(store, &text, &display_name(path), version).await
}
