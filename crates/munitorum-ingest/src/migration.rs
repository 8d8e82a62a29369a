//! Bulk migration from structured points files.
//!
//! A migration directory holds one or more version sets:
//!
//! | File | Content |
//! |------|---------|
//! | `mfm-base<suffix>.js` | `window.MFM_BASE`: version, date, faction metadata |
//! | `mfm-units<suffix>.js` | `window.MFM_UNITS`: units and their sizes |
//! | `mfm-detachments<suffix>.js` | `window.MFM_DETACHMENTS`: enhancements |
//!
//! Base files are processed in file-name order. A failing set is logged and
//! skipped; the latest flag is recomputed once all sets are done.

use std::path::{Path, PathBuf};

use munitorum_core::{model::NewVersion, store::MfmStore};
use munitorum_text::structured::{
  BaseFile, DetachmentsFile, UnitsFile, build_structured_graph,
  parse_assignment,
};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::{
  Error, Result,
  ingest::{IngestOutcome, display_name, refresh_latest, write_version},
  mapper::GraphCounts,
};

const BASE_PREFIX: &str = "mfm-base";
const UNITS_PREFIX: &str = "mfm-units";
const DETACHMENTS_PREFIX: &str = "mfm-detachments";
const EXTENSION: &str = ".js";

#[derive(Debug, Clone)]
pub struct MigrationOptions {
  pub directory: PathBuf,
  pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationFailure {
  pub file:    String,
  pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
  pub processed: Vec<IngestOutcome>,
  pub failures:  Vec<MigrationFailure>,
  /// The version flagged latest after the run.
  pub latest:    Option<String>,
}

/// Base files in `dir`, sorted by name.
pub async fn discover_base_files(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| Error::io(dir, e))?;
  let mut found = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
    let name = entry.file_name().to_string_lossy().into_owned();
    if name.starts_with(BASE_PREFIX) && name.ends_with(EXTENSION) {
      found.push(entry.path());
    }
  }
  found.sort();
  Ok(found)
}

/// The `(units, detachments)` companions of a base file.
pub fn companion_paths(base: &Path) -> Option<(PathBuf, PathBuf)> {
  let name = base.file_name()?.to_str()?;
  let suffix = name.strip_prefix(BASE_PREFIX)?.strip_suffix(EXTENSION)?;
  let dir = base.parent().unwrap_or_else(|| Path::new(""));
  Some((
    dir.join(format!("{UNITS_PREFIX}{suffix}{EXTENSION}")),
    dir.join(format!("{DETACHMENTS_PREFIX}{suffix}{EXTENSION}")),
  ))
}

/// Migrate every version set in the configured directory.
///
/// Only an unreadable directory fails the whole run; anything wrong with a
/// single set is recorded in [`MigrationReport::failures`].
pub async fn migrate_directory<S: MfmStore>(
  store: &S,
  options: &MigrationOptions,
) -> Result<MigrationReport> {
  let bases = discover_base_files(&options.directory).await?;
  info!(
    directory = %options.directory.display(),
    sets = bases.len(),
    overwrite = options.overwrite,
    "starting MFM migration"
  );

  let mut report = MigrationReport::default();
  for base in &bases {
    match migrate_set(store, base, options.overwrite).await {
      Ok(outcome) => {
        info!(
          file = %display_name(base),
          version = %outcome.version,
          status = ?outcome.status,
          "migrated version set"
        );
        report.processed.push(outcome);
      }
      Err(e) => {
        warn!(file = %display_name(base), error = %e, "migration of version set failed");
        report.failures.push(MigrationFailure {
          file:    display_name(base),
          message: e.to_string(),
        });
      }
    }
  }

  report.latest = refresh_latest(store).await?.map(|v| v.version);
  info!(
    processed = report.processed.len(),
    failed = report.failures.len(),
    latest = ?report.latest,
    "MFM migration finished"
  );
  Ok(report)
}

/// Migrate the version set anchored at one base file.
pub async fn migrate_set<S: MfmStore>(
  store: &S,
  base_path: &Path,
  overwrite: bool,
) -> Result<IngestOutcome> {
  let source_name = display_name(base_path);
  let base_text = tokio::fs::read_to_string(base_path)
    .await
    .map_err(|e| Error::io(base_path, e))?;
  let base: BaseFile = parse_assignment(&base_text)?;

  let version = base.version.trim().to_owned();
  if version.is_empty() {
    return Err(Error::MissingVersion(source_name));
  }

  let (units_path, detachments_path) = companion_paths(base_path).ok_or_else(|| {
    let kind = std::io::ErrorKind::InvalidInput;
    Error::io(base_path, std::io::Error::new(kind, "not an mfm-base file"))
  })?;
  let (units_text, units): (String, UnitsFile) = read_companion(&units_path).await?;
  let (det_text, detachments): (String, DetachmentsFile) =
    read_companion(&detachments_path).await?;

  let graph = build_structured_graph(&base, &units, &detachments, &version);
  let counts = GraphCounts::of(&graph);

  let mut hasher = Sha256::new();
  for text in [&base_text, &units_text, &det_text] {
    hasher.update(text.as_bytes());
  }
  let new_version = NewVersion {
    version:       version.clone(),
    release_label: base.date.clone(),
    source_hash:   Some(hex::encode(hasher.finalize())),
  };

  let status = write_version(store, new_version, graph, overwrite).await?;
  Ok(IngestOutcome {
    version,
    source_name,
    status,
    counts,
    diagnostics: Vec::new(),
  })
}

/// Read and parse a companion file. A missing file reads as empty.
async fn read_companion<T>(path: &Path) -> Result<(String, T)>
where
  T: DeserializeOwned + Default,
{
  match tokio::fs::read_to_string(path).await {
    Ok(text) => {
      let value = parse_assignment(&text)?;
      Ok((text, value))
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      warn!(file = %path.display(), "companion file missing, treating as empty");
      Ok((String::new(), T::default()))
    }
    Err(e) => Err(Error::io(path, e)),
  }
}
