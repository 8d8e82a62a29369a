//! Raw-text ingestion: parse a bulletin and persist it as one version.

use std::path::Path;

use munitorum_core::{
  bulletin::Diagnostic,
  model::{MfmVersion, NewFaction, NewVersion},
  store::MfmStore,
  version::latest_by,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{
  Error, Result,
  mapper::{GraphCounts, build_graph},
};

/// Selector that resolves to the version flagged as latest.
pub const LATEST: &str = "latest";

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
  /// Used instead of the version declared in the text.
  pub version_override: Option<String>,
  /// Replace an existing version instead of skipping it.
  pub overwrite:        bool,
  /// Shown in logs and reports; defaults to `"<text>"`.
  pub source_name:      Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
  Created,
  Replaced,
  /// The version already existed and overwrite was off.
  Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
  pub version:     String,
  pub source_name: String,
  pub status:      IngestStatus,
  pub counts:      GraphCounts,
  pub diagnostics: Vec<Diagnostic>,
}

/// Hex SHA-256 of `text`.
pub fn source_hash(text: &str) -> String {
  hex::encode(Sha256::digest(text.as_bytes()))
}

/// Parse `text` and store it as a version.
///
/// The latest flag is recomputed afterwards, also when the version was
/// skipped.
pub async fn ingest_text<S: MfmStore>(
  store: &S,
  text: &str,
  options: IngestOptions,
) -> Result<IngestOutcome> {
  let source_name = options.source_name.unwrap_or_else(|| "<text>".to_owned());
  let parsed = munitorum_text::parse(text);

  let version = options
    .version_override
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
    .or_else(|| parsed.version.clone())
    .ok_or_else(|| Error::MissingVersion(source_name.clone()))?;

  let graph = build_graph(&parsed);
  let counts = GraphCounts::of(&graph);
  let new_version = NewVersion {
    version:       version.clone(),
    release_label: parsed.release_label.clone(),
    source_hash:   Some(source_hash(text)),
  };

  let status = write_version(store, new_version, graph, options.overwrite).await?;
  refresh_latest(store).await?;

  info!(
    %version,
    source = %source_name,
    ?status,
    units = counts.units,
    enhancements = counts.enhancements,
    skipped_lines = parsed.diagnostics.len(),
    "ingested MFM text"
  );

  Ok(IngestOutcome {
    version,
    source_name,
    status,
    counts,
    diagnostics: parsed.diagnostics,
  })
}

/// Read `path` and ingest it. The file name becomes the source name unless
/// one is given.
pub async fn ingest_file<S: MfmStore>(
  store: &S,
  path: &Path,
  mut options: IngestOptions,
) -> Result<IngestOutcome> {
  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|e| Error::io(path, e))?;
  if options.source_name.is_none() {
    options.source_name = Some(display_name(path));
  }
  ingest_text(store, &text, options).await
}

/// Persist one version graph, honouring the overwrite policy.
///
/// An existing version is left alone unless `overwrite` is set, in which
/// case the store swaps the old graph for the new one in a single
/// transaction.
pub async fn write_version<S: MfmStore>(
  store: &S,
  version: NewVersion,
  graph: Vec<NewFaction>,
  overwrite: bool,
) -> Result<IngestStatus> {
  let existing = store.get_version(&version.version).await.map_err(Error::store)?;
  match existing {
    Some(_) if !overwrite => {
      debug!(version = %version.version, "version exists, skipping");
      Ok(IngestStatus::Skipped)
    }
    Some(_) => {
      store.replace_graph(version, graph).await.map_err(Error::store)?;
      Ok(IngestStatus::Replaced)
    }
    None => {
      store.write_graph(version, graph).await.map_err(Error::store)?;
      Ok(IngestStatus::Created)
    }
  }
}

/// Flag the natural-order greatest version as latest.
pub async fn refresh_latest<S: MfmStore>(store: &S) -> Result<Option<MfmVersion>> {
  let versions = store.list_versions().await.map_err(Error::store)?;
  let Some(latest) = latest_by(versions, |v| v.version.as_str()) else {
    return Ok(None);
  };
  if !latest.is_latest {
    store.set_latest(latest.version_id).await.map_err(Error::store)?;
    debug!(version = %latest.version, "latest version updated");
  }
  Ok(Some(MfmVersion { is_latest: true, ..latest }))
}

/// Resolve `latest` (or no selector) to the latest version, anything else
/// to the version of that name.
pub async fn resolve_version<S: MfmStore>(
  store: &S,
  selector: Option<&str>,
) -> Result<MfmVersion> {
  match selector.map(str::trim).filter(|s| !s.is_empty()) {
    None => latest_or_error(store).await,
    Some(s) if s.eq_ignore_ascii_case(LATEST) => latest_or_error(store).await,
    Some(s) => store
      .get_version(s)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::VersionNotFound(s.to_owned())),
  }
}

async fn latest_or_error<S: MfmStore>(store: &S) -> Result<MfmVersion> {
  store
    .latest_version()
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::VersionNotFound(LATEST.to_owned()))
}

pub(crate) fn display_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
  use munitorum_core::snapshot::VersionStats;
  use munitorum_store_sqlite::SqliteStore;

  use super::*;

  const V32: &str = "\
MUNITORUM FIELD MANUAL v3.2
June 2025
CODEX: ORKS
Boyz
10 models ....... 85 pts
20 models ....... 170 pts
";

  async fn store() -> SqliteStore { SqliteStore::open_in_memory().await.unwrap() }

  #[tokio::test]
  async fn ingest_creates_and_flags_latest() {
    let s = store().await;
    let outcome = ingest_text(&s, V32, IngestOptions::default()).await.unwrap();
    assert_eq!(outcome.version, "3.2");
    assert_eq!(outcome.status, IngestStatus::Created);
    assert_eq!(outcome.counts.units, 1);
    assert_eq!(outcome.counts.variants, 2);

    let v = s.get_version("3.2").await.unwrap().unwrap();
    assert!(v.is_latest);
    assert_eq!(v.release_label.as_deref(), Some("June 2025"));
    assert_eq!(v.source_hash.as_deref(), Some(source_hash(V32).as_str()));
  }

  async fn stats_of(s: &SqliteStore, version: &str) -> VersionStats {
    let v = s.get_version(version).await.unwrap().unwrap();
    s.stats(v.version_id).await.unwrap().unwrap()
  }

  #[tokio::test]
  async fn existing_version_is_skipped_unless_overwriting() {
    let s = store().await;
    ingest_text(&s, V32, IngestOptions::default()).await.unwrap();
    let before = stats_of(&s, "3.2").await;
    assert_eq!((before.factions, before.units, before.variants), (1, 1, 2));

    let changed = V32.replace("85 pts", "90 pts");
    let skipped = ingest_text(&s, &changed, IngestOptions::default()).await.unwrap();
    assert_eq!(skipped.status, IngestStatus::Skipped);
    assert_eq!(stats_of(&s, "3.2").await, before);
    let v = s.get_version("3.2").await.unwrap().unwrap();
    let faction = s.find_faction(v.version_id, "ORKS").await.unwrap().unwrap();
    let boyz = s.find_unit(faction.faction_id, "Boyz").await.unwrap().unwrap();
    assert_eq!(boyz.points_for(10), Some(85));

    let options = IngestOptions { overwrite: true, ..Default::default() };
    let replaced = ingest_text(&s, &changed, options).await.unwrap();
    assert_eq!(replaced.status, IngestStatus::Replaced);
    assert_eq!(stats_of(&s, "3.2").await, before);
    let v = s.get_version("3.2").await.unwrap().unwrap();
    assert!(v.is_latest);
    let faction = s.find_faction(v.version_id, "ORKS").await.unwrap().unwrap();
    let boyz = s.find_unit(faction.faction_id, "Boyz").await.unwrap().unwrap();
    assert_eq!(boyz.points_for(10), Some(90));
    assert_eq!(s.list_versions().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn failed_overwrite_keeps_existing_version() {
    let s = store().await;
    ingest_text(&s, V32, IngestOptions::default()).await.unwrap();
    let before = stats_of(&s, "3.2").await;

    let graph = vec![NewFaction::named("ORKS"), NewFaction::named("ORKS")];
    let err = write_version(&s, NewVersion::new("3.2"), graph, true).await;
    assert!(matches!(err, Err(Error::Store(_))));
    assert_eq!(stats_of(&s, "3.2").await, before);
  }

  #[tokio::test]
  async fn override_wins_and_missing_version_fails() {
    let s = store().await;
    let options = IngestOptions {
      version_override: Some("3.10".into()),
      ..Default::default()
    };
    assert_eq!(ingest_text(&s, V32, options).await.unwrap().version, "3.10");

    let err = ingest_text(&s, "CODEX: ORKS\n", IngestOptions {
      source_name: Some("orks.txt".into()),
      ..Default::default()
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::MissingVersion(name) if name == "orks.txt"));
  }

  #[tokio::test]
  async fn latest_follows_natural_order() {
    let s = store().await;
    for v in ["3.9", "3.10", "3.2"] {
      let options = IngestOptions { version_override: Some(v.into()), ..Default::default() };
      ingest_text(&s, V32, options).await.unwrap();
    }
    let versions = s.list_versions().await.unwrap();
    let latest: Vec<_> = versions.iter().filter(|v| v.is_latest).map(|v| v.version.as_str()).collect();
    assert_eq!(latest, ["3.10"]);

    assert_eq!(resolve_version(&s, None).await.unwrap().version, "3.10");
    assert_eq!(resolve_version(&s, Some("LATEST")).await.unwrap().version, "3.10");
    assert_eq!(resolve_version(&s, Some("3.9")).await.unwrap().version, "3.9");
    assert!(matches!(
      resolve_version(&s, Some("1.0")).await,
      Err(Error::VersionNotFound(_))
    ));
  }

  #[tokio::test]
  async fn ingest_file_uses_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mfm-3.2.txt");
    std::fs::write(&path, V32).unwrap();

    let s = store().await;
    let outcome = ingest_file(&s, &path, IngestOptions::default()).await.unwrap();
    assert_eq!(outcome.source_name, "mfm-3.2.txt");

    let missing = ingest_file(&s, &dir.path().join("nope.txt"), IngestOptions::default()).await;
    assert!(matches!(missing, Err(Error::Io { .. })));
  }
}
