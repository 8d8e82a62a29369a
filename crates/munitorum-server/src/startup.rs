//! One-shot tasks run after the store opens and before serving.
//!
//! Order: migration, raw imports, verification, feedback reports. A failing
//! task is logged and the next one still runs.

use std::path::{Path, PathBuf};

use munitorum_core::store::MfmStore;
use munitorum_ingest::{
  IngestOptions, ReportWriter, ingest_file, migrate_directory, validate_file,
};
use tracing::{info, warn};

use crate::settings::ServerConfig;

/// What the startup tasks did, for logging and tests.
#[derive(Debug, Default)]
pub struct StartupSummary {
  pub migrated: usize,
  pub imported: usize,
  pub verified: usize,
  pub reports:  Vec<PathBuf>,
  pub failures: usize,
}

pub async fn run<S: MfmStore>(store: &S, config: &ServerConfig) -> StartupSummary {
  let reports = ReportWriter::new(&config.reports_dir);
  let mut summary = StartupSummary::default();

  let migration = &config.mfm.migration;
  if migration.enabled {
    match migrate_directory(store, &migration.options()).await {
      Ok(report) => {
        summary.migrated = report.processed.len();
        summary.failures += report.failures.len();
      }
      Err(e) => {
        warn!(error = %e, "startup migration failed");
        summary.failures += 1;
      }
    }
  }

  for path in &config.import.mfm.files {
    let options = IngestOptions {
      overwrite: migration.overwrite_existing,
      ..Default::default()
    };
    match ingest_file(store, path, options).await {
      Ok(outcome) => {
        info!(
          file = %path.display(),
          version = %outcome.version,
          status = ?outcome.status,
          "startup import done"
        );
        summary.imported += 1;
      }
      Err(e) => {
        warn!(file = %path.display(), error = %e, "startup import failed");
        summary.failures += 1;
      }
    }
  }

  for path in &config.verify.mfm.files {
    match validate_file(store, path, None).await {
      Ok(report) => {
        summary.verified += 1;
        match reports.write_validation(&report).await {
          Ok(file) => summary.reports.push(file),
          Err(e) => warn!(error = %e, "could not write validation report"),
        }
      }
      Err(e) => {
        warn!(file = %path.display(), error = %e, "startup verification failed");
        summary.failures += 1;
      }
    }
  }

  if config.generate.mfm.feedback {
    let mut seen: Vec<&PathBuf> = Vec::new();
    for path in config.import.mfm.files.iter().chain(&config.verify.mfm.files) {
      if seen.contains(&path) {
        continue;
      }
      seen.push(path);
      match write_feedback(&reports, path).await {
        Ok(file) => summary.reports.push(file),
        Err(e) => {
          warn!(file = %path.display(), error = %e, "feedback report failed");
          summary.failures += 1;
        }
      }
    }
  }

  info!(
    migrated = summary.migrated,
    imported = summary.imported,
    verified = summary.verified,
    reports = summary.reports.len(),
    failures = summary.failures,
    "startup tasks finished"
  );
  summary
}

async fn write_feedback(reports: &ReportWriter, path: &Path) -> anyhow::Result<PathBuf> {
  let text = tokio::fs::read_to_string(path).await?;
  let parsed = munitorum_text::parse(&text);
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  Ok(reports.write_feedback(&name, &parsed).await?)
}
