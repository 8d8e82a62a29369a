//! Handlers for the admin endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/migrate` | Optional body: `{"overwrite": true}` |
//! | `GET`  | `/status` | Stored versions and migration settings |

use std::path::PathBuf;

use axum::{Json, body::Bytes, extract::State};
use munitorum_core::{model::MfmVersion, store::MfmStore};
use munitorum_ingest::{MigrationOptions, MigrationReport, migrate_directory};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ServiceState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct MigrateBody {
  /// Defaults to the configured `overwrite-existing`.
  pub overwrite: Option<bool>,
}

/// `POST /migrate`
///
/// An empty body runs with the configured settings.
pub async fn migrate<S>(
  State(state): State<ServiceState<S>>,
  body: Bytes,
) -> Result<Json<MigrationReport>, ApiError>
where
  S: MfmStore,
{
  let body: MigrateBody = if body.iter().all(u8::is_ascii_whitespace) {
    MigrateBody::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))?
  };

  let options = MigrationOptions {
    directory: state.migration.directory.clone(),
    overwrite: body.overwrite.unwrap_or(state.migration.overwrite),
  };
  info!(directory = %options.directory.display(), "migration requested");
  let report = migrate_directory(&*state.store, &options).await?;
  Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct MigrationSettings {
  pub directory:          PathBuf,
  pub overwrite_existing: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
  pub versions:    Vec<MfmVersion>,
  pub latest:      Option<String>,
  pub migration:   MigrationSettings,
  pub reports_dir: PathBuf,
}

/// `GET /status`
pub async fn status<S>(
  State(state): State<ServiceState<S>>,
) -> Result<Json<StatusResponse>, ApiError>
where
  S: MfmStore,
{
  let versions = state.store.list_versions().await.map_err(ApiError::store)?;
  let latest = versions
    .iter()
    .find(|v| v.is_latest)
    .map(|v| v.version.clone());
  Ok(Json(StatusResponse {
    versions,
    latest,
    migration: MigrationSettings {
      directory:          state.migration.directory.clone(),
      overwrite_existing: state.migration.overwrite,
    },
    reports_dir: state.reports.dir().to_path_buf(),
  }))
}
