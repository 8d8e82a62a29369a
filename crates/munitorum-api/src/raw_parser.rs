//! Handlers for the raw-parser endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/parse` | Multipart: `file`, optional `version`, `overwrite` |
//! | `POST` | `/parse-file` | Body: `{"path": "...", "version": "3.2", "overwrite": false}` |
//! | `POST` | `/validate` | Body: `{"path": "...", "version": "3.2"}`; writes a report file |
//! | `GET`  | `/regenerate/{version}` | `text/plain` |
//! | `GET`  | `/validation-report` | `?path=[&version=]`; `text/plain` |
//! | `GET`  | `/stats/{version}` | Row counts |
//!
//! Paths are read on the server host.

use std::path::PathBuf;

use axum::{
  Json,
  extract::{Multipart, Path, Query, State},
  http::header,
  response::IntoResponse,
};
use chrono::Utc;
use munitorum_core::{snapshot::VersionStats, store::MfmStore};
use munitorum_ingest::{
  IngestOptions, IngestOutcome, ValidationReport, format_validation_report,
  ingest_file, ingest_text, regenerate, resolve_version, validate_file,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ServiceState, error::ApiError};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

fn non_empty_path(path: &str) -> Result<PathBuf, ApiError> {
  let path = path.trim();
  if path.is_empty() {
    return Err(ApiError::BadRequest("`path` is required".to_owned()));
  }
  Ok(PathBuf::from(path))
}

fn parse_flag(value: &str) -> Result<bool, ApiError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "" | "false" | "0" | "no" | "off" => Ok(false),
    "true" | "1" | "yes" | "on" => Ok(true),
    other => Err(ApiError::BadRequest(format!("invalid boolean: {other:?}"))),
  }
}

// ─── Parse ────────────────────────────────────────────────────────────────────

/// `POST /parse` (multipart)
pub async fn parse_upload<S>(
  State(state): State<ServiceState<S>>,
  mut multipart: Multipart,
) -> Result<Json<IngestOutcome>, ApiError>
where
  S: MfmStore,
{
  let bad = |e: axum::extract::multipart::MultipartError| {
    ApiError::BadRequest(e.body_text())
  };

  let mut text = None;
  let mut options = IngestOptions::default();
  while let Some(field) = multipart.next_field().await.map_err(bad)? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("file") => {
        options.source_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await.map_err(bad)?;
        let body = String::from_utf8(bytes.to_vec()).map_err(|_| {
          ApiError::BadRequest("uploaded file is not valid UTF-8".to_owned())
        })?;
        text = Some(body);
      }
      Some("version") => {
        options.version_override = Some(field.text().await.map_err(bad)?);
      }
      Some("overwrite") => {
        options.overwrite = parse_flag(&field.text().await.map_err(bad)?)?;
      }
      _ => {}
    }
  }

  let text =
    text.ok_or_else(|| ApiError::BadRequest("missing `file` field".to_owned()))?;
  let outcome = ingest_text(&*state.store, &text, options).await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ParseFileBody {
  pub path:      String,
  pub version:   Option<String>,
  #[serde(default)]
  pub overwrite: bool,
}

/// `POST /parse-file`
pub async fn parse_file<S>(
  State(state): State<ServiceState<S>>,
  Json(body): Json<ParseFileBody>,
) -> Result<Json<IngestOutcome>, ApiError>
where
  S: MfmStore,
{
  let path = non_empty_path(&body.path)?;
  let options = IngestOptions {
    version_override: body.version,
    overwrite:        body.overwrite,
    source_name:      None,
  };
  let outcome = ingest_file(&*state.store, &path, options).await?;
  Ok(Json(outcome))
}

// ─── Validate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ValidateBody {
  pub path:    String,
  pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
  #[serde(flatten)]
  pub report:      ValidationReport,
  /// Where the text report was written, if writing succeeded.
  pub report_file: Option<PathBuf>,
}

/// `POST /validate`
pub async fn validate<S>(
  State(state): State<ServiceState<S>>,
  Json(body): Json<ValidateBody>,
) -> Result<Json<ValidateResponse>, ApiError>
where
  S: MfmStore,
{
  let path = non_empty_path(&body.path)?;
  let report = validate_file(&*state.store, &path, body.version.as_deref()).await?;

  let report_file = match state.reports.write_validation(&report).await {
    Ok(file) => Some(file),
    Err(e) => {
      warn!(error = %e, "could not write validation report");
      None
    }
  };
  Ok(Json(ValidateResponse { report, report_file }))
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
  pub path:    String,
  pub version: Option<String>,
}

/// `GET /validation-report?path=[&version=]`
pub async fn validation_report<S>(
  State(state): State<ServiceState<S>>,
  Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MfmStore,
{
  let path = non_empty_path(&params.path)?;
  let report =
    validate_file(&*state.store, &path, params.version.as_deref()).await?;
  let text = format_validation_report(&report, Utc::now());
  Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], text))
}

// ─── Regenerate and stats ─────────────────────────────────────────────────────

/// `GET /regenerate/{version}`
pub async fn regenerate_text<S>(
  State(state): State<ServiceState<S>>,
  Path(version): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MfmStore,
{
  let text = regenerate(&*state.store, &version).await?;
  Ok(([(header::CONTENT_TYPE, TEXT_PLAIN)], text))
}

/// `GET /stats/{version}`
pub async fn stats<S>(
  State(state): State<ServiceState<S>>,
  Path(version): Path<String>,
) -> Result<Json<VersionStats>, ApiError>
where
  S: MfmStore,
{
  let v = resolve_version(&*state.store, Some(&version)).await?;
  let stats = state
    .store
    .stats(v.version_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("version {} not found", v.version)))?;
  Ok(Json(stats))
}
