//! Async HTTP client wrapping the Munitorum JSON API.

use std::time::Duration;

use anyhow::{Context, Result};
use munitorum_core::{
  model::{Faction, MfmVersion},
  snapshot::UnitView,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

/// Connection settings for the Munitorum API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// A non-success response, with the server's `error` message when present.
#[derive(Debug, Error)]
#[error("{method} {path} → {status}: {message}")]
pub struct StatusError {
  pub method:  &'static str,
  pub path:    String,
  pub status:  StatusCode,
  pub message: String,
}

impl StatusError {
  pub fn is_not_found(&self) -> bool { self.status == StatusCode::NOT_FOUND }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointsAnswer {
  pub version: String,
  pub faction: String,
  pub unit:    String,
  pub models:  u32,
  pub points:  u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigratedSet {
  pub version:     String,
  pub source_name: String,
  pub status:      String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationFailure {
  pub file:    String,
  pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationSummary {
  pub processed: Vec<MigratedSet>,
  pub failures:  Vec<MigrationFailure>,
  pub latest:    Option<String>,
}

/// Async HTTP client for the Munitorum REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn send(
    &self,
    method: &'static str,
    path: &str,
    req: RequestBuilder,
  ) -> Result<reqwest::Response> {
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{method} {path} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
      .unwrap_or_default();
    Err(StatusError { method, path: path.to_owned(), status, message }.into())
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    let req = self.client.get(self.url(path)).query(query);
    let resp = self.send("GET", path, req).await?;
    resp
      .json()
      .await
      .with_context(|| format!("deserialising {path}"))
  }

  // ── Read-only ─────────────────────────────────────────────────────────────

  /// `GET /api/mfm/versions`
  pub async fn versions(&self) -> Result<Vec<MfmVersion>> {
    self.get_json("/mfm/versions", &[]).await
  }

  /// `GET /api/mfm/factions[?version=]`
  pub async fn factions(&self, version: Option<&str>) -> Result<Vec<Faction>> {
    self.get_json("/mfm/factions", &version_query(version)).await
  }

  /// `GET /api/mfm/units?faction=[&version=]`
  pub async fn units(
    &self,
    faction: &str,
    version: Option<&str>,
  ) -> Result<Vec<UnitView>> {
    let mut query = version_query(version);
    query.push(("faction", faction.to_owned()));
    self.get_json("/mfm/units", &query).await
  }

  /// `GET /api/mfm/points?faction=&unit=[&models=][&version=]`
  pub async fn points(
    &self,
    faction: &str,
    unit: &str,
    models: Option<u32>,
    version: Option<&str>,
  ) -> Result<PointsAnswer> {
    let mut query = version_query(version);
    query.push(("faction", faction.to_owned()));
    query.push(("unit", unit.to_owned()));
    if let Some(models) = models {
      query.push(("models", models.to_string()));
    }
    self.get_json("/mfm/points", &query).await
  }

  // ── Guarded ───────────────────────────────────────────────────────────────

  /// `POST /api/admin/mfm/migrate`
  pub async fn migrate(&self, overwrite: bool) -> Result<MigrationSummary> {
    let path = "/admin/mfm/migrate";
    let req = self
      .client
      .post(self.url(path))
      .json(&serde_json::json!({ "overwrite": overwrite }));
    let resp = self.send("POST", path, req).await?;
    resp.json().await.context("deserialising migration report")
  }

  /// `GET /api/mfm/raw-parser/regenerate/{version}`
  pub async fn regenerate(&self, version: &str) -> Result<String> {
    let path = format!("/mfm/raw-parser/regenerate/{version}");
    let req = self.client.get(self.url(&path));
    let resp = self.send("GET", &path, req).await?;
    resp.text().await.context("reading regenerated text")
  }
}

fn version_query(version: Option<&str>) -> Vec<(&'static str, String)> {
  version
    .map(|v| vec![("version", v.to_owned())])
    .unwrap_or_default()
}
