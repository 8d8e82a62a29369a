//! Read-only lookups over stored MFM versions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/versions` | All versions |
//! | `GET`  | `/versions/{version}` | `latest` allowed |
//! | `GET`  | `/factions` | |
//! | `GET`  | `/factions/{faction}` | Faction with units and detachments |
//! | `GET`  | `/units` | Optional `?faction=` |
//! | `GET`  | `/units/{faction}/{unit}` | Unit with its sizes |
//! | `GET`  | `/points` | `?faction=&unit=[&models=]` |
//! | `GET`  | `/detachments` | `?faction=` required |
//! | `GET`  | `/enhancements` | `?faction=` required, optional `detachment` |
//!
//! Every endpoint but `/versions` takes `?version=`, defaulting to `latest`.
//! Name matching is case-insensitive.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use munitorum_core::{
  model::{Enhancement, Faction, MfmVersion, UnitType},
  snapshot::{DetachmentView, FactionView, UnitView},
  store::MfmStore,
};
use munitorum_ingest::resolve_version;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Deserialize, Default)]
pub struct VersionParams {
  pub version: Option<String>,
}

async fn faction_in<S>(
  store: &S,
  version: &MfmVersion,
  name: &str,
) -> Result<Faction, ApiError>
where
  S: MfmStore,
{
  store
    .find_faction(version.version_id, name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!(
        "faction {name} not found in version {}",
        version.version
      ))
    })
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
    .ok_or_else(|| ApiError::BadRequest(format!("`{name}` is required")))
}

// ─── Versions ─────────────────────────────────────────────────────────────────

/// `GET /versions`
pub async fn list_versions<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<MfmVersion>>, ApiError>
where
  S: MfmStore,
{
  let versions = store.list_versions().await.map_err(ApiError::store)?;
  Ok(Json(versions))
}

/// `GET /versions/{version}`
pub async fn get_version<S>(
  State(store): State<Arc<S>>,
  Path(version): Path<String>,
) -> Result<Json<MfmVersion>, ApiError>
where
  S: MfmStore,
{
  Ok(Json(resolve_version(&*store, Some(&version)).await?))
}

// ─── Factions ─────────────────────────────────────────────────────────────────

/// `GET /factions[?version=]`
pub async fn list_factions<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<VersionParams>,
) -> Result<Json<Vec<Faction>>, ApiError>
where
  S: MfmStore,
{
  let version = resolve_version(&*store, params.version.as_deref()).await?;
  let factions = store
    .list_factions(version.version_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(factions))
}

/// `GET /factions/{faction}[?version=]`
pub async fn get_faction<S>(
  State(store): State<Arc<S>>,
  Path(name): Path<String>,
  Query(params): Query<VersionParams>,
) -> Result<Json<FactionView>, ApiError>
where
  S: MfmStore,
{
  let version = resolve_version(&*store, params.version.as_deref()).await?;
  let faction = faction_in(&*store, &version, &name).await?;
  let units = store
    .list_units(faction.faction_id)
    .await
    .map_err(ApiError::store)?;
  let detachments = store
    .list_detachments(faction.faction_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(FactionView { faction, units, detachments }))
}

// ─── Units ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct UnitListParams {
  pub version: Option<String>,
  /// Without a faction, units of every faction are returned.
  pub faction: Option<String>,
}

/// `GET /units[?faction=][&version=]`
pub async fn list_units<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<UnitListParams>,
) -> Result<Json<Vec<UnitView>>, ApiError>
where
  S: MfmStore,
{
  let version = resolve_version(&*store, params.version.as_deref()).await?;
  let faction = params.faction.filter(|f| !f.trim().is_empty());
  let units = match faction {
    Some(name) => {
      let faction = faction_in(&*store, &version, name.trim()).await?;
      store
        .list_units(faction.faction_id)
        .await
        .map_err(ApiError::store)?
    }
    None => store
      .snapshot(version.version_id)
      .await
      .map_err(ApiError::store)?
      .map(|s| s.factions.into_iter().flat_map(|f| f.units).collect())
      .unwrap_or_default(),
  };
  Ok(Json(units))
}

/// `GET /units/{faction}/{unit}[?version=]`
pub async fn get_unit<S>(
  State(store): State<Arc<S>>,
  Path((faction, unit)): Path<(String, String)>,
  Query(params): Query<VersionParams>,
) -> Result<Json<UnitView>, ApiError>
where
  S: MfmStore,
{
  let version = resolve_version(&*store, params.version.as_deref()).await?;
  let (_, view) = unit_in(&*store, &version, &faction, &unit).await?;
  Ok(Json(view))
}

async fn unit_in<S>(
  store: &S,
  version: &MfmVersion,
  faction: &str,
  unit: &str,
) -> Result<(Faction, UnitView), ApiError>
where
  S: MfmStore,
{
  let faction = faction_in(store, version, faction).await?;
  let view = store
    .find_unit(faction.faction_id, unit)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("unit {unit} not found in {}", faction.name))
    })?;
  Ok((faction, view))
}

// ─── Points ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct PointsParams {
  pub version: Option<String>,
  pub faction: Option<String>,
  pub unit:    Option<String>,
  /// Defaults to the smallest size of the unit.
  pub models:  Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAnswer {
  pub version:   String,
  pub faction:   String,
  pub unit:      String,
  pub unit_type: UnitType,
  pub models:    u32,
  pub points:    u32,
}

/// `GET /points?faction=&unit=[&models=][&version=]`
pub async fn points<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<PointsParams>,
) -> Result<Json<PointsAnswer>, ApiError>
where
  S: MfmStore,
{
  let faction = required(params.faction, "faction")?;
  let unit = required(params.unit, "unit")?;
  let version = resolve_version(&*store, params.version.as_deref()).await?;
  let (faction, view) = unit_in(&*store, &version, &faction, &unit).await?;

  let variant = match params.models {
    Some(models) => view.variants.iter().find(|v| v.model_count == models),
    None => view.variants.iter().min_by_key(|v| v.model_count),
  }
  .ok_or_else(|| {
    let size = params
      .models
      .map(|m| format!("{m} models"))
      .unwrap_or_else(|| "any size".to_owned());
    ApiError::NotFound(format!("{} has no points for {size}", view.unit.name))
  })?;

  Ok(Json(PointsAnswer {
    version:   version.version,
    faction:   faction.name,
    unit:      view.unit.name.clone(),
    unit_type: view.unit.unit_type,
    models:    variant.model_count,
    points:    variant.points,
  }))
}

// ─── Detachments and enhancements ─────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct DetachmentParams {
  pub version:    Option<String>,
  pub faction:    Option<String>,
  pub detachment: Option<String>,
}

async fn detachments_of<S>(
  store: &S,
  params: DetachmentParams,
) -> Result<(Vec<DetachmentView>, Option<String>), ApiError>
where
  S: MfmStore,
{
  let faction = required(params.faction, "faction")?;
  let version = resolve_version(store, params.version.as_deref()).await?;
  let faction = faction_in(store, &version, &faction).await?;
  let detachments = store
    .list_detachments(faction.faction_id)
    .await
    .map_err(ApiError::store)?;
  Ok((detachments, params.detachment.filter(|d| !d.trim().is_empty())))
}

/// `GET /detachments?faction=[&version=]`
pub async fn list_detachments<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DetachmentParams>,
) -> Result<Json<Vec<DetachmentView>>, ApiError>
where
  S: MfmStore,
{
  let (detachments, _) = detachments_of(&*store, params).await?;
  Ok(Json(detachments))
}

/// `GET /enhancements?faction=[&detachment=][&version=]`
pub async fn list_enhancements<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DetachmentParams>,
) -> Result<Json<Vec<Enhancement>>, ApiError>
where
  S: MfmStore,
{
  let (detachments, wanted) = detachments_of(&*store, params).await?;
  let enhancements = match wanted {
    Some(name) => {
      let name = name.trim();
      detachments
        .into_iter()
        .find(|d| d.detachment.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ApiError::NotFound(format!("detachment {name} not found")))?
        .enhancements
    }
    None => detachments.into_iter().flat_map(|d| d.enhancements).collect(),
  };
  Ok(Json(enhancements))
}
