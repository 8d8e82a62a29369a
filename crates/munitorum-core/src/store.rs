//! The `MfmStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `munitorum-store-sqlite`). Higher layers (`munitorum-ingest`,
//! `munitorum-api`) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  model::{Faction, MfmVersion, NewFaction, NewVersion},
  snapshot::{DetachmentView, UnitView, VersionSnapshot, VersionStats},
};

/// Abstraction over an MFM points store.
///
/// Rows are only ever created by [`MfmStore::write_graph`] or
/// [`MfmStore::replace_graph`] and removed by [`MfmStore::delete_version`]
/// or a replacement; the single in-place mutation is the `is_latest` flag.
///
/// Name lookups are case-insensitive. All methods return `Send` futures so
/// the trait can be used behind `axum`.
pub trait MfmStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Versions ──────────────────────────────────────────────────────────

  /// All versions, in insertion order.
  fn list_versions(
    &self,
  ) -> impl Future<Output = Result<Vec<MfmVersion>, Self::Error>> + Send + '_;

  /// Look up a version by its version string. Returns `None` if absent.
  fn get_version<'a>(
    &'a self,
    version: &'a str,
  ) -> impl Future<Output = Result<Option<MfmVersion>, Self::Error>> + Send + 'a;

  /// The version currently flagged as latest, if any.
  fn latest_version(
    &self,
  ) -> impl Future<Output = Result<Option<MfmVersion>, Self::Error>> + Send + '_;

  /// Flag `version_id` as latest and clear the flag everywhere else.
  fn set_latest(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Persist a version and its whole graph atomically. Fails if the version
  /// string already exists.
  fn write_graph(
    &self,
    version: NewVersion,
    factions: Vec<NewFaction>,
  ) -> impl Future<Output = Result<MfmVersion, Self::Error>> + Send + '_;

  /// Delete any version with the same version string and write the new graph
  /// in its place, in one transaction. If the write fails the old graph is
  /// left untouched.
  fn replace_graph(
    &self,
    version: NewVersion,
    factions: Vec<NewFaction>,
  ) -> impl Future<Output = Result<MfmVersion, Self::Error>> + Send + '_;

  /// Delete a version and every row beneath it, children first. Returns
  /// `false` if the version did not exist.
  fn delete_version(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Graph reads ───────────────────────────────────────────────────────

  fn list_factions(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Faction>, Self::Error>> + Send + '_;

  fn find_faction<'a>(
    &'a self,
    version_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Faction>, Self::Error>> + Send + 'a;

  /// Units of a faction with their variants, in insertion order.
  fn list_units(
    &self,
    faction_id: Uuid,
  ) -> impl Future<Output = Result<Vec<UnitView>, Self::Error>> + Send + '_;

  fn find_unit<'a>(
    &'a self,
    faction_id: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<UnitView>, Self::Error>> + Send + 'a;

  /// Detachments of a faction with their enhancements, in insertion order.
  fn list_detachments(
    &self,
    faction_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DetachmentView>, Self::Error>> + Send + '_;

  /// Materialise the full graph of a version. Returns `None` if the version
  /// does not exist.
  fn snapshot(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<VersionSnapshot>, Self::Error>> + Send + '_;

  /// Row counts for a version. Returns `None` if the version does not exist.
  fn stats(
    &self,
    version_id: Uuid,
  ) -> impl Future<Output = Result<Option<VersionStats>, Self::Error>> + Send + '_;
}
