//! JSON REST API for Munitorum.
//!
//! Three routers, each backed by any [`munitorum_core::store::MfmStore`]:
//!
//! - [`mfm_router`]: read-only lookups, safe to expose publicly.
//! - [`raw_parser_router`]: ingestion, validation and regeneration.
//! - [`admin_router`]: bulk migration and status.
//!
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .nest("/api/mfm", munitorum_api::mfm_router(store.clone()))
//!   .nest("/api/mfm/raw-parser", munitorum_api::raw_parser_router(services.clone()))
//!   .nest("/api/admin/mfm", munitorum_api::admin_router(services))
//! ```

pub mod admin;
pub mod error;
pub mod mfm;
pub mod raw_parser;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use munitorum_core::store::MfmStore;
use munitorum_ingest::{MigrationOptions, ReportWriter};

pub use error::ApiError;

/// State for the raw-parser and admin routers.
pub struct ServiceState<S> {
  pub store:     Arc<S>,
  /// Where validation reports are written.
  pub reports:   ReportWriter,
  /// Directory and default overwrite policy for `/migrate`.
  pub migration: MigrationOptions,
}

impl<S> Clone for ServiceState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      reports:   self.reports.clone(),
      migration: self.migration.clone(),
    }
  }
}

/// Build the read-only router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn mfm_router<S>(store: Arc<S>) -> Router<()>
where
  S: MfmStore + 'static,
{
  Router::new()
    // Versions
    .route("/versions", get(mfm::list_versions::<S>))
    .route("/versions/{version}", get(mfm::get_version::<S>))
    // Factions
    .route("/factions", get(mfm::list_factions::<S>))
    .route("/factions/{faction}", get(mfm::get_faction::<S>))
    // Units and points
    .route("/units", get(mfm::list_units::<S>))
    .route("/units/{faction}/{unit}", get(mfm::get_unit::<S>))
    .route("/points", get(mfm::points::<S>))
    // Detachments
    .route("/detachments", get(mfm::list_detachments::<S>))
    .route("/enhancements", get(mfm::list_enhancements::<S>))
    .with_state(store)
}

/// Build the raw-parser router.
pub fn raw_parser_router<S>(state: ServiceState<S>) -> Router<()>
where
  S: MfmStore + 'static,
{
  Router::new()
    .route("/parse", post(raw_parser::parse_upload::<S>))
    .route("/parse-file", post(raw_parser::parse_file::<S>))
    .route("/validate", post(raw_parser::validate::<S>))
    .route("/regenerate/{version}", get(raw_parser::regenerate_text::<S>))
    .route("/validation-report", get(raw_parser::validation_report::<S>))
    .route("/stats/{version}", get(raw_parser::stats::<S>))
    .with_state(state)
}

/// Build the admin router.
pub fn admin_router<S>(state: ServiceState<S>) -> Router<()>
where
  S: MfmStore + 'static,
{
  Router::new()
    .route("/migrate", post(admin::migrate::<S>))
    .route("/status", get(admin::status::<S>))
    .with_state(state)
}

// ─── Router tests ────────────────────────────────────────────────────────────
