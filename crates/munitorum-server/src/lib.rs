//! HTTP server for the Munitorum points store.
//!
//! Assembles the [`munitorum_api`] routers behind one axum [`Router`]: the
//! read-only lookups are public, the raw-parser and admin routes sit behind
//! HTTP Basic auth when credentials are configured.

pub mod auth;
pub mod error;
pub mod settings;
pub mod startup;

pub use error::Error;
pub use settings::ServerConfig;

use std::sync::Arc;

use axum::{Router, middleware};
use munitorum_api::{ServiceState, admin_router, mfm_router, raw_parser_router};
use munitorum_core::store::MfmStore;
use munitorum_ingest::ReportWriter;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state the router is built from.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Option<Arc<AuthConfig>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      config: self.config.clone(),
      auth:   self.auth.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let auth = config.auth.clone().map(Arc::new);
    Self { store: Arc::new(store), config: Arc::new(config), auth }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MfmStore + 'static,
{
  let services = ServiceState {
    store:     state.store.clone(),
    reports:   ReportWriter::new(&state.config.reports_dir),
    migration: state.config.mfm.migration.options(),
  };

  let guarded = Router::new()
    .nest("/api/mfm/raw-parser", raw_parser_router(services.clone()))
    .nest("/api/admin/mfm", admin_router(services))
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_auth));

  Router::new()
    .nest("/api/mfm", mfm_router(state.store.clone()))
    .merge(guarded)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
