//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

impl From<munitorum_ingest::Error> for ApiError {
  fn from(e: munitorum_ingest::Error) -> Self {
    use munitorum_ingest::Error as E;
    match e {
      E::VersionNotFound(_) => Self::NotFound(e.to_string()),
      E::MissingVersion(_) | E::Text(_) | E::Io { .. } => {
        Self::BadRequest(e.to_string())
      }
      E::Store(inner) => Self::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ingest_errors_map_to_statuses() {
    let cases = [
      (munitorum_ingest::Error::VersionNotFound("9.9".into()), StatusCode::NOT_FOUND),
      (munitorum_ingest::Error::MissingVersion("x.txt".into()), StatusCode::BAD_REQUEST),
      (
        munitorum_ingest::Error::store(std::io::Error::other("disk on fire")),
        StatusCode::INTERNAL_SERVER_ERROR,
      ),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).into_response().status(), status);
    }
  }
}
