//! Error types for the munitorum-text codecs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no object literal found after assignment")]
  MissingObjectLiteral,

  #[error("unbalanced braces in object literal ({0} left open)")]
  UnbalancedBraces(usize),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
