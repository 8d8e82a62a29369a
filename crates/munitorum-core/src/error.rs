//! Error types for `munitorum-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown supergroup: {0:?}")]
  UnknownSupergroup(String),

  #[error("unknown unit type: {0:?}")]
  UnknownUnitType(String),

  #[error("invalid version string: {0:?}")]
  InvalidVersion(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
