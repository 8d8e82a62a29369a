//! Error type for `munitorum-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column held a value that does not decode.
  #[error("decode error: {0}")]
  Decode(String),

  #[error("version {0} already exists")]
  VersionExists(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
