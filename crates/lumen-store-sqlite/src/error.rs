//! Error type for `lumen-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value does not map onto its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  /// An update targeted a row that does not exist.
  #[error("{0} not found: {1}")]
  RowNotFound(&'static str, uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
